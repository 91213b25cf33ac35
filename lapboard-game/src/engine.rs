//! Turn engine: the roll → move → land → (choice | boss | roll) state machine.
//!
//! Every operation is synchronous and returns the events it produced. A roll
//! takes the single-flight lock and leaves a pending sequence behind; each
//! [`TurnEngine::advance`] call plays one tick of it (dice reveal, one square
//! of movement, landing). Presentation code paces those ticks however it
//! likes, or calls [`TurnEngine::settle`] to run them all at once. Outcomes
//! never depend on the pacing.

use serde::{Deserialize, Serialize};
use std::hash::Hasher;
use twox_hash::XxHash64;

use crate::board::{BaseType, Board, SquareEffect};
use crate::boss::{BossProgress, BossState};
use crate::choice::{ChoiceApplied, PendingChoice, apply_choice, offer_dice_or_money, offer_pick_die};
use crate::constants::CORNER_TAX;
use crate::dice::{self, DiceBag, Die};
use crate::event::{EventKind, EventLog, MoneyCause, TurnEvent};
use crate::rng::RngBundle;
use crate::stage::{StageCatalog, StageConfig};
use crate::state::{Direction, GamePhase, InFlight, TurnState};

/// Opaque save payload: everything needed to resume a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub seed: u64,
    pub state: TurnState,
    pub board: Board,
    pub bag: DiceBag,
}

impl GameSnapshot {
    /// Stable 64-bit digest of the serialized snapshot, for replay checks.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = XxHash64::with_seed(0);
        match serde_json::to_vec(self) {
            Ok(bytes) => hasher.write(&bytes),
            Err(err) => log::warn!("snapshot could not be serialized for hashing: {err}"),
        }
        hasher.finish()
    }
}

/// Owns the turn state, the dice bag and the board for one session.
#[derive(Debug, Clone)]
pub struct TurnEngine {
    catalog: StageCatalog,
    seed: u64,
    rng: RngBundle,
    board: Board,
    bag: DiceBag,
    state: TurnState,
}

impl TurnEngine {
    /// Start a session on stage 1 with streams derived from `seed`.
    #[must_use]
    pub fn new(catalog: StageCatalog, seed: u64) -> Self {
        Self::with_rng(catalog, seed, RngBundle::from_user_seed(seed))
    }

    /// Start a session drawing from an injected set of streams.
    #[must_use]
    pub fn with_rng(catalog: StageCatalog, seed: u64, rng: RngBundle) -> Self {
        let board = Board::layout_for(catalog.config_for(1));
        let mut engine = Self {
            catalog,
            seed,
            rng,
            board,
            bag: DiceBag::default(),
            state: TurnState::default(),
        };
        engine.new_game();
        engine
    }

    /// Resume a saved session. Streams are re-derived from the seed and the
    /// saved turn, so a restored game is reproducible but does not replay
    /// the draws an uninterrupted session would have made.
    #[must_use]
    pub fn restore(catalog: StageCatalog, snapshot: GameSnapshot) -> Self {
        let GameSnapshot {
            seed,
            state,
            board,
            bag,
        } = snapshot;
        Self {
            rng: RngBundle::resumed(seed, state.turn),
            catalog,
            seed,
            board,
            bag,
            state,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            seed: self.seed,
            state: self.state.clone(),
            board: self.board.clone(),
            bag: self.bag.clone(),
        }
    }

    /// Reset to stage 1, lap 1 with an empty bag. Accepted in every phase.
    pub fn new_game(&mut self) -> Vec<TurnEvent> {
        self.state = TurnState::default();
        self.bag.clear();
        let mut log = self.event_log();
        self.enter_stage(1, &mut log);
        log::info!("new game started (seed {})", self.seed);
        self.finish(log)
    }

    /// Roll the default die, or spend the reserved die at `reserved`.
    ///
    /// A no-op while busy, outside `rolling`, or for an index the bag does
    /// not hold. Otherwise the lock is taken and the dice reveal begins.
    pub fn request_roll(&mut self, reserved: Option<usize>) -> Vec<TurnEvent> {
        if self.state.busy || !self.state.phase.accepts_roll() {
            return Vec::new();
        }
        let Some(mut log) = self.begin_roll(reserved) else {
            return Vec::new();
        };
        let steps = self.state.last_roll.map_or(0, |roll| roll.steps);
        self.state.in_flight = Some(InFlight::RevealMove { steps });
        self.set_phase(GamePhase::DiceAnimation, &mut log);
        self.finish(log)
    }

    /// Roll against the boss. Same gating as [`Self::request_roll`], but only
    /// in `boss_encounter`; the roll is scored on the next tick.
    pub fn request_boss_roll(&mut self, reserved: Option<usize>) -> Vec<TurnEvent> {
        if self.state.busy || !self.state.phase.accepts_boss_roll() || self.state.boss.is_none() {
            return Vec::new();
        }
        let Some(mut log) = self.begin_roll(reserved) else {
            return Vec::new();
        };
        let value = self.state.last_roll.map_or(0, |roll| i64::from(roll.steps));
        self.state.in_flight = Some(InFlight::RevealBossRoll { value });
        self.set_phase(GamePhase::DiceAnimation, &mut log);
        self.finish(log)
    }

    /// Play one tick of the in-flight sequence. Empty when nothing is pending.
    pub fn advance(&mut self) -> Vec<TurnEvent> {
        let Some(in_flight) = self.state.in_flight else {
            return Vec::new();
        };
        let mut log = self.event_log();
        match in_flight {
            InFlight::RevealMove { steps } if steps == 0 => {
                self.state.in_flight = None;
                self.resolve_landing(&mut log);
            }
            InFlight::RevealMove { steps } => {
                let direction = if steps > 0 {
                    Direction::Forward
                } else {
                    Direction::Backward
                };
                self.state.in_flight = Some(InFlight::Moving {
                    remaining: steps.unsigned_abs(),
                    direction,
                });
                self.set_phase(GamePhase::Moving, &mut log);
            }
            InFlight::Moving {
                remaining,
                direction,
            } => self.step(remaining, direction, &mut log),
            InFlight::RevealBossRoll { value } => {
                self.state.in_flight = None;
                self.score_boss_roll(value, &mut log);
            }
        }
        self.finish(log)
    }

    /// Run the in-flight sequence to completion and release the lock.
    pub fn settle(&mut self) -> Vec<TurnEvent> {
        let mut events = Vec::new();
        while self.state.busy {
            let tick = self.advance();
            if tick.is_empty() {
                break;
            }
            events.extend(tick);
        }
        events
    }

    /// Take option `option_id` of the pending choice.
    ///
    /// A no-op while busy, outside `awaiting_choice`, or for an id the
    /// pending choice does not offer.
    pub fn submit_choice(&mut self, option_id: usize) -> Vec<TurnEvent> {
        if self.state.busy || !self.state.phase.accepts_choice() {
            return Vec::new();
        }
        let Some(option) = self
            .state
            .pending_choice
            .as_ref()
            .and_then(|pending| pending.option(option_id))
            .cloned()
        else {
            return Vec::new();
        };
        let Some(pending) = self.state.pending_choice.take() else {
            return Vec::new();
        };
        let square = pending.square_id;
        let mut log = self.event_log();
        match apply_choice(&option, &mut self.state.money, &mut self.bag) {
            ChoiceApplied::MoneyCredited(amount) => log.push(EventKind::MoneyCredited {
                amount,
                square,
                cause: MoneyCause::ChoiceBonus,
            }),
            ChoiceApplied::DieAdded(die) => {
                log::debug!("{die} added to the dice bag ({} held)", self.bag.len());
            }
            ChoiceApplied::DieDiscarded { die, capacity } => {
                log::warn!("dice bag full ({capacity}); discarding {die}");
                log.push(EventKind::DiceBagFull {
                    discarded: die,
                    capacity,
                });
            }
        }
        log.push(EventKind::ChoiceResolved {
            square,
            reward: option.reward,
        });
        self.board.clear_effect(square);
        self.set_phase(GamePhase::Rolling, &mut log);
        self.finish(log)
    }

    #[must_use]
    pub const fn state(&self) -> &TurnState {
        &self.state
    }

    #[must_use]
    pub const fn board(&self) -> &Board {
        &self.board
    }

    #[must_use]
    pub const fn dice_bag(&self) -> &DiceBag {
        &self.bag
    }

    #[must_use]
    pub const fn catalog(&self) -> &StageCatalog {
        &self.catalog
    }

    /// Configuration of the stage currently being played.
    #[must_use]
    pub fn stage_config(&self) -> &StageConfig {
        self.catalog.config_for(self.state.stage)
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Draw counts per stream as `(dice, board, offers)`.
    #[must_use]
    pub const fn rng_draws(&self) -> (u64, u64, u64) {
        self.rng.draws()
    }

    /// Apply a closure to the mutable turn state. Intended for tooling and
    /// tests; normal play goes through the gated operations.
    pub fn with_state_mut<R>(&mut self, f: impl FnOnce(&mut TurnState) -> R) -> R {
        f(&mut self.state)
    }

    pub fn with_board_mut<R>(&mut self, f: impl FnOnce(&mut Board) -> R) -> R {
        f(&mut self.board)
    }

    pub fn with_bag_mut<R>(&mut self, f: impl FnOnce(&mut DiceBag) -> R) -> R {
        f(&mut self.bag)
    }

    fn event_log(&self) -> EventLog {
        EventLog::resume(self.state.turn, self.state.event_seq)
    }

    fn finish(&mut self, log: EventLog) -> Vec<TurnEvent> {
        self.state.event_seq = log.next_seq();
        log.into_events()
    }

    fn set_phase(&mut self, to: GamePhase, log: &mut EventLog) {
        let from = self.state.phase;
        if from == to {
            return;
        }
        self.state.phase = to;
        log::debug!("turn {}: {from} -> {to}", self.state.turn);
        log.push(EventKind::PhaseChanged { from, to });
    }

    /// Consume the chosen die, roll it and take the lock. `None` when the
    /// reserved index is not in the bag.
    fn begin_roll(&mut self, reserved: Option<usize>) -> Option<EventLog> {
        let (die, bag_index) = match reserved {
            Some(index) => (self.bag.take(index)?, Some(index)),
            None => (Die::default(), None),
        };
        self.state.turn = self.state.turn.saturating_add(1);
        self.state.event_seq = 0;
        let mut log = self.event_log();
        if let Some(bag_index) = bag_index {
            log.push(EventKind::DieConsumed { die, bag_index });
        }
        let roll = dice::roll(die, self.rng.dice());
        log::debug!("turn {}: rolled {die} for {} steps", self.state.turn, roll.steps);
        self.state.last_roll = Some(roll);
        self.state.busy = true;
        log.push(EventKind::DiceRolled { roll });
        Some(log)
    }

    fn step(&mut self, remaining: u32, direction: Direction, log: &mut EventLog) {
        let total = self.board.len().max(1);
        let from = self.state.position % total;
        let to = match direction {
            Direction::Forward => (from + 1) % total,
            Direction::Backward => (from + total - 1) % total,
        };
        let remaining = remaining.saturating_sub(1);
        self.state.position = to;
        log.push(EventKind::Stepped {
            from,
            to,
            remaining,
        });

        if direction == Direction::Forward {
            if let Some(SquareEffect::NormalMoney { amount }) =
                self.board.square(to).map(|square| square.effect)
            {
                self.credit(amount, to, MoneyCause::PassThrough, log);
            }
            if to == 0 && self.complete_lap(log) {
                self.state.in_flight = None;
                self.enter_boss(log);
                return;
            }
        }

        if remaining == 0 {
            self.state.in_flight = None;
            self.resolve_landing(log);
        } else {
            self.state.in_flight = Some(InFlight::Moving {
                remaining,
                direction,
            });
        }
    }

    /// Bump the lap counter. Returns `true` when the boss is due; otherwise
    /// lap effects are refreshed before movement continues.
    fn complete_lap(&mut self, log: &mut EventLog) -> bool {
        log.push(EventKind::LapCompleted {
            lap: self.state.lap,
        });
        self.state.lap = self.state.lap.saturating_add(1);
        let stage = self.state.stage;
        let config = self.catalog.config_for(stage);
        if self.state.lap >= config.laps_to_complete {
            return true;
        }
        let placed = self
            .board
            .refresh_lap_effects(config, stage, self.rng.board());
        log.push(EventKind::LapEffectsRefreshed {
            stage,
            lap: self.state.lap,
            placed,
        });
        false
    }

    fn resolve_landing(&mut self, log: &mut EventLog) {
        let id = self.state.position;
        let Some(square) = self.board.square(id).copied() else {
            self.release(GamePhase::Rolling, log);
            return;
        };
        log.push(EventKind::Landed {
            square: id,
            effect: square.effect_type(),
        });
        if square.base_type == BaseType::CornerBr {
            self.debit(CORNER_TAX, id, MoneyCause::CornerTax, log);
        }

        let stage = self.state.stage;
        let offer = match square.effect {
            SquareEffect::TempBadLap { penalty } => {
                self.debit(penalty, id, MoneyCause::LapPenalty, log);
                None
            }
            SquareEffect::HugeMoney { amount } => {
                self.credit(amount, id, MoneyCause::HugeMoney, log);
                self.board.clear_effect(id);
                None
            }
            SquareEffect::ChoiceDiceMoney => Some(offer_dice_or_money(id, stage, self.rng.offers())),
            SquareEffect::ChoicePickDie => Some(offer_pick_die(id, self.rng.offers())),
            SquareEffect::None | SquareEffect::NormalMoney { .. } => None,
        };

        match offer {
            Some(choice) => self.offer_choice(choice, log),
            None => self.release(GamePhase::Rolling, log),
        }
    }

    fn offer_choice(&mut self, choice: PendingChoice, log: &mut EventLog) {
        log.push(EventKind::ChoiceOffered {
            square: choice.square_id,
            choice: choice.kind,
            options: choice.options.len(),
        });
        self.state.pending_choice = Some(choice);
        self.release(GamePhase::AwaitingChoice, log);
    }

    fn enter_boss(&mut self, log: &mut EventLog) {
        let stage = self.state.stage;
        let boss = BossState::from_descriptor(&self.catalog.config_for(stage).boss);
        log::info!(
            "stage {stage} boss: reach {} in {} rolls",
            boss.target_sum,
            boss.rolls_remaining
        );
        log.push(EventKind::BossEncountered {
            stage,
            target_sum: boss.target_sum,
            rolls: boss.rolls_remaining,
        });
        self.state.boss = Some(boss);
        self.release(GamePhase::BossEncounter, log);
    }

    fn score_boss_roll(&mut self, value: i64, log: &mut EventLog) {
        let Some(boss) = self.state.boss.as_mut() else {
            self.release(GamePhase::Rolling, log);
            return;
        };
        let progress = boss.record_roll(value);
        log.push(EventKind::BossRollRecorded {
            value,
            sum: boss.sum(),
            rolls_remaining: boss.rolls_remaining,
        });

        let stage = self.state.stage;
        let money = self.state.money;
        match progress {
            BossProgress::Continue => self.release(GamePhase::BossEncounter, log),
            BossProgress::Defeated => {
                log.push(EventKind::BossDefeated { stage });
                if self.catalog.is_final_stage(stage) {
                    log::info!("final boss defeated with {money} coins");
                    log.push(EventKind::GameWon { money });
                    self.release(GamePhase::GameWon, log);
                } else {
                    self.state.boss = None;
                    self.enter_stage(stage.saturating_add(1), log);
                    self.release(GamePhase::Rolling, log);
                }
            }
            BossProgress::Failed => {
                let shortfall = boss.shortfall();
                log::info!("boss on stage {stage} not defeated ({shortfall} short); game over");
                log.push(EventKind::GameOver {
                    stage,
                    money,
                    shortfall,
                });
                self.release(GamePhase::GameOver, log);
            }
        }
    }

    /// Lay out the stage board and place the first lap's effects. Money and
    /// the bag carry over.
    fn enter_stage(&mut self, stage: u32, log: &mut EventLog) {
        let config = self.catalog.config_for(stage);
        self.board = Board::layout_for(config);
        let placed = self
            .board
            .refresh_lap_effects(config, stage, self.rng.board());
        self.state.stage = stage;
        self.state.lap = 1;
        self.state.position = 0;
        if stage > 1 {
            log::info!("advanced to stage {stage}");
            log.push(EventKind::StageAdvanced { stage });
        }
        log.push(EventKind::LapEffectsRefreshed {
            stage,
            lap: 1,
            placed,
        });
    }

    fn release(&mut self, phase: GamePhase, log: &mut EventLog) {
        self.state.busy = false;
        self.set_phase(phase, log);
    }

    fn credit(&mut self, amount: i64, square: usize, cause: MoneyCause, log: &mut EventLog) {
        self.state.money = self.state.money.saturating_add(amount);
        log.push(EventKind::MoneyCredited {
            amount,
            square,
            cause,
        });
    }

    fn debit(&mut self, amount: i64, square: usize, cause: MoneyCause, log: &mut EventLog) {
        self.state.money = self.state.money.saturating_sub(amount);
        log.push(EventKind::MoneyDebited {
            amount,
            square,
            cause,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::EffectType;
    use crate::choice::{ChoiceKind, ChoiceOption, ChoiceReward};
    use crate::stage::{BossDescriptor, CountRange};

    fn engine(seed: u64) -> TurnEngine {
        TurnEngine::new(StageCatalog::default(), seed)
    }

    fn blank_board(engine: &mut TurnEngine) {
        engine.with_board_mut(|board| {
            for id in 0..board.len() {
                board.clear_effect(id);
            }
        });
    }

    fn roll_fixed(engine: &mut TurnEngine, die: Die) -> Vec<TurnEvent> {
        engine.with_bag_mut(|bag| bag.try_add(die)).unwrap();
        let index = engine.dice_bag().len() - 1;
        let mut events = engine.request_roll(Some(index));
        events.extend(engine.settle());
        events
    }

    fn boss_roll(engine: &mut TurnEngine, die: Die) -> Vec<TurnEvent> {
        engine.with_bag_mut(|bag| bag.try_add(die)).unwrap();
        let index = engine.dice_bag().len() - 1;
        let mut events = engine.request_boss_roll(Some(index));
        events.extend(engine.settle());
        events
    }

    fn single_stage_catalog() -> StageCatalog {
        StageCatalog::new(vec![StageConfig {
            rows: 3,
            cols: 3,
            laps_to_complete: 2,
            money_multiplier: 1.0,
            bad_squares: CountRange::new(0, 0),
            choice_dice_money: CountRange::new(0, 0),
            choice_pick_die: CountRange::new(0, 0),
            boss: BossDescriptor {
                required_roll_count: 2,
                target_sum: 5,
            },
        }])
        .unwrap()
    }

    #[test]
    fn new_engine_starts_rolling_on_a_refreshed_stage_one_board() {
        let engine = engine(1);
        let state = engine.state();
        assert_eq!(state.phase, GamePhase::Rolling);
        assert_eq!((state.stage, state.lap, state.position, state.money), (1, 1, 0, 0));
        assert_eq!(engine.board().len(), 20);
        assert_eq!(engine.board().count_effect(EffectType::None), 4);
    }

    #[test]
    fn roll_takes_the_lock_until_the_sequence_settles() {
        let mut engine = engine(2);
        blank_board(&mut engine);
        let events = engine.request_roll(None);
        assert!(engine.state().busy);
        assert_eq!(engine.state().phase, GamePhase::DiceAnimation);
        assert!(events
            .iter()
            .any(|event| matches!(event.kind, EventKind::DiceRolled { .. })));

        engine.advance();
        assert_eq!(engine.state().phase, GamePhase::Moving);
        assert!(engine.state().busy);

        engine.settle();
        assert!(!engine.state().busy);
        assert_eq!(engine.state().phase, GamePhase::Rolling);
        let steps = engine.state().last_roll.unwrap().steps;
        assert_eq!(engine.state().position, usize::try_from(steps).unwrap());
    }

    #[test]
    fn requests_while_busy_change_nothing() {
        let mut engine = engine(3);
        engine.request_roll(None);
        let before = engine.snapshot();
        assert!(engine.request_roll(None).is_empty());
        assert!(engine.submit_choice(0).is_empty());
        assert!(engine.request_boss_roll(None).is_empty());
        assert_eq!(engine.snapshot(), before);
    }

    #[test]
    fn wrapping_past_start_refreshes_before_the_last_step() {
        let mut engine = engine(4);
        engine.with_state_mut(|state| state.position = 18);
        let events = roll_fixed(&mut engine, Die::Fixed { value: 3 });

        assert_eq!(engine.state().position, 1);
        assert_eq!(engine.state().lap, 2);
        let refresh = events
            .iter()
            .position(|event| matches!(event.kind, EventKind::LapEffectsRefreshed { lap: 2, .. }))
            .expect("lap refresh");
        let last_step = events
            .iter()
            .position(|event| matches!(event.kind, EventKind::Stepped { from: 0, to: 1, .. }))
            .expect("final step");
        assert!(refresh < last_step);
    }

    #[test]
    fn lap_refresh_restocks_a_consumed_pickup() {
        let mut engine = engine(18);
        blank_board(&mut engine);
        engine.with_board_mut(|board| board.set_effect(2, SquareEffect::HugeMoney { amount: 10 }));
        roll_fixed(&mut engine, Die::Fixed { value: 2 });
        assert_eq!(engine.board().square(2).unwrap().effect, SquareEffect::None);
        assert_eq!(engine.board().count_effect(EffectType::None), engine.board().len());

        engine.with_state_mut(|state| state.position = 19);
        let events = roll_fixed(&mut engine, Die::Fixed { value: 1 });
        assert_eq!(engine.state().lap, 2);
        let placed = events
            .iter()
            .find_map(|event| match event.kind {
                EventKind::LapEffectsRefreshed { lap: 2, placed, .. } => Some(placed),
                _ => None,
            })
            .expect("lap refresh");
        let normal_squares = engine.board().len() - 4;
        assert_eq!(
            placed.bad
                + placed.choice_dice_money
                + placed.choice_pick_die
                + placed.huge_money
                + placed.normal_money,
            normal_squares
        );
        assert_ne!(engine.board().square(2).unwrap().effect, SquareEffect::None);
        assert_eq!(engine.board().count_effect(EffectType::None), 4);
    }

    #[test]
    fn landing_on_a_pick_die_square_stashes_the_chosen_die() {
        let mut engine = engine(19);
        blank_board(&mut engine);
        engine.with_board_mut(|board| board.set_effect(6, SquareEffect::ChoicePickDie));
        let events = roll_fixed(&mut engine, Die::Fixed { value: 6 });
        assert!(events.iter().any(|event| matches!(
            event.kind,
            EventKind::ChoiceOffered {
                square: 6,
                choice: ChoiceKind::PickDie,
                ..
            }
        )));
        assert_eq!(engine.state().phase, GamePhase::AwaitingChoice);
        assert!(engine.dice_bag().is_empty());

        let pending = engine.state().pending_choice.clone().unwrap();
        let offered = pending.option(0).map(|option| option.reward).unwrap();
        let ChoiceReward::Die { die } = offered else {
            panic!("pick-die square offered {offered:?}");
        };
        let events = engine.submit_choice(0);
        assert_eq!(engine.dice_bag().len(), 1);
        assert_eq!(engine.dice_bag().get(0), Some(die));
        assert!(!events
            .iter()
            .any(|event| matches!(event.kind, EventKind::DiceBagFull { .. })));
        assert_eq!(engine.state().phase, GamePhase::Rolling);
        assert_eq!(engine.board().square(6).unwrap().effect, SquareEffect::None);
    }

    #[test]
    fn forward_moves_credit_every_money_square_passed() {
        let mut engine = engine(5);
        blank_board(&mut engine);
        engine.with_board_mut(|board| {
            for id in 2..=4 {
                board.set_effect(id, SquareEffect::NormalMoney { amount: 2 });
            }
        });
        engine.with_state_mut(|state| state.position = 1);
        roll_fixed(&mut engine, Die::Fixed { value: 3 });
        assert_eq!(engine.state().position, 4);
        assert_eq!(engine.state().money, 6);
        assert_eq!(engine.state().phase, GamePhase::Rolling);
    }

    #[test]
    fn backward_moves_never_credit_or_count_laps() {
        let mut engine = engine(6);
        engine.with_board_mut(|board| {
            for id in 0..board.len() {
                board.set_effect(id, SquareEffect::NormalMoney { amount: 3 });
            }
        });
        engine.with_state_mut(|state| state.position = 2);
        let events = roll_fixed(&mut engine, Die::ReverseFixed { value: 3 });
        assert_eq!(engine.state().position, 19);
        assert_eq!(engine.state().money, 0);
        assert_eq!(engine.state().lap, 1);
        assert!(!events
            .iter()
            .any(|event| matches!(event.kind, EventKind::LapCompleted { .. })));
    }

    #[test]
    fn landing_on_the_bad_corner_pays_the_tax() {
        let mut engine = engine(7);
        blank_board(&mut engine);
        roll_fixed(&mut engine, Die::Fixed { value: 10 });
        assert_eq!(engine.board().square(10).unwrap().base_type, BaseType::CornerBr);
        assert_eq!(engine.state().money, -CORNER_TAX);
    }

    #[test]
    fn huge_money_is_a_one_time_pickup_and_penalties_persist() {
        let mut engine = engine(8);
        blank_board(&mut engine);
        engine.with_board_mut(|board| {
            board.set_effect(2, SquareEffect::HugeMoney { amount: 10 });
            board.set_effect(4, SquareEffect::TempBadLap { penalty: 7 });
        });
        roll_fixed(&mut engine, Die::Fixed { value: 2 });
        assert_eq!(engine.state().money, 10);
        assert_eq!(engine.board().square(2).unwrap().effect, SquareEffect::None);

        roll_fixed(&mut engine, Die::Fixed { value: 2 });
        assert_eq!(engine.state().money, 3);
        assert_eq!(
            engine.board().square(4).unwrap().effect,
            SquareEffect::TempBadLap { penalty: 7 }
        );
    }

    #[test]
    fn choice_square_waits_for_a_decision() {
        let mut engine = engine(9);
        blank_board(&mut engine);
        engine.with_board_mut(|board| board.set_effect(3, SquareEffect::ChoiceDiceMoney));
        roll_fixed(&mut engine, Die::Fixed { value: 3 });

        assert_eq!(engine.state().phase, GamePhase::AwaitingChoice);
        assert!(!engine.state().busy);
        assert!(engine.request_roll(None).is_empty());
        let pending = engine.state().pending_choice.clone().unwrap();
        assert_eq!(pending.kind, ChoiceKind::DiceOrMoney);

        assert!(engine.submit_choice(7).is_empty());
        assert_eq!(engine.state().phase, GamePhase::AwaitingChoice);

        engine.submit_choice(0);
        assert_eq!(engine.state().money, 10);
        assert_eq!(engine.state().phase, GamePhase::Rolling);
        assert!(engine.state().pending_choice.is_none());
        assert_eq!(engine.board().square(3).unwrap().effect, SquareEffect::None);
    }

    #[test]
    fn full_bag_discards_the_chosen_die() {
        let mut engine = engine(10);
        engine.with_bag_mut(|bag| {
            for _ in 0..10 {
                bag.try_add(Die::Fixed { value: 1 }).unwrap();
            }
        });
        let pending = PendingChoice {
            square_id: 6,
            kind: ChoiceKind::PickDie,
            options: [ChoiceOption {
                id: 0,
                reward: ChoiceReward::Die { die: Die::D20 },
                label: "Take a d20".to_string(),
            }]
            .into_iter()
            .collect(),
        };
        engine.with_state_mut(|state| {
            state.phase = GamePhase::AwaitingChoice;
            state.pending_choice = Some(pending);
        });
        let events = engine.submit_choice(0);
        assert_eq!(engine.dice_bag().len(), 10);
        assert!(!engine.dice_bag().iter().any(|die| *die == Die::D20));
        assert!(events.iter().any(|event| matches!(
            event.kind,
            EventKind::DiceBagFull {
                discarded: Die::D20,
                capacity: 10
            }
        )));
        assert_eq!(engine.state().phase, GamePhase::Rolling);
    }

    #[test]
    fn reaching_the_final_lap_interrupts_movement_for_the_boss() {
        let mut engine = engine(11);
        engine.with_state_mut(|state| {
            state.lap = 2;
            state.position = 18;
        });
        let events = roll_fixed(&mut engine, Die::Fixed { value: 6 });
        assert_eq!(engine.state().position, 0);
        assert_eq!(engine.state().lap, 3);
        assert_eq!(engine.state().phase, GamePhase::BossEncounter);
        assert!(!engine.state().busy);
        assert!(!events
            .iter()
            .any(|event| matches!(event.kind, EventKind::Landed { .. })));
        let boss = engine.state().boss.clone().unwrap();
        assert_eq!(boss.target_sum, 12);
        assert_eq!(boss.rolls_remaining, 3);
        assert!(engine.request_roll(None).is_empty());
    }

    #[test]
    fn defeating_a_boss_advances_the_stage_and_keeps_money_and_bag() {
        let mut engine = engine(12);
        engine.with_state_mut(|state| {
            state.lap = 2;
            state.position = 19;
        });
        roll_fixed(&mut engine, Die::Fixed { value: 1 });
        assert_eq!(engine.state().phase, GamePhase::BossEncounter);
        engine.with_state_mut(|state| state.money = 42);
        engine.with_bag_mut(|bag| bag.try_add(Die::D20)).unwrap();

        boss_roll(&mut engine, Die::Fixed { value: 6 });
        assert_eq!(engine.state().phase, GamePhase::BossEncounter);
        let events = boss_roll(&mut engine, Die::Fixed { value: 6 });
        assert!(events
            .iter()
            .any(|event| matches!(event.kind, EventKind::BossDefeated { stage: 1 })));

        let state = engine.state();
        assert_eq!((state.stage, state.lap, state.position), (2, 1, 0));
        assert_eq!(state.money, 42);
        assert_eq!(state.phase, GamePhase::Rolling);
        assert!(state.boss.is_none());
        assert_eq!(engine.dice_bag().len(), 1);
        assert_eq!(engine.board().len(), 24);
    }

    #[test]
    fn boss_fails_only_once_rolls_run_out() {
        let mut engine = engine(13);
        engine.with_state_mut(|state| {
            state.lap = 2;
            state.position = 19;
        });
        roll_fixed(&mut engine, Die::Fixed { value: 1 });
        boss_roll(&mut engine, Die::ReverseFixed { value: 1 });
        boss_roll(&mut engine, Die::ReverseFixed { value: 1 });
        assert_eq!(engine.state().phase, GamePhase::BossEncounter);
        let events = boss_roll(&mut engine, Die::ReverseFixed { value: 1 });
        assert_eq!(engine.state().phase, GamePhase::GameOver);
        assert_eq!(engine.state().boss.as_ref().unwrap().sum(), -3);
        assert!(events
            .iter()
            .any(|event| matches!(
                event.kind,
                EventKind::GameOver {
                    stage: 1,
                    shortfall: 15,
                    ..
                }
            )));
    }

    #[test]
    fn terminal_states_absorb_everything_but_new_game() {
        let mut engine = TurnEngine::new(single_stage_catalog(), 14);
        engine.with_state_mut(|state| state.position = 7);
        roll_fixed(&mut engine, Die::Fixed { value: 1 });
        assert_eq!(engine.state().phase, GamePhase::BossEncounter);
        boss_roll(&mut engine, Die::Fixed { value: 5 });
        assert_eq!(engine.state().phase, GamePhase::GameWon);

        let before = engine.snapshot();
        assert!(engine.request_roll(None).is_empty());
        assert!(engine.request_boss_roll(None).is_empty());
        assert!(engine.submit_choice(0).is_empty());
        assert!(engine.advance().is_empty());
        assert_eq!(engine.snapshot(), before);

        engine.new_game();
        assert_eq!(engine.state().phase, GamePhase::Rolling);
        assert_eq!(engine.state().stage, 1);
        assert!(engine.dice_bag().is_empty());
    }

    #[test]
    fn unknown_bag_index_is_a_no_op() {
        let mut engine = engine(15);
        let before = engine.snapshot();
        assert!(engine.request_roll(Some(3)).is_empty());
        assert_eq!(engine.snapshot(), before);
    }

    #[test]
    fn mid_sequence_snapshot_resumes_the_same_move() {
        let mut engine = engine(16);
        blank_board(&mut engine);
        engine.with_bag_mut(|bag| bag.try_add(Die::Fixed { value: 4 })).unwrap();
        engine.request_roll(Some(0));
        engine.advance();
        engine.advance();

        let json = serde_json::to_string(&engine.snapshot()).unwrap();
        let snapshot: GameSnapshot = serde_json::from_str(&json).unwrap();
        let mut restored = TurnEngine::restore(StageCatalog::default(), snapshot);
        assert!(restored.state().busy);

        engine.settle();
        restored.settle();
        assert_eq!(restored.state(), engine.state());
        assert_eq!(restored.state().position, 4);
        assert_eq!(restored.snapshot().fingerprint(), engine.snapshot().fingerprint());
    }

    #[test]
    fn event_ids_are_unique_across_ticks_of_a_turn() {
        let mut engine = engine(17);
        let mut events = engine.request_roll(None);
        events.extend(engine.settle());
        let mut ids: Vec<_> = events.iter().map(|event| event.id).collect();
        let count = ids.len();
        ids.sort_by_key(|id| (id.turn, id.seq));
        ids.dedup();
        assert_eq!(ids.len(), count);
    }
}
