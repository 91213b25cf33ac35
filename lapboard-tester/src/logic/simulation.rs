use lapboard_game::{ChoiceReward, EventKind, GamePhase, StageCatalog, TurnEngine, TurnEvent};
use serde::{Deserialize, Serialize};

use crate::logic::policy::{GameplayStrategy, PlayerPolicy};

/// Configuration for a simulation session.
#[derive(Debug, Clone, Copy)]
pub struct SimulationConfig {
    pub seed: u64,
    pub strategy: GameplayStrategy,
    pub max_turns: u32,
}

impl SimulationConfig {
    #[must_use]
    pub const fn new(strategy: GameplayStrategy, seed: u64) -> Self {
        Self {
            seed,
            strategy,
            max_turns: 2_000,
        }
    }

    #[must_use]
    pub const fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Won,
    Lost,
    TurnCap,
}

impl RunOutcome {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Won => "won",
            Self::Lost => "lost",
            Self::TurnCap => "turn cap",
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

/// Counters accumulated from the event stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub laps_completed: u32,
    pub choices_made: u32,
    pub money_choices: u32,
    pub dice_choices: u32,
    pub bag_overflows: u32,
    pub reserved_dice_spent: u32,
    pub boss_encounters: u32,
    pub boss_rolls: u32,
    pub reverse_rolls: u32,
    pub max_bag_len: usize,
    pub events: usize,
}

impl RunMetrics {
    pub fn observe(&mut self, events: &[TurnEvent]) {
        self.events += events.len();
        for event in events {
            match &event.kind {
                EventKind::LapCompleted { .. } => self.laps_completed += 1,
                EventKind::ChoiceResolved { reward, .. } => {
                    self.choices_made += 1;
                    match reward {
                        ChoiceReward::Money { .. } => self.money_choices += 1,
                        ChoiceReward::Die { .. } => self.dice_choices += 1,
                    }
                }
                EventKind::DiceBagFull { .. } => self.bag_overflows += 1,
                EventKind::DieConsumed { .. } => self.reserved_dice_spent += 1,
                EventKind::BossEncountered { .. } => self.boss_encounters += 1,
                EventKind::BossRollRecorded { .. } => self.boss_rolls += 1,
                EventKind::DiceRolled { roll } if roll.steps < 0 => self.reverse_rolls += 1,
                _ => {}
            }
        }
    }
}

/// End-of-run report for one seed and strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub seed: u64,
    pub strategy: GameplayStrategy,
    pub outcome: RunOutcome,
    pub final_phase: GamePhase,
    pub stage_reached: u32,
    pub stage_count: u32,
    pub final_lap: u32,
    pub final_money: i64,
    pub turns: u32,
    pub bag_len: usize,
    pub bag_capacity: usize,
    pub busy_at_end: bool,
    pub fingerprint: u64,
    /// Draws per stream as `(dice, board, offers)`.
    pub rng_draws: (u64, u64, u64),
    pub metrics: RunMetrics,
}

/// Drives one engine with a policy, one player decision at a time.
pub struct SimulationSession {
    engine: TurnEngine,
    policy: Box<dyn PlayerPolicy + Send>,
    strategy: GameplayStrategy,
    seed: u64,
    max_turns: u32,
    metrics: RunMetrics,
}

impl SimulationSession {
    #[must_use]
    pub fn new(catalog: StageCatalog, config: SimulationConfig) -> Self {
        let engine = TurnEngine::new(catalog, config.seed);
        Self::from_engine(engine, config.strategy, config.seed, config.max_turns)
    }

    /// Wrap an existing engine, e.g. one restored from a snapshot.
    #[must_use]
    pub fn from_engine(
        engine: TurnEngine,
        strategy: GameplayStrategy,
        seed: u64,
        max_turns: u32,
    ) -> Self {
        let mut metrics = RunMetrics::default();
        metrics.max_bag_len = engine.dice_bag().len();
        Self {
            engine,
            policy: strategy.create_policy(seed),
            strategy,
            seed,
            max_turns,
            metrics,
        }
    }

    #[must_use]
    pub const fn engine(&self) -> &TurnEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut TurnEngine {
        &mut self.engine
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        let state = self.engine.state();
        state.phase.is_terminal() || state.turn >= self.max_turns
    }

    /// Make one player decision and settle the resulting sequence.
    ///
    /// Returns every event produced; an empty vector means nothing could be
    /// done from the current state.
    pub fn advance(&mut self) -> Vec<TurnEvent> {
        if self.is_finished() {
            return Vec::new();
        }
        let mut events = self.decide();
        events.extend(self.engine.settle());
        self.metrics.observe(&events);
        self.metrics.max_bag_len = self.metrics.max_bag_len.max(self.engine.dice_bag().len());
        events
    }

    fn decide(&mut self) -> Vec<TurnEvent> {
        let state = self.engine.state();
        let bag = self.engine.dice_bag();
        match state.phase {
            GamePhase::Rolling => {
                let pick = self.policy.pick_move_die(state, bag);
                let events = self.engine.request_roll(pick);
                if events.is_empty() && pick.is_some() {
                    self.engine.request_roll(None)
                } else {
                    events
                }
            }
            GamePhase::BossEncounter => {
                let pick = self.policy.pick_boss_die(state, bag);
                let events = self.engine.request_boss_roll(pick);
                if events.is_empty() && pick.is_some() {
                    self.engine.request_boss_roll(None)
                } else {
                    events
                }
            }
            GamePhase::AwaitingChoice => {
                let Some(choice) = state.pending_choice.as_ref() else {
                    return Vec::new();
                };
                let decision = self.policy.pick_choice(state, bag, choice);
                log::trace!(
                    "{} picked option {} ({})",
                    self.policy.name(),
                    decision.choice_index,
                    decision.rationale.as_deref().unwrap_or("-")
                );
                self.engine.submit_choice(decision.choice_index)
            }
            // Busy phases only move through settle.
            GamePhase::DiceAnimation | GamePhase::Moving => self.engine.settle(),
            GamePhase::GameWon | GamePhase::GameOver => Vec::new(),
        }
    }

    /// Play until a terminal phase, the turn cap, or a stall.
    pub fn run(&mut self) -> RunSummary {
        while !self.is_finished() {
            if self.advance().is_empty() {
                log::warn!(
                    "seed {} stalled in phase {}",
                    self.seed,
                    self.engine.state().phase
                );
                break;
            }
        }
        self.summary()
    }

    #[must_use]
    pub fn summary(&self) -> RunSummary {
        let state = self.engine.state();
        let outcome = match state.phase {
            GamePhase::GameWon => RunOutcome::Won,
            GamePhase::GameOver => RunOutcome::Lost,
            _ => RunOutcome::TurnCap,
        };
        RunSummary {
            seed: self.seed,
            strategy: self.strategy,
            outcome,
            final_phase: state.phase,
            stage_reached: state.stage,
            stage_count: self.engine.catalog().stage_count(),
            final_lap: state.lap,
            final_money: state.money,
            turns: state.turn,
            bag_len: self.engine.dice_bag().len(),
            bag_capacity: self.engine.dice_bag().capacity(),
            busy_at_end: state.busy,
            fingerprint: self.engine.snapshot().fingerprint(),
            rng_draws: self.engine.rng_draws(),
            metrics: self.metrics.clone(),
        }
    }
}
