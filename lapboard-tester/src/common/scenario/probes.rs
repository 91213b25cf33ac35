use anyhow::{Context, Result, ensure};
use lapboard_game::{
    ChoiceKind, ChoiceOption, ChoiceReward, Die, EventKind, GamePhase, GameSnapshot,
    PendingChoice, SquareEffect, TurnEngine, TurnEvent,
};

use crate::logic::game_tester::{GameTester, SimulationPlan};
use crate::logic::simulation::SimulationSession;

const RESUME_AFTER: usize = 30;
const GATING_STEPS: usize = 200;

/// Two runs of the same plan and seed must agree on every reported field.
pub fn deterministic_replay(tester: &GameTester, plan: &SimulationPlan, seed: u64) -> Result<()> {
    let first = tester.session(plan, seed).run();
    let second = tester.session(plan, seed).run();
    ensure!(
        first == second,
        "replay diverged: fingerprints {:016x} vs {:016x}",
        first.fingerprint,
        second.fingerprint
    );
    Ok(())
}

/// A JSON snapshot taken mid-run restores to the same state, and two
/// restores of it play out identically.
pub fn snapshot_resume(tester: &GameTester, plan: &SimulationPlan, seed: u64) -> Result<()> {
    let mut session = tester.session(plan, seed);
    for _ in 0..RESUME_AFTER {
        if session.advance().is_empty() {
            break;
        }
    }
    let snapshot = session.engine().snapshot();
    let json = serde_json::to_string(&snapshot).context("serializing snapshot")?;

    let resume = || -> Result<SimulationSession> {
        let parsed: GameSnapshot = serde_json::from_str(&json).context("parsing snapshot")?;
        let engine = TurnEngine::restore(tester.catalog().clone(), parsed);
        Ok(SimulationSession::from_engine(
            engine,
            plan.strategy,
            seed,
            plan.turn_limit(),
        ))
    };

    let mut left = resume()?;
    let mut right = resume()?;
    ensure!(
        left.engine().snapshot() == snapshot,
        "restored snapshot differs from the saved one"
    );
    ensure!(
        left.engine().snapshot().fingerprint() == snapshot.fingerprint(),
        "fingerprint changed across a JSON round trip"
    );

    let left = left.run();
    let right = right.run();
    ensure!(
        left.fingerprint == right.fingerprint,
        "resumed runs diverged: {:016x} vs {:016x}",
        left.fingerprint,
        right.fingerprint
    );
    ensure!(
        left.rng_draws == right.rng_draws,
        "resumed runs drew differently: {:?} vs {:?}",
        left.rng_draws,
        right.rng_draws
    );
    Ok(())
}

/// Taking a die into a full bag discards it and still resolves the choice.
pub fn bag_overflow(tester: &GameTester, plan: &SimulationPlan, seed: u64) -> Result<()> {
    let mut engine = tester.session(plan, seed).engine().clone();
    engine.with_bag_mut(|bag| {
        while bag.try_add(Die::Fixed { value: 2 }).is_ok() {}
    });
    let capacity = engine.dice_bag().capacity();

    let square = 1;
    ensure!(
        engine.with_board_mut(|board| board.set_effect(square, SquareEffect::ChoicePickDie)),
        "square {square} cannot hold a choice effect"
    );
    engine.with_state_mut(|state| {
        state.position = square;
        state.phase = GamePhase::AwaitingChoice;
        state.pending_choice = Some(PendingChoice {
            square_id: square,
            kind: ChoiceKind::PickDie,
            options: [ChoiceOption {
                id: 0,
                reward: ChoiceReward::Die { die: Die::D20 },
                label: Die::D20.label(),
            }]
            .into_iter()
            .collect(),
        });
    });

    let events = engine.submit_choice(0);
    ensure!(
        events
            .iter()
            .any(|event| matches!(event.kind, EventKind::DiceBagFull { discarded: Die::D20, .. })),
        "no overflow event when choosing into a full bag"
    );
    ensure!(
        engine.dice_bag().len() == capacity,
        "bag holds {} dice, capacity {capacity}",
        engine.dice_bag().len()
    );
    ensure!(
        !engine.dice_bag().iter().any(|die| *die == Die::D20),
        "overflowing die was kept"
    );
    ensure!(
        engine.state().phase == GamePhase::Rolling && engine.state().pending_choice.is_none(),
        "choice left unresolved after overflow"
    );
    Ok(())
}

fn ensure_rejected(
    engine: &TurnEngine,
    label: &str,
    op: impl FnOnce(&mut TurnEngine) -> Vec<TurnEvent>,
) -> Result<()> {
    let mut probe = engine.clone();
    let events = op(&mut probe);
    ensure!(
        events.is_empty(),
        "{label} accepted in phase {} (busy {})",
        engine.state().phase,
        engine.state().busy
    );
    ensure!(
        probe.snapshot() == engine.snapshot(),
        "{label} changed state in phase {}",
        engine.state().phase
    );
    Ok(())
}

fn check_gates(engine: &TurnEngine) -> Result<()> {
    let phase = engine.state().phase;
    if !phase.accepts_roll() || engine.state().busy {
        ensure_rejected(engine, "request_roll", |e| e.request_roll(None))?;
    }
    if !phase.accepts_boss_roll() || engine.state().busy {
        ensure_rejected(engine, "request_boss_roll", |e| e.request_boss_roll(None))?;
    }
    if !phase.accepts_choice() || engine.state().busy {
        ensure_rejected(engine, "submit_choice", |e| e.submit_choice(0))?;
    }
    if !engine.state().busy {
        ensure_rejected(engine, "advance", TurnEngine::advance)?;
    }
    let past_end = engine.dice_bag().len();
    ensure_rejected(engine, "roll with a missing die", |e| {
        e.request_roll(Some(past_end))
    })?;
    if let Some(pending) = engine.state().pending_choice.as_ref() {
        let unknown = pending.options.len() + 100;
        ensure_rejected(engine, "unknown option", |e| e.submit_choice(unknown))?;
    }
    Ok(())
}

/// Operations outside their phase, or during the busy lock, are no-ops.
pub fn phase_gating(tester: &GameTester, plan: &SimulationPlan, seed: u64) -> Result<()> {
    let mut session = tester.session(plan, seed);
    for _ in 0..GATING_STEPS {
        check_gates(session.engine())?;

        if session.engine().state().phase.accepts_roll() {
            let mut locked = session.engine().clone();
            ensure!(
                !locked.request_roll(None).is_empty(),
                "idle roll was refused"
            );
            ensure!(locked.state().busy, "roll did not take the lock");
            check_gates(&locked)?;
            locked.settle();
            ensure!(!locked.state().busy, "settle left the lock held");
        }

        if session.advance().is_empty() {
            break;
        }
    }
    Ok(())
}
