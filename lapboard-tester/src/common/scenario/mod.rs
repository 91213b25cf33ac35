use anyhow::{Result, ensure};
use lapboard_game::{Die, TurnEngine};

use crate::logic::simulation::{RunOutcome, RunSummary};
use crate::logic::{GameplayStrategy, SimulationPlan};

mod probes;

pub const SCENARIO_KEYS: [&str; 6] = [
    "smoke",
    "full-run",
    "deterministic-replay",
    "snapshot-resume",
    "bag-pressure",
    "phase-gating",
];

const FULL_RUN_TURNS: u32 = 3_000;

// Logic test scenario
#[derive(Debug, Clone)]
pub struct TestScenario {
    pub key: String,
    pub name: String,
    pub plans: Vec<SimulationPlan>,
}

impl TestScenario {
    #[must_use]
    pub fn new(key: impl Into<String>, name: impl Into<String>, plans: Vec<SimulationPlan>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            plans,
        }
    }
}

#[must_use]
pub fn get_scenario(name: &str) -> Option<TestScenario> {
    let key = name.trim().to_ascii_lowercase();
    let scenario = match key.as_str() {
        "smoke" => TestScenario::new(
            "smoke",
            "Smoke",
            vec![
                SimulationPlan::new(GameplayStrategy::Greedy)
                    .with_max_turns(25)
                    .with_expectation(smoke_expectation),
            ],
        ),
        "full-run" | "full" => TestScenario::new(
            "full-run",
            "Full Run",
            GameplayStrategy::ALL
                .into_iter()
                .map(|strategy| {
                    SimulationPlan::new(strategy)
                        .with_max_turns(FULL_RUN_TURNS)
                        .with_expectation(terminal_expectation)
                        .with_expectation(boss_expectation)
                        .with_expectation(bag_capacity_expectation)
                })
                .collect(),
        ),
        "deterministic-replay" | "replay" => TestScenario::new(
            "deterministic-replay",
            "Deterministic Replay",
            [GameplayStrategy::Greedy, GameplayStrategy::Random]
                .into_iter()
                .map(|strategy| {
                    SimulationPlan::new(strategy)
                        .with_max_turns(FULL_RUN_TURNS)
                        .with_probe(probes::deterministic_replay)
                })
                .collect(),
        ),
        "snapshot-resume" | "resume" => TestScenario::new(
            "snapshot-resume",
            "Snapshot Resume",
            vec![
                SimulationPlan::new(GameplayStrategy::Collector)
                    .with_max_turns(FULL_RUN_TURNS)
                    .with_probe(probes::snapshot_resume),
            ],
        ),
        "bag-pressure" | "bag" => TestScenario::new(
            "bag-pressure",
            "Dice Bag Pressure",
            vec![
                SimulationPlan::new(GameplayStrategy::Collector)
                    .with_max_turns(FULL_RUN_TURNS)
                    .with_setup(fill_bag)
                    .with_expectation(bag_capacity_expectation)
                    .with_probe(probes::bag_overflow),
            ],
        ),
        "phase-gating" | "gating" => TestScenario::new(
            "phase-gating",
            "Phase Gating",
            vec![
                SimulationPlan::new(GameplayStrategy::Random)
                    .with_max_turns(FULL_RUN_TURNS)
                    .with_probe(probes::phase_gating),
            ],
        ),
        _ => return None,
    };
    Some(scenario)
}

#[must_use]
pub fn list_scenarios() -> Vec<TestScenario> {
    SCENARIO_KEYS.iter().filter_map(|key| get_scenario(key)).collect()
}

fn fill_bag(engine: &mut TurnEngine) {
    engine.with_bag_mut(|bag| {
        while bag.try_add(Die::Fixed { value: 2 }).is_ok() {}
    });
}

fn smoke_expectation(summary: &RunSummary) -> Result<()> {
    ensure!(summary.turns > 0, "no rolls were made");
    ensure!(!summary.busy_at_end, "engine still busy after the run");
    ensure!(
        (1..=summary.stage_count).contains(&summary.stage_reached),
        "stage {} outside 1..={}",
        summary.stage_reached,
        summary.stage_count
    );
    Ok(())
}

fn terminal_expectation(summary: &RunSummary) -> Result<()> {
    ensure!(
        summary.outcome.is_terminal(),
        "run stopped in {} after {} turns",
        summary.final_phase,
        summary.turns
    );
    ensure!(!summary.busy_at_end, "engine still busy after the run");
    if summary.outcome == RunOutcome::Won {
        ensure!(
            summary.stage_reached == summary.stage_count,
            "won on stage {} of {}",
            summary.stage_reached,
            summary.stage_count
        );
    }
    Ok(())
}

fn boss_expectation(summary: &RunSummary) -> Result<()> {
    ensure!(
        summary.metrics.boss_encounters >= 1,
        "finished without meeting a boss"
    );
    ensure!(
        summary.metrics.boss_encounters >= summary.stage_reached,
        "{} boss encounters for stage {}",
        summary.metrics.boss_encounters,
        summary.stage_reached
    );
    Ok(())
}

fn bag_capacity_expectation(summary: &RunSummary) -> Result<()> {
    ensure!(
        summary.metrics.max_bag_len <= summary.bag_capacity,
        "bag held {} dice with capacity {}",
        summary.metrics.max_bag_len,
        summary.bag_capacity
    );
    Ok(())
}
