use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use lapboard_game::{StageCatalog, TurnEngine};

use crate::logic::assets::TesterAssets;
use crate::logic::policy::GameplayStrategy;
use crate::logic::simulation::{RunSummary, SimulationConfig, SimulationSession};

pub const DEFAULT_MAX_TURNS: u32 = 2_000;

/// Extra check that drives its own sessions through the tester.
pub type SimulationProbe = fn(&GameTester, &SimulationPlan, u64) -> Result<()>;

/// Declarative plan for running a simulation session.
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub strategy: GameplayStrategy,
    pub max_turns: Option<u32>,
    pub setup: Option<fn(&mut TurnEngine)>,
    pub expectations: Vec<SimulationExpectation>,
    pub probe: Option<SimulationProbe>,
}

impl SimulationPlan {
    #[must_use]
    pub const fn new(strategy: GameplayStrategy) -> Self {
        Self {
            strategy,
            max_turns: None,
            setup: None,
            expectations: Vec::new(),
            probe: None,
        }
    }

    #[must_use]
    pub const fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = Some(max_turns);
        self
    }

    #[must_use]
    pub fn with_setup(mut self, setup: fn(&mut TurnEngine)) -> Self {
        self.setup = Some(setup);
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<SimulationExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }

    #[must_use]
    pub fn with_probe(mut self, probe: SimulationProbe) -> Self {
        self.probe = Some(probe);
        self
    }

    #[must_use]
    pub fn turn_limit(&self) -> u32 {
        self.max_turns.unwrap_or(DEFAULT_MAX_TURNS)
    }
}

/// Assertion hook run after a simulation completes.
type SimulationExpectationFn = Arc<dyn Fn(&RunSummary) -> Result<()> + Send + Sync + 'static>;

#[derive(Clone)]
pub struct SimulationExpectation(SimulationExpectationFn);

impl std::fmt::Debug for SimulationExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationExpectation").finish()
    }
}

impl SimulationExpectation {
    /// # Errors
    ///
    /// Returns the expectation's failure message.
    pub fn evaluate(&self, summary: &RunSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for SimulationExpectation
where
    F: Fn(&RunSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self(Arc::new(f))
    }
}

/// Headless deterministic runner for the turn engine.
#[derive(Clone)]
pub struct GameTester {
    verbose: bool,
    assets: Arc<TesterAssets>,
}

impl GameTester {
    #[must_use]
    pub const fn new(assets: Arc<TesterAssets>, verbose: bool) -> Self {
        Self { verbose, assets }
    }

    #[must_use]
    pub const fn verbose(&self) -> bool {
        self.verbose
    }

    #[must_use]
    pub fn catalog(&self) -> &StageCatalog {
        self.assets.catalog()
    }

    /// Fresh session for `plan`, with its setup hook applied.
    #[must_use]
    pub fn session(&self, plan: &SimulationPlan, seed: u64) -> SimulationSession {
        let config = SimulationConfig::new(plan.strategy, seed).with_max_turns(plan.turn_limit());
        let mut session = SimulationSession::new(self.catalog().clone(), config);
        if let Some(setup) = plan.setup {
            setup(session.engine_mut());
        }
        session
    }

    pub fn run_plan(&self, plan: &SimulationPlan, seed: u64) -> RunSummary {
        let mut session = self.session(plan, seed);
        if self.verbose {
            println!(
                "🎲 {} seed {} | {} stages | turn limit {}",
                plan.strategy.label().bright_white(),
                seed,
                self.catalog().stage_count(),
                plan.turn_limit()
            );
        }
        let summary = session.run();
        if self.verbose {
            log_summary(&summary);
        }
        summary
    }
}

fn log_summary(summary: &RunSummary) {
    println!(
        "   ↳ {} at stage {}/{} lap {} | money {} | turns {} | bag {}/{} | boss rolls {}",
        summary.outcome.label(),
        summary.stage_reached,
        summary.stage_count,
        summary.final_lap,
        summary.final_money,
        summary.turns,
        summary.bag_len,
        summary.bag_capacity,
        summary.metrics.boss_rolls
    );
}
