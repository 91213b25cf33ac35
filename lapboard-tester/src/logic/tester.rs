use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::common::scenario::TestScenario;
use crate::logic::game_tester::{GameTester, SimulationPlan};
use crate::logic::policy::GameplayStrategy;
use crate::logic::simulation::RunSummary;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub strategy: GameplayStrategy,
    pub seed: u64,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
    pub runs: Vec<RunSummary>,
}

pub struct LogicTester {
    tester: GameTester,
}

struct IterationTally {
    successes: usize,
    failures: Vec<String>,
    performance_data: Vec<Duration>,
    runs: Vec<RunSummary>,
}

impl LogicTester {
    #[must_use]
    pub const fn new(tester: GameTester) -> Self {
        Self { tester }
    }

    pub fn run_scenario(
        &self,
        scenario: &TestScenario,
        seeds: &[u64],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        let mut results = Vec::new();

        for plan in &scenario.plans {
            for &seed in seeds {
                if self.tester.verbose() {
                    println!(
                        "🧪 Testing scenario: {} (strategy: {} seed: {})",
                        scenario.name.bright_white(),
                        plan.strategy.label(),
                        seed
                    );
                }
                results.push(self.run_single_plan(scenario, plan, seed, iterations));
            }
        }

        results
    }

    fn run_single_plan(
        &self,
        scenario: &TestScenario,
        plan: &SimulationPlan,
        seed: u64,
        iterations: usize,
    ) -> ScenarioResult {
        let tally = self.run_simulation_iterations(plan, seed, iterations);

        let average_duration = if tally.performance_data.is_empty() {
            Duration::ZERO
        } else {
            tally.performance_data.iter().sum::<Duration>()
                / u32::try_from(tally.performance_data.len()).unwrap_or(1)
        };

        ScenarioResult {
            scenario_name: scenario.name.clone(),
            strategy: plan.strategy,
            seed,
            passed: tally.failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: tally.successes,
            failures: tally.failures,
            average_duration,
            performance_data: tally.performance_data,
            runs: tally.runs,
        }
    }

    fn run_simulation_iterations(
        &self,
        plan: &SimulationPlan,
        seed: u64,
        iterations: usize,
    ) -> IterationTally {
        let mut tally = IterationTally {
            successes: 0,
            failures: Vec::new(),
            performance_data: Vec::new(),
            runs: Vec::new(),
        };

        for i in 0..iterations {
            let start_time = Instant::now();
            let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));

            let summary = self.tester.run_plan(plan, iteration_seed);
            let verdict = evaluate_expectations(plan, &summary).or_else(|| {
                plan.probe
                    .and_then(|probe| probe(&self.tester, plan, iteration_seed).err())
                    .map(|err| format!("{err:#}"))
            });

            if let Some(err) = verdict {
                tally.failures.push(format!(
                    "Iteration {} (strategy {}, seed {}, turns {}, outcome {}, stage {}/{}): {}",
                    i + 1,
                    summary.strategy.label(),
                    summary.seed,
                    summary.turns,
                    summary.outcome.label(),
                    summary.stage_reached,
                    summary.stage_count,
                    err
                ));
                if self.tester.verbose() {
                    println!(
                        "  ❌ Iteration {}/{} failed: {}",
                        i + 1,
                        iterations,
                        err.red()
                    );
                }
            } else {
                tally.successes += 1;
                let duration = start_time.elapsed();
                tally.performance_data.push(duration);
                if self.tester.verbose() {
                    println!(
                        "  ✅ Iteration {}/{} passed ({duration:?}) outcome:{} money:{}",
                        i + 1,
                        iterations,
                        summary.outcome.label(),
                        summary.final_money
                    );
                }
            }
            tally.runs.push(summary);
        }

        tally
    }
}

fn evaluate_expectations(plan: &SimulationPlan, summary: &RunSummary) -> Option<String> {
    plan.expectations
        .iter()
        .find_map(|expectation| expectation.evaluate(summary).err())
        .map(|err| err.to_string())
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}

mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis: Vec<u128> = durations.iter().map(Duration::as_millis).collect();
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Vec::<u128>::deserialize(deserializer)?;
        Ok(millis
            .into_iter()
            .map(|m| Duration::from_millis(u64::try_from(m).unwrap_or(0)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::assets::TesterAssets;
    use std::sync::Arc;

    fn logic_tester() -> LogicTester {
        LogicTester::new(GameTester::new(Arc::new(TesterAssets::load_default()), false))
    }

    #[test]
    fn failing_expectation_is_reported_per_iteration() {
        let scenario = TestScenario::new(
            "always-fails",
            "Always fails",
            vec![
                SimulationPlan::new(GameplayStrategy::Greedy)
                    .with_max_turns(2)
                    .with_expectation(|_: &RunSummary| anyhow::bail!("nope")),
            ],
        );
        let results = logic_tester().run_scenario(&scenario, &[1, 2], 2);
        assert_eq!(results.len(), 2);
        for result in &results {
            assert!(!result.passed);
            assert_eq!(result.failures.len(), 2);
            assert_eq!(result.runs.len(), 2);
            assert!(result.failures[0].contains("nope"));
        }
    }

    #[test]
    fn results_serialize_durations_as_millis() {
        let scenario = TestScenario::new(
            "short",
            "Short",
            vec![SimulationPlan::new(GameplayStrategy::Random).with_max_turns(5)],
        );
        let results = logic_tester().run_scenario(&scenario, &[9], 1);
        assert!(results[0].passed);
        let value = serde_json::to_value(&results[0]).unwrap();
        assert!(value["average_duration"].is_u64());
        assert_eq!(value["strategy"], "random");
        assert_eq!(value["runs"][0]["seed"], 9);
    }
}
