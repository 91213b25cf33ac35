use anyhow::Result;
use colored::Colorize;
use std::io::Write;
use std::time::Duration;

use super::ScenarioResult;
use crate::common::csv_field;

fn success_rate(results: &[ScenarioResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let passed = results.iter().filter(|r| r.passed).count();
    #[allow(clippy::cast_precision_loss)]
    let rate = (passed as f64 / results.len() as f64) * 100.0;
    rate
}

/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn generate_console_report(
    out: &mut dyn Write,
    results: &[ScenarioResult],
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Logic Test Results Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "==============================".cyan())?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();
    let failed_tests = total_tests - passed_tests;

    writeln!(out, "Total runs: {total_tests}")?;
    writeln!(out, "Passed: {}", passed_tests.to_string().green())?;
    writeln!(out, "Failed: {}", failed_tests.to_string().red())?;
    writeln!(out, "Success rate: {:.1}%", success_rate(results))?;
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    for result in results {
        let status = if result.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };

        writeln!(
            out,
            "{} {} [{} seed {}]",
            status,
            result.scenario_name.bold(),
            result.strategy.label(),
            result.seed
        )?;
        writeln!(
            out,
            "   Iterations: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(out, "   Average time: {:?}", result.average_duration)?;
        if let Some(last) = result.runs.last() {
            writeln!(
                out,
                "   Last run: {} at stage {}/{} lap {}, money {}",
                last.outcome.label(),
                last.stage_reached,
                last.stage_count,
                last.final_lap,
                last.final_money
            )?;
        }

        if !result.failures.is_empty() {
            writeln!(out, "   Failures:")?;
            for failure in &result.failures {
                writeln!(out, "     • {}", failure.red())?;
            }
        }
        writeln!(out)?;
    }

    let fastest = results.iter().min_by_key(|r| r.average_duration);
    let slowest = results.iter().max_by_key(|r| r.average_duration);
    if let (Some(fastest), Some(slowest)) = (fastest, slowest) {
        writeln!(out, "{}", "⚡ Performance Summary".bright_yellow().bold())?;
        writeln!(out, "{}", "=====================".yellow())?;
        writeln!(
            out,
            "Fastest: {} ({:?})",
            fastest.scenario_name.green(),
            fastest.average_duration
        )?;
        writeln!(
            out,
            "Slowest: {} ({:?})",
            slowest.scenario_name.yellow(),
            slowest.average_duration
        )?;
    }
    Ok(())
}

/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn generate_json_report(out: &mut dyn Write, results: &[ScenarioResult]) -> Result<()> {
    let json_output = serde_json::to_string_pretty(results)?;
    writeln!(out, "{json_output}")?;
    Ok(())
}

/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn generate_markdown_report(out: &mut dyn Write, results: &[ScenarioResult]) -> Result<()> {
    writeln!(out, "# Lapboard Logic Test Results\n")?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();

    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Total runs**: {total_tests}")?;
    writeln!(out, "- **Passed**: {passed_tests}")?;
    writeln!(out, "- **Failed**: {}", total_tests - passed_tests)?;
    writeln!(out, "- **Success rate**: {:.1}%\n", success_rate(results))?;

    writeln!(out, "## Detailed Results\n")?;

    for result in results {
        let status = if result.passed { "✅" } else { "❌" };
        writeln!(
            out,
            "### {} {} ({}, seed {})\n",
            status,
            result.scenario_name,
            result.strategy.label(),
            result.seed
        )?;
        writeln!(
            out,
            "- **Iterations**: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(out, "- **Average time**: {:?}", result.average_duration)?;

        if !result.runs.is_empty() {
            writeln!(out, "\n| Seed | Outcome | Stage | Lap | Money | Turns |")?;
            writeln!(out, "| --- | --- | --- | --- | --- | --- |")?;
            for run in &result.runs {
                writeln!(
                    out,
                    "| {} | {} | {}/{} | {} | {} | {} |",
                    run.seed,
                    run.outcome.label(),
                    run.stage_reached,
                    run.stage_count,
                    run.final_lap,
                    run.final_money,
                    run.turns
                )?;
            }
        }

        if !result.failures.is_empty() {
            writeln!(out, "\n- **Failures**:")?;
            for failure in &result.failures {
                writeln!(out, "  - {failure}")?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

pub const CSV_HEADER: &str = "scenario,strategy,seed,passed,outcome,final_phase,stage_reached,\
stage_count,final_lap,final_money,turns,laps_completed,choices_made,bag_overflows,\
boss_encounters,boss_rolls,max_bag_len,fingerprint";

/// One row per simulated run.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn generate_csv_report(out: &mut dyn Write, results: &[ScenarioResult]) -> Result<()> {
    writeln!(out, "{CSV_HEADER}")?;
    for result in results {
        for run in &result.runs {
            writeln!(
                out,
                "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{:016x}",
                csv_field(&result.scenario_name),
                run.strategy.key(),
                run.seed,
                result.passed,
                csv_field(run.outcome.label()),
                run.final_phase.as_str(),
                run.stage_reached,
                run.stage_count,
                run.final_lap,
                run.final_money,
                run.turns,
                run.metrics.laps_completed,
                run.metrics.choices_made,
                run.metrics.bag_overflows,
                run.metrics.boss_encounters,
                run.metrics.boss_rolls,
                run.metrics.max_bag_len,
                run.fingerprint
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::policy::GameplayStrategy;

    fn result(passed: bool) -> ScenarioResult {
        ScenarioResult {
            scenario_name: "Smoke, quick".to_string(),
            strategy: GameplayStrategy::Greedy,
            seed: 7,
            passed,
            iterations_run: 1,
            successful_iterations: usize::from(passed),
            failures: if passed {
                Vec::new()
            } else {
                vec!["boom".to_string()]
            },
            average_duration: Duration::from_millis(3),
            performance_data: vec![Duration::from_millis(3)],
            runs: Vec::new(),
        }
    }

    #[test]
    fn empty_results_do_not_divide_by_zero() {
        let mut out = Vec::new();
        generate_console_report(&mut out, &[], Duration::ZERO).unwrap();
        generate_markdown_report(&mut out, &[]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("0.0%"));
    }

    #[test]
    fn markdown_lists_failures() {
        let mut out = Vec::new();
        generate_markdown_report(&mut out, &[result(true), result(false)]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("50.0%"));
        assert!(text.contains("  - boom"));
    }

    #[test]
    fn csv_starts_with_header() {
        let mut out = Vec::new();
        generate_csv_report(&mut out, &[result(true)]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().next(), Some(CSV_HEADER));
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn json_roundtrips_results() {
        let mut out = Vec::new();
        generate_json_report(&mut out, &[result(false)]).unwrap();
        let parsed: Vec<ScenarioResult> = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed[0].failures, vec!["boom".to_string()]);
        assert_eq!(parsed[0].average_duration, Duration::from_millis(3));
    }
}
