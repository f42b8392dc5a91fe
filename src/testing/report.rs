//! Scenario and suite results, console summary, JSON report

use std::path::Path;
use std::time::Duration;

use colored::Colorize;
use serde::Serialize;

use crate::common::Result;

use super::runner::{Failure, FailureKind, ScenarioOutcome};

/// Final result of one scenario, across all of its attempts
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    pub name: String,
    pub passed: bool,
    pub attempts: u32,
    pub steps_run: usize,
    pub steps_total: usize,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<Failure>,
}

impl ScenarioResult {
    pub fn new(name: String, attempts: u32, outcome: ScenarioOutcome, elapsed: Duration) -> Self {
        Self {
            name,
            passed: outcome.passed(),
            attempts,
            steps_run: outcome.steps_run,
            steps_total: outcome.steps_total,
            duration_ms: elapsed.as_millis() as u64,
            failure: outcome.failure,
        }
    }

    /// Result for a scenario whose task panicked
    pub fn panicked(name: String, steps_total: usize, reason: String) -> Self {
        Self {
            name,
            passed: false,
            attempts: 1,
            steps_run: 0,
            steps_total,
            duration_ms: 0,
            failure: Some(Failure {
                step: 0,
                action: "run scenario".to_string(),
                kind: FailureKind::Panic,
                expected: None,
                actual: None,
                message: reason,
            }),
        }
    }
}

/// Outcome of a whole run
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    /// In declaration order
    pub results: Vec<ScenarioResult>,
}

impl SuiteReport {
    pub fn new(results: Vec<ScenarioResult>, elapsed: Duration) -> Self {
        let passed = results.iter().filter(|r| r.passed).count();
        Self {
            total: results.len(),
            passed,
            failed: results.len() - passed,
            duration_ms: elapsed.as_millis() as u64,
            results,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &ScenarioResult> {
        self.results.iter().filter(|r| !r.passed)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the JSON report, creating parent directories as needed
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        tracing::info!(path = %path.display(), "Wrote JSON report");
        Ok(())
    }
}

/// Print one line per finished scenario
pub fn print_result(result: &ScenarioResult) {
    let retried = if result.attempts > 1 {
        format!(", {} attempts", result.attempts)
    } else {
        String::new()
    };
    let timing = format!("({} ms{})", result.duration_ms, retried);

    if result.passed {
        println!("  {} {} {}", "✓".green(), result.name, timing.dimmed());
    } else {
        println!("  {} {} {}", "✗".red(), result.name.red(), timing.dimmed());
        if let Some(failure) = &result.failure {
            print_failure(failure);
        }
    }
}

fn print_failure(failure: &Failure) {
    let location = if failure.step > 0 {
        format!("Step {} ({})", failure.step, failure.action)
    } else {
        failure.action.clone()
    };
    println!("      {}: {}", location, failure.message);
    if let Some(expected) = &failure.expected {
        println!("      {} {}", "expected:".dimmed(), expected.green());
    }
    if let Some(actual) = &failure.actual {
        println!("      {} {}", "actual:  ".dimmed(), actual.red());
    }
}

/// Print the end-of-run summary
pub fn print_summary(report: &SuiteReport) {
    println!();
    if report.all_passed() {
        println!(
            "{} {} ({} ms)",
            "✓".green().bold(),
            format!("All {} scenarios passed", report.total).green().bold(),
            report.duration_ms
        );
        return;
    }

    println!(
        "{} {}, {} ({} ms)",
        "Test Results:".bold(),
        format!("{} passed", report.passed).green(),
        format!("{} failed", report.failed).red().bold(),
        report.duration_ms
    );
    println!("\n{}", "Failed scenarios:".red());
    for result in report.failures() {
        match &result.failure {
            Some(failure) => println!("  {} {}: {}", "✗".red(), result.name, failure),
            None => println!("  {} {}", "✗".red(), result.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passed(name: &str) -> ScenarioResult {
        ScenarioResult::new(
            name.to_string(),
            1,
            ScenarioOutcome {
                steps_run: 3,
                steps_total: 3,
                failure: None,
            },
            Duration::from_millis(12),
        )
    }

    fn failed(name: &str) -> ScenarioResult {
        ScenarioResult::new(
            name.to_string(),
            2,
            ScenarioOutcome {
                steps_run: 2,
                steps_total: 3,
                failure: Some(Failure {
                    step: 2,
                    action: "expect_url /catalog".to_string(),
                    kind: FailureKind::Assertion,
                    expected: Some("http://localhost:3000/catalog".to_string()),
                    actual: Some("http://localhost:3000/login".to_string()),
                    message: "Unexpected page URL".to_string(),
                }),
            },
            Duration::from_millis(40),
        )
    }

    #[test]
    fn test_counts() {
        let report = SuiteReport::new(
            vec![passed("a"), failed("b"), passed("c")],
            Duration::from_millis(100),
        );
        assert_eq!(report.total, 3);
        assert_eq!(report.passed, 2);
        assert_eq!(report.failed, 1);
        assert!(!report.all_passed());
        let names: Vec<&str> = report.failures().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["b"]);
    }

    #[test]
    fn test_json_shape() {
        let report = SuiteReport::new(vec![passed("a"), failed("b")], Duration::from_millis(5));
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(value["failed"], 1);
        assert!(value["results"][0].get("failure").is_none());
        let failure = &value["results"][1]["failure"];
        assert_eq!(failure["kind"], "assertion");
        assert_eq!(failure["step"], 2);
        assert_eq!(failure["actual"], "http://localhost:3000/login");
        assert_eq!(value["results"][1]["attempts"], 2);
    }

    #[test]
    fn test_write_json_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports/run.json");
        let report = SuiteReport::new(vec![passed("a")], Duration::from_millis(5));
        report.write_json(&path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("\"passed\": 1"));
    }

    #[test]
    fn test_panicked_result() {
        let result = ScenarioResult::panicked("boom".to_string(), 4, "task panicked".to_string());
        assert!(!result.passed);
        assert_eq!(result.failure.unwrap().kind, FailureKind::Panic);
    }
}
