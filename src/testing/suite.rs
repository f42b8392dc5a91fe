//! Suite execution
//!
//! Checks that the application answers, then runs scenarios concurrently,
//! each attempt in a freshly launched session that is always closed again.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::browser::Launcher;
use crate::common::{Config, Error, Result};

use super::config::Scenario;
use super::ids::IdGenerator;
use super::report::{ScenarioResult, SuiteReport};
use super::runner::{self, Failure, ScenarioOutcome};
use super::vars::Vars;

/// How a suite is scheduled
#[derive(Debug, Clone)]
pub struct SuiteOptions {
    /// Scenarios run at the same time
    pub jobs: usize,
    /// Extra attempts after a timeout or browser failure
    pub retries: u32,
    /// Probe the base URL before launching anything
    pub preflight: bool,
}

impl SuiteOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            jobs: config.runner.jobs,
            retries: config.runner.retries,
            preflight: true,
        }
    }
}

/// Fail fast when nothing answers at `base_url`
///
/// Any HTTP response counts as reachable; only transport errors fail.
pub async fn check_reachable(base_url: &str, timeout: Duration) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::Internal(format!("HTTP client: {}", e)))?;

    match client.get(base_url).send().await {
        Ok(response) => {
            tracing::debug!(url = base_url, status = %response.status(), "Application reachable");
            Ok(())
        }
        Err(e) => Err(Error::unreachable(base_url, e)),
    }
}

/// Run `scenarios` and collect their results in declaration order
///
/// `on_result` sees each result as soon as its scenario finishes. Invalid
/// scenarios and an unreachable application abort the run before any
/// browser starts.
pub async fn run_suite(
    launcher: Arc<dyn Launcher>,
    scenarios: Vec<Scenario>,
    config: Arc<Config>,
    ids: Arc<dyn IdGenerator>,
    options: SuiteOptions,
    mut on_result: impl FnMut(&ScenarioResult),
) -> Result<SuiteReport> {
    for scenario in &scenarios {
        scenario.validate()?;
    }

    if options.preflight {
        check_reachable(&config.target.base_url, config.timeouts.connect()).await?;
    }

    let started = Instant::now();
    let jobs = options.jobs.max(1);
    tracing::info!(
        scenarios = scenarios.len(),
        jobs,
        retries = options.retries,
        base_url = %config.target.base_url,
        "Running suite"
    );

    let labels: Vec<(String, usize)> = scenarios
        .iter()
        .map(|s| (s.name.clone(), s.steps.len()))
        .collect();
    let semaphore = Arc::new(Semaphore::new(jobs));
    let mut tasks = JoinSet::new();

    for (index, scenario) in scenarios.into_iter().enumerate() {
        let launcher = launcher.clone();
        let config = config.clone();
        let ids = ids.clone();
        let semaphore = semaphore.clone();
        let retries = options.retries;

        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            let name = scenario.name.clone();
            let steps_total = scenario.steps.len();

            // A panic stays inside the inner task and becomes a failed result
            let attempt = tokio::spawn(run_with_retries(launcher, scenario, config, ids, retries));
            let result = match attempt.await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(scenario = %name, error = %e, "Scenario task panicked");
                    ScenarioResult::panicked(name, steps_total, e.to_string())
                }
            };
            (index, result)
        });
    }

    let mut slots: Vec<Option<ScenarioResult>> = labels.iter().map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => {
                on_result(&result);
                slots[index] = Some(result);
            }
            Err(e) => tracing::error!(error = %e, "Scenario scheduler task failed"),
        }
    }

    let results = slots
        .into_iter()
        .zip(labels)
        .map(|(slot, (name, steps_total))| {
            slot.unwrap_or_else(|| {
                ScenarioResult::panicked(name, steps_total, "scenario task was lost".to_string())
            })
        })
        .collect();

    let report = SuiteReport::new(results, started.elapsed());
    tracing::info!(
        passed = report.passed,
        failed = report.failed,
        duration_ms = report.duration_ms,
        "Suite finished"
    );
    Ok(report)
}

async fn run_with_retries(
    launcher: Arc<dyn Launcher>,
    scenario: Scenario,
    config: Arc<Config>,
    ids: Arc<dyn IdGenerator>,
    retries: u32,
) -> ScenarioResult {
    let started = Instant::now();
    let mut attempts = 0;

    loop {
        attempts += 1;
        let outcome = run_attempt(launcher.as_ref(), &scenario, &config, ids.as_ref()).await;

        let retry = attempts <= retries
            && outcome
                .failure
                .as_ref()
                .is_some_and(|f| f.kind.is_retryable());
        if !retry {
            return ScenarioResult::new(scenario.name, attempts, outcome, started.elapsed());
        }

        if let Some(failure) = &outcome.failure {
            tracing::warn!(
                scenario = %scenario.name,
                attempt = attempts,
                "Retrying after {}",
                failure
            );
        }
    }
}

/// One attempt in its own session; the session is closed on every path
async fn run_attempt(
    launcher: &dyn Launcher,
    scenario: &Scenario,
    config: &Config,
    ids: &dyn IdGenerator,
) -> ScenarioOutcome {
    let steps_total = scenario.steps.len();
    let setup_failure = |action: &str, e: &Error| ScenarioOutcome {
        steps_run: 0,
        steps_total,
        failure: Some(Failure::setup(action, e)),
    };

    let vars = match Vars::new(config, ids) {
        Ok(vars) => vars,
        Err(e) => return setup_failure("bind variables", &e),
    };

    let mut driver = match launcher.launch().await {
        Ok(driver) => driver,
        Err(e) => {
            tracing::warn!(scenario = %scenario.name, error = %e, "Browser launch failed");
            return setup_failure("launch browser", &e);
        }
    };

    let outcome = runner::run_scenario(driver.as_mut(), scenario, &vars, &config.timeouts).await;

    match tokio::time::timeout(config.timeouts.launch(), driver.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::warn!(scenario = %scenario.name, error = %e, "Failed to close browser session")
        }
        Err(_) => tracing::warn!(scenario = %scenario.name, "Timed out closing browser session"),
    }

    outcome
}
