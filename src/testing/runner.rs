//! Scenario runner
//!
//! Executes the steps of one scenario, in order, against one browser
//! session. Every driver call is bounded by a timeout and expectation steps
//! poll until they hold, so a scenario always finishes.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::browser::Driver;
use crate::common::config::Timeouts;
use crate::common::{Error, Result};

use super::config::{DialogExpectation, Scenario, Step};
use super::vars::{urls_match, Vars};

/// Category of a scenario failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// An expectation did not hold
    Assertion,
    /// A bounded wait expired
    Timeout,
    /// The browser misbehaved or could not be started
    Browser,
    /// The scenario could not be prepared
    Setup,
    /// The scenario task panicked
    Panic,
}

impl FailureKind {
    /// Whether a fresh attempt could plausibly pass
    pub fn is_retryable(self) -> bool {
        matches!(self, FailureKind::Timeout | FailureKind::Browser)
    }

    fn of(error: &Error) -> Self {
        match error {
            e if e.is_timeout() => FailureKind::Timeout,
            Error::Browser(_) | Error::BrowserLaunch(_) | Error::ElementNotFound(_) => {
                FailureKind::Browser
            }
            _ => FailureKind::Setup,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Assertion => "assertion",
            FailureKind::Timeout => "timeout",
            FailureKind::Browser => "browser",
            FailureKind::Setup => "setup",
            FailureKind::Panic => "panic",
        };
        f.write_str(s)
    }
}

/// Why a scenario failed
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    /// 1-based step number; 0 when no step ran
    pub step: usize,
    /// The failing step, e.g. `expect_url /catalog`
    pub action: String,
    pub kind: FailureKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
    pub message: String,
}

impl Failure {
    /// Failure that happened outside of any step
    pub fn setup(action: impl Into<String>, error: &Error) -> Self {
        Self {
            step: 0,
            action: action.into(),
            kind: FailureKind::of(error),
            expected: None,
            actual: None,
            message: error.to_string(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.step > 0 {
            write!(f, "step {} ({}): {}", self.step, self.action, self.message)?;
        } else {
            write!(f, "{}: {}", self.action, self.message)?;
        }
        if let (Some(expected), Some(actual)) = (&self.expected, &self.actual) {
            write!(f, " [expected '{}', got '{}']", expected, actual)?;
        }
        Ok(())
    }
}

/// Result of running one scenario in one session
#[derive(Debug, Clone)]
pub struct ScenarioOutcome {
    pub steps_run: usize,
    pub steps_total: usize,
    pub failure: Option<Failure>,
}

impl ScenarioOutcome {
    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }
}

/// A step failure before it is tied to a step number
#[derive(Debug)]
struct StepFailure {
    kind: FailureKind,
    message: String,
    expected: Option<String>,
    actual: Option<String>,
}

impl StepFailure {
    fn mismatch(message: String, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Assertion,
            message,
            expected: Some(expected.into()),
            actual: Some(actual.into()),
        }
    }

    fn into_failure(self, step: usize, action: String) -> Failure {
        Failure {
            step,
            action,
            kind: self.kind,
            expected: self.expected,
            actual: self.actual,
            message: self.message,
        }
    }
}

impl From<Error> for StepFailure {
    fn from(e: Error) -> Self {
        Self {
            kind: FailureKind::of(&e),
            message: e.to_string(),
            expected: None,
            actual: None,
        }
    }
}

type StepResult = std::result::Result<(), StepFailure>;

/// Run a scenario to its first failure or to the end
pub async fn run_scenario(
    driver: &mut dyn Driver,
    scenario: &Scenario,
    vars: &Vars,
    timeouts: &Timeouts,
) -> ScenarioOutcome {
    let steps_total = scenario.steps.len();

    for (i, step) in scenario.steps.iter().enumerate() {
        let step_num = i + 1;
        let started = Instant::now();

        match execute_step(driver, step, vars, timeouts).await {
            Ok(()) => {
                tracing::debug!(
                    scenario = %scenario.name,
                    step = step_num,
                    action = %step.describe(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Step passed"
                );
            }
            Err(e) => {
                let failure = e.into_failure(step_num, step.describe());
                tracing::debug!(
                    scenario = %scenario.name,
                    step = step_num,
                    kind = %failure.kind,
                    "Step failed: {}",
                    failure.message
                );
                return ScenarioOutcome {
                    steps_run: step_num,
                    steps_total,
                    failure: Some(failure),
                };
            }
        }
    }

    ScenarioOutcome {
        steps_run: steps_total,
        steps_total,
        failure: None,
    }
}

/// Execute a single test step
async fn execute_step(
    driver: &mut dyn Driver,
    step: &Step,
    vars: &Vars,
    timeouts: &Timeouts,
) -> StepResult {
    match step {
        Step::Navigate { url } => {
            let url = vars.resolve_url(url)?;
            bounded(
                timeouts.navigation(),
                || format!("navigation to {}", url),
                driver.goto(&url),
            )
            .await?;
            Ok(())
        }
        Step::WaitFor {
            selector,
            timeout_ms,
        } => {
            let selector = vars.interpolate(selector)?;
            let limit = timeout_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| timeouts.action());
            wait_for_element(driver, &selector, limit, timeouts).await?;
            Ok(())
        }
        Step::Fill { selector, value } => {
            let selector = vars.interpolate(selector)?;
            let value = vars.interpolate(value)?;
            wait_for_element(driver, &selector, timeouts.action(), timeouts).await?;
            bounded(
                timeouts.action(),
                || format!("fill of '{}'", selector),
                driver.fill(&selector, &value),
            )
            .await?;
            Ok(())
        }
        Step::Click { selector } => {
            let selector = vars.interpolate(selector)?;
            click(driver, &selector, timeouts).await?;
            Ok(())
        }
        Step::ClickExpectingDialog { selector, expect } => {
            let selector = vars.interpolate(selector)?;
            execute_dialog_click(driver, &selector, expect, vars, timeouts).await
        }
        Step::ExpectText { selector, contains } => {
            let selector = vars.interpolate(selector)?;
            let expected = vars.interpolate(contains)?;
            let poll = Poll::new(timeouts);
            loop {
                let text = bounded(
                    timeouts.action(),
                    || format!("text of '{}'", selector),
                    driver.text_of(&selector),
                )
                .await?;
                if text.as_deref().is_some_and(|t| t.contains(&expected)) {
                    return Ok(());
                }
                if !poll.again().await {
                    return Err(StepFailure::mismatch(
                        format!("Text of '{}' does not contain '{}'", selector, expected),
                        expected,
                        text.unwrap_or_else(|| "<no such element>".to_string()),
                    ));
                }
            }
        }
        Step::ExpectVisible { selector } => {
            let selector = vars.interpolate(selector)?;
            let poll = Poll::new(timeouts);
            loop {
                let visible = bounded(
                    timeouts.action(),
                    || format!("visibility of '{}'", selector),
                    driver.is_visible(&selector),
                )
                .await?;
                if visible {
                    return Ok(());
                }
                if !poll.again().await {
                    let exists = bounded(
                        timeouts.action(),
                        || format!("selector '{}'", selector),
                        driver.exists(&selector),
                    )
                    .await?;
                    return Err(StepFailure::mismatch(
                        format!("Element '{}' is not visible", selector),
                        "visible",
                        if exists { "hidden" } else { "absent" },
                    ));
                }
            }
        }
        Step::ExpectTextVisible { text } => {
            let text = vars.interpolate(text)?;
            let poll = Poll::new(timeouts);
            loop {
                let visible = bounded(
                    timeouts.action(),
                    || format!("text '{}'", text),
                    driver.text_visible(&text),
                )
                .await?;
                if visible {
                    return Ok(());
                }
                if !poll.again().await {
                    return Err(StepFailure::mismatch(
                        format!("Text '{}' is not visible on the page", text),
                        text,
                        "not visible",
                    ));
                }
            }
        }
        Step::ExpectUrl { url, hold_ms } => {
            let expected = vars.resolve_url(url)?;
            let poll = Poll::new(timeouts);
            loop {
                let actual = read_url(driver, timeouts).await?;
                if urls_match(&actual, &expected) {
                    break;
                }
                if !poll.again().await {
                    return Err(StepFailure::mismatch(
                        "Unexpected page URL".to_string(),
                        expected,
                        actual,
                    ));
                }
            }
            match hold_ms {
                Some(ms) => {
                    hold_url(driver, &expected, Duration::from_millis(*ms), timeouts).await
                }
                None => Ok(()),
            }
        }
    }
}

/// Keep reading the URL until `window` ends; any other URL fails at once
async fn hold_url(
    driver: &mut dyn Driver,
    expected: &str,
    window: Duration,
    timeouts: &Timeouts,
) -> StepResult {
    let poll = Poll::with_limit(window, timeouts.poll_interval());
    while poll.again().await {
        let actual = read_url(driver, timeouts).await?;
        if !urls_match(&actual, expected) {
            return Err(StepFailure::mismatch(
                format!("Page left the expected URL within {} ms", window.as_millis()),
                expected,
                actual,
            ));
        }
    }
    Ok(())
}

async fn read_url(driver: &mut dyn Driver, timeouts: &Timeouts) -> Result<String> {
    bounded(
        timeouts.action(),
        || "current URL".to_string(),
        driver.current_url(),
    )
    .await
}

/// Arm the dialog watch, click, then check the intercepted dialog
async fn execute_dialog_click(
    driver: &mut dyn Driver,
    selector: &str,
    expect: &DialogExpectation,
    vars: &Vars,
    timeouts: &Timeouts,
) -> StepResult {
    let message = vars.interpolate(&expect.message)?;
    let expected = format!("{}: {}", expect.kind, message);

    let watch = bounded(
        timeouts.action(),
        || "dialog listener".to_string(),
        driver.arm_dialog(),
    )
    .await?;
    click(driver, selector, timeouts).await?;

    let dialog = match watch.wait(timeouts.dialog()).await {
        Ok(dialog) => dialog,
        Err(e @ Error::DialogTimeout(_)) => {
            return Err(StepFailure {
                kind: FailureKind::Timeout,
                message: e.to_string(),
                expected: Some(expected),
                actual: Some("no dialog".to_string()),
            });
        }
        Err(e) => return Err(e.into()),
    };

    let actual = format!("{}: {}", dialog.kind, dialog.message);
    if dialog.kind != expect.kind || !dialog.message.contains(&message) {
        return Err(StepFailure::mismatch(
            "Unexpected dialog".to_string(),
            expected,
            actual,
        ));
    }
    Ok(())
}

async fn click(driver: &mut dyn Driver, selector: &str, timeouts: &Timeouts) -> Result<()> {
    wait_for_element(driver, selector, timeouts.action(), timeouts).await?;
    bounded(
        timeouts.action(),
        || format!("click on '{}'", selector),
        driver.click(selector),
    )
    .await
}

/// Poll until an element matches `selector`
async fn wait_for_element(
    driver: &mut dyn Driver,
    selector: &str,
    limit: Duration,
    timeouts: &Timeouts,
) -> Result<()> {
    let poll = Poll::with_limit(limit, timeouts.poll_interval());
    loop {
        let found = bounded(
            limit,
            || format!("selector '{}'", selector),
            driver.exists(selector),
        )
        .await?;
        if found {
            return Ok(());
        }
        if !poll.again().await {
            return Err(Error::timeout(
                format!("selector '{}'", selector),
                limit.as_millis() as u64,
            ));
        }
    }
}

/// Bound a driver call
async fn bounded<T, F>(limit: Duration, what: impl FnOnce() -> String, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(Error::timeout(what(), limit.as_millis() as u64)),
    }
}

/// Deadline for an auto-waiting check
struct Poll {
    deadline: Instant,
    interval: Duration,
}

impl Poll {
    fn new(timeouts: &Timeouts) -> Self {
        Self::with_limit(timeouts.action(), timeouts.poll_interval())
    }

    fn with_limit(limit: Duration, interval: Duration) -> Self {
        Self {
            deadline: Instant::now() + limit,
            interval,
        }
    }

    /// Sleep one interval and return `true`, or `false` once the deadline passed
    async fn again(&self) -> bool {
        let now = Instant::now();
        if now >= self.deadline {
            return false;
        }
        tokio::time::sleep(self.interval.min(self.deadline - now)).await;
        true
    }
}
