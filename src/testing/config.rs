//! Test scenario configuration types
//!
//! Defines the data structures for deserializing YAML test scenarios.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::browser::DialogKind;
use crate::common::{Error, Result};

use super::vars;

/// A complete test scenario loaded from a YAML file
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Scenario {
    /// Name of the test scenario
    pub name: String,
    /// Optional description of what the test verifies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tags for selecting subsets of a suite
    #[serde(default)]
    pub tags: Vec<String>,
    /// The sequence of test steps to execute
    pub steps: Vec<Step>,
}

/// A single test step in the execution flow
///
/// String fields may contain `{{placeholders}}`; URLs may be routes
/// relative to the configured base URL.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Load a page
    Navigate {
        /// Route (e.g. `/login`) or absolute URL
        url: String,
    },
    /// Wait until an element is present
    WaitFor {
        selector: String,
        /// Overrides the default action timeout
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    /// Replace the value of an input
    Fill { selector: String, value: String },
    /// Click an element
    Click { selector: String },
    /// Click an element that must raise a native dialog
    ///
    /// The dialog is intercepted from before the click, accepted, and
    /// checked against `expect`.
    ClickExpectingDialog {
        selector: String,
        expect: DialogExpectation,
    },
    /// Element text must contain a substring
    ExpectText { selector: String, contains: String },
    /// Element must be visible
    ExpectVisible { selector: String },
    /// Some visible element must show this text
    ExpectTextVisible { text: String },
    /// The page URL must equal this route or URL
    ExpectUrl {
        url: String,
        /// Once matched, the URL must keep matching for this long
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hold_ms: Option<u64>,
    },
}

/// Expected properties of an intercepted dialog
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct DialogExpectation {
    /// Dialog kind (default: alert)
    #[serde(default)]
    pub kind: DialogKind,
    /// Substring the dialog message must contain
    pub message: String,
}

impl Step {
    /// Action name as written in YAML
    pub fn action(&self) -> &'static str {
        match self {
            Step::Navigate { .. } => "navigate",
            Step::WaitFor { .. } => "wait_for",
            Step::Fill { .. } => "fill",
            Step::Click { .. } => "click",
            Step::ClickExpectingDialog { .. } => "click_expecting_dialog",
            Step::ExpectText { .. } => "expect_text",
            Step::ExpectVisible { .. } => "expect_visible",
            Step::ExpectTextVisible { .. } => "expect_text_visible",
            Step::ExpectUrl { .. } => "expect_url",
        }
    }

    /// Short human-readable form, e.g. `fill input[name="email"]`
    pub fn describe(&self) -> String {
        let target = match self {
            Step::Navigate { url } | Step::ExpectUrl { url, .. } => url.as_str(),
            Step::WaitFor { selector, .. }
            | Step::Fill { selector, .. }
            | Step::Click { selector }
            | Step::ClickExpectingDialog { selector, .. }
            | Step::ExpectText { selector, .. }
            | Step::ExpectVisible { selector } => selector.as_str(),
            Step::ExpectTextVisible { text } => text.as_str(),
        };
        format!("{} {}", self.action(), target)
    }

    /// Every string that goes through placeholder interpolation
    fn templates(&self) -> Vec<&str> {
        match self {
            Step::Navigate { url } | Step::ExpectUrl { url, .. } => vec![url],
            Step::WaitFor { selector, .. }
            | Step::Click { selector }
            | Step::ExpectVisible { selector } => vec![selector],
            Step::Fill { selector, value } => vec![selector, value],
            Step::ClickExpectingDialog { selector, expect } => vec![selector, &expect.message],
            Step::ExpectText { selector, contains } => vec![selector, contains],
            Step::ExpectTextVisible { text } => vec![text],
        }
    }
}

impl Scenario {
    /// Parse a scenario from YAML text
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::ScenarioParse(e.to_string()))
    }

    /// Parse a scenario from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        serde_yaml::from_str(&content)
            .map_err(|e| Error::ScenarioParse(format!("{}: {}", path.display(), e)))
    }

    /// Reject scenarios that cannot run, before any browser is started
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::scenario_invalid("<unnamed>", "name must not be empty"));
        }
        if self.steps.is_empty() {
            return Err(Error::scenario_invalid(&self.name, "no steps"));
        }

        for (i, step) in self.steps.iter().enumerate() {
            for template in step.templates() {
                let names = vars::placeholders(template).ok_or_else(|| {
                    Error::scenario_invalid(
                        &self.name,
                        format!("step {}: unterminated placeholder in '{}'", i + 1, template),
                    )
                })?;
                for name in names {
                    if !vars::KNOWN.contains(&name) {
                        return Err(Error::scenario_invalid(
                            &self.name,
                            format!(
                                "step {}: unknown placeholder '{{{{{}}}}}'. Known: {}",
                                i + 1,
                                name,
                                vars::KNOWN.join(", ")
                            ),
                        ));
                    }
                }
            }
        }

        Ok(())
    }

    /// Whether the scenario carries `tag`
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Load scenarios from files and directories
///
/// Directories are searched recursively for `.yaml`/`.yml` files. Files are
/// loaded in path order so runs are reproducible.
pub fn load_scenarios(paths: &[PathBuf]) -> Result<Vec<Scenario>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            collect_yaml_files(path, &mut files)?;
        } else if path.exists() {
            files.push(path.clone());
        } else {
            return Err(Error::FileRead {
                path: path.display().to_string(),
                error: "no such file or directory".to_string(),
            });
        }
    }

    let mut scenarios = Vec::with_capacity(files.len());
    let mut names = HashSet::new();
    for file in files {
        let scenario = Scenario::from_file(&file)?;
        if !names.insert(scenario.name.clone()) {
            return Err(Error::scenario_invalid(
                &scenario.name,
                format!("duplicate scenario name (again in {})", file.display()),
            ));
        }
        scenarios.push(scenario);
    }

    Ok(scenarios)
}

/// Keep scenarios whose name contains `filter` and that carry any of `tags`
///
/// An absent filter or an empty tag list selects everything.
pub fn select_scenarios(
    scenarios: Vec<Scenario>,
    filter: Option<&str>,
    tags: &[String],
) -> Vec<Scenario> {
    scenarios
        .into_iter()
        .filter(|s| filter.map_or(true, |f| s.name.contains(f)))
        .filter(|s| tags.is_empty() || tags.iter().any(|t| s.has_tag(t)))
        .collect()
}

fn collect_yaml_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .collect();
    entries.sort();

    for path in entries {
        if path.is_dir() {
            collect_yaml_files(&path, out)?;
        } else if path
            .extension()
            .map(|ext| ext == "yaml" || ext == "yml")
            .unwrap_or(false)
        {
            out.push(path);
        }
    }
    Ok(())
}
