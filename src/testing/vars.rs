//! Scenario variables: `{{placeholder}}` interpolation and URL resolution

use reqwest::Url;

use crate::common::{Config, Error, Result};

use super::ids::IdGenerator;

/// Placeholder names a scenario may use
pub const KNOWN: &[&str] = &["base_url", "email", "password", "unique_email"];

/// Names of the placeholders in `template`, or `None` if a `{{` is never closed
pub fn placeholders(template: &str) -> Option<Vec<&str>> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let end = after.find("}}")?;
        names.push(after[..end].trim());
        rest = &after[end + 2..];
    }
    Some(names)
}

/// Values bound for one scenario attempt
///
/// `unique_email` is drawn once at construction, so every step of the
/// attempt sees the same address and a retry gets a new one.
#[derive(Debug, Clone)]
pub struct Vars {
    base_url: Url,
    values: Vec<(&'static str, String)>,
}

impl Vars {
    pub fn new(config: &Config, ids: &dyn IdGenerator) -> Result<Self> {
        let base_url = base_with_slash(&config.target.base_url)?;
        let unique_email = format!(
            "{}{}@{}",
            config.runner.email_prefix,
            ids.next_id(),
            config.runner.email_domain
        );

        Ok(Self {
            base_url,
            values: vec![
                (
                    "base_url",
                    config.target.base_url.trim_end_matches('/').to_string(),
                ),
                ("email", config.credentials.email.clone()),
                ("password", config.credentials.password.clone()),
                ("unique_email", unique_email),
            ],
        })
    }

    /// Value bound to a placeholder name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Replace every `{{name}}` in `input`
    pub fn interpolate(&self, input: &str) -> Result<String> {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;
        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after.find("}}").ok_or_else(|| {
                Error::Config(format!("Unterminated placeholder in '{}'", input))
            })?;
            let name = after[..end].trim();
            let value = self.get(name).ok_or_else(|| {
                Error::Config(format!(
                    "Unknown placeholder '{{{{{}}}}}'. Known: {}",
                    name,
                    KNOWN.join(", ")
                ))
            })?;
            out.push_str(value);
            rest = &after[end + 2..];
        }
        out.push_str(rest);
        Ok(out)
    }

    /// Interpolate `route` and resolve it against the base URL
    ///
    /// Absolute http(s) URLs are kept; anything else is a route relative to
    /// the base, with or without a leading slash.
    pub fn resolve_url(&self, route: &str) -> Result<String> {
        let route = self.interpolate(route)?;
        if let Ok(url) = Url::parse(&route) {
            if matches!(url.scheme(), "http" | "https") {
                return Ok(url.to_string());
            }
        }

        self.base_url
            .join(route.trim_start_matches('/'))
            .map(|u| u.to_string())
            .map_err(|e| Error::Config(format!("Invalid route '{}': {}", route, e)))
    }
}

fn base_with_slash(base: &str) -> Result<Url> {
    let mut url =
        Url::parse(base).map_err(|e| Error::Config(format!("Invalid base_url '{}': {}", base, e)))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Whether two URLs name the same page
///
/// Both sides are normalized; a trailing slash on a non-root path is
/// ignored. Unparseable input falls back to exact comparison.
pub fn urls_match(actual: &str, expected: &str) -> bool {
    match (normalize(actual), normalize(expected)) {
        (Some(a), Some(b)) => a == b,
        _ => actual == expected,
    }
}

fn normalize(url: &str) -> Option<String> {
    let mut url = Url::parse(url).ok()?;
    url.set_fragment(None);
    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }
    Some(url.to_string())
}
