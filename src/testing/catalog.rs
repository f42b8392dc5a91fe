//! The built-in Library Catalog suite
//!
//! Compiled into the binary so `catalog-e2e run` works without any
//! scenario files on disk. The same files live in `scenarios/` for
//! reference and for running with explicit paths.

use crate::common::{Error, Result};

use super::config::Scenario;

const SOURCES: &[(&str, &str)] = &[
    ("01_all_books_link.yaml", include_str!("../../scenarios/01_all_books_link.yaml")),
    ("02_guest_login_link.yaml", include_str!("../../scenarios/02_guest_login_link.yaml")),
    ("03_login_shows_logout.yaml", include_str!("../../scenarios/03_login_shows_logout.yaml")),
    ("04_login_shows_email.yaml", include_str!("../../scenarios/04_login_shows_email.yaml")),
    ("05_register_valid.yaml", include_str!("../../scenarios/05_register_valid.yaml")),
    ("06_register_empty.yaml", include_str!("../../scenarios/06_register_empty.yaml")),
    (
        "07_register_missing_password.yaml",
        include_str!("../../scenarios/07_register_missing_password.yaml"),
    ),
    (
        "08_register_missing_confirmation.yaml",
        include_str!("../../scenarios/08_register_missing_confirmation.yaml"),
    ),
    (
        "09_register_missing_email.yaml",
        include_str!("../../scenarios/09_register_missing_email.yaml"),
    ),
    (
        "10_register_password_mismatch.yaml",
        include_str!("../../scenarios/10_register_password_mismatch.yaml"),
    ),
];

/// Parse the built-in scenarios, in suite order
pub fn builtin() -> Result<Vec<Scenario>> {
    SOURCES
        .iter()
        .map(|(file, yaml)| {
            serde_yaml::from_str::<Scenario>(yaml)
                .map_err(|e| Error::ScenarioParse(format!("built-in {}: {}", file, e)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::config::Step;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_suite_parses_and_validates() {
        let scenarios = builtin().unwrap();
        assert_eq!(scenarios.len(), 10);
        for scenario in &scenarios {
            scenario.validate().unwrap();
        }
        let names: HashSet<&str> = scenarios.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names.len(), 10, "scenario names must be unique");
    }

    #[test]
    fn test_validation_scenarios_expect_dialogs_and_stay_put() {
        let scenarios = builtin().unwrap();
        let validation: Vec<&Scenario> =
            scenarios.iter().filter(|s| s.has_tag("validation")).collect();
        assert_eq!(validation.len(), 5);

        for scenario in validation {
            let dialogs = scenario
                .steps
                .iter()
                .filter(|s| matches!(s, Step::ClickExpectingDialog { .. }))
                .count();
            assert_eq!(dialogs, 1, "{}", scenario.name);
            match scenario.steps.last() {
                Some(Step::ExpectUrl { url, hold_ms }) => {
                    assert_eq!(url, "/register", "{}", scenario.name);
                    assert!(hold_ms.is_some_and(|ms| ms > 0), "{}", scenario.name);
                }
                other => panic!("{}: last step {:?}", scenario.name, other),
            }
        }
    }

    #[test]
    fn test_files_on_disk_match_embedded() {
        let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("scenarios");
        let on_disk = crate::testing::config::load_scenarios(&[dir]).unwrap();
        let embedded = builtin().unwrap();
        let a: Vec<&str> = on_disk.iter().map(|s| s.name.as_str()).collect();
        let b: Vec<&str> = embedded.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(a, b);
    }
}
