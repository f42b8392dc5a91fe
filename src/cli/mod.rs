//! CLI command handling
//!
//! Loads configuration, applies flag overrides and runs the command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use colored::Colorize;

use crate::browser::{ChromiumLauncher, Launcher};
use crate::commands::{Commands, RunArgs, Selection};
use crate::common::{paths, Config, Error, Result};
use crate::testing::{self, catalog, report, Scenario, SuiteOptions, UuidIds};

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, config_path: Option<&Path>) -> Result<()> {
    let mut config = Config::load(config_path)?;

    match command {
        Commands::Run(args) => {
            apply_run_overrides(&mut config, &args)?;
            run(args, config).await
        }

        Commands::List { paths, selection } => {
            let scenarios = scenarios_for(&paths, &selection)?;
            for scenario in &scenarios {
                let tags = if scenario.tags.is_empty() {
                    String::new()
                } else {
                    format!("[{}]", scenario.tags.join(", "))
                };
                println!(
                    "{} {} {}",
                    scenario.name.white().bold(),
                    format!("({} steps)", scenario.steps.len()).dimmed(),
                    tags.cyan()
                );
                if let Some(desc) = &scenario.description {
                    println!("  {}", desc.dimmed());
                }
            }
            Ok(())
        }

        Commands::Check {
            base_url,
            no_browser,
        } => {
            if let Some(url) = base_url {
                config.target.base_url = url;
                config.validate()?;
            }
            check(&config, no_browser).await
        }

        Commands::Config => {
            let path = config_path
                .map(Path::to_path_buf)
                .or_else(paths::config_path);
            match &path {
                Some(p) if p.exists() => println!("Config file: {}", p.display()),
                Some(p) => println!("Config file: {} (not found, using defaults)", p.display()),
                None => println!("Config file: (no config directory on this platform)"),
            }
            if let Some(dir) = paths::log_dir() {
                println!("Log directory: {}", dir.display());
            }
            println!();
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn apply_run_overrides(config: &mut Config, args: &RunArgs) -> Result<()> {
    if let Some(url) = &args.base_url {
        config.target.base_url = url.clone();
    }
    if let Some(jobs) = args.jobs {
        config.runner.jobs = jobs;
    }
    if let Some(retries) = args.retries {
        config.runner.retries = retries;
    }
    if args.headed {
        config.browser.headless = false;
    }
    config.validate()
}

/// Built-in suite when no paths are given, otherwise the scenarios found there
fn scenarios_for(paths: &[PathBuf], selection: &Selection) -> Result<Vec<Scenario>> {
    let scenarios = if paths.is_empty() {
        catalog::builtin()?
    } else {
        testing::load_scenarios(paths)?
    };

    let selected =
        testing::select_scenarios(scenarios, selection.filter.as_deref(), &selection.tags);
    if selected.is_empty() {
        return Err(Error::NoScenarios);
    }
    Ok(selected)
}

async fn run(args: RunArgs, config: Config) -> Result<()> {
    let scenarios = scenarios_for(&args.paths, &args.selection)?;
    let launcher: Arc<dyn Launcher> = Arc::new(ChromiumLauncher::new(&config)?);

    let mut options = SuiteOptions::from_config(&config);
    options.preflight = !args.no_preflight;

    let json = args.json;
    if !json {
        println!(
            "\n{} {} scenario(s) against {}",
            "Running".blue().bold(),
            scenarios.len(),
            config.target.base_url.white().bold()
        );
    }

    let suite = testing::run_suite(
        launcher,
        scenarios,
        Arc::new(config),
        Arc::new(UuidIds),
        options,
        |result| {
            if !json {
                report::print_result(result);
            }
        },
    )
    .await?;

    if json {
        println!("{}", suite.to_json()?);
    } else {
        report::print_summary(&suite);
    }

    if let Some(path) = &args.report {
        suite.write_json(path)?;
    }

    if suite.all_passed() {
        Ok(())
    } else {
        Err(Error::SuiteFailed {
            failed: suite.failed,
            total: suite.total,
        })
    }
}

async fn check(config: &Config, no_browser: bool) -> Result<()> {
    let url = &config.target.base_url;
    testing::check_reachable(url, config.timeouts.connect()).await?;
    println!("  {} Application reachable at {}", "✓".green(), url);

    if no_browser {
        return Ok(());
    }

    let launcher = ChromiumLauncher::new(config)?;
    let driver = launcher.launch().await?;
    driver.close().await?;
    println!("  {} Browser starts and stops cleanly", "✓".green());
    Ok(())
}
