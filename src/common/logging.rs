//! Logging and tracing configuration
//!
//! Console logs go to stderr so that stdout stays free for the scenario
//! report (and for `--json`). A log file can be added for CI artifacts.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Initialize tracing for the CLI
///
/// Logs are controlled by the `RUST_LOG` environment variable. Default level
/// is INFO for this crate (DEBUG with `--verbose`), WARN for dependencies.
///
/// When `log_file` is given, a second layer writes full details to it. The
/// returned guard must be held until exit so buffered lines are flushed.
pub fn init_cli(verbose: bool, log_file: Option<&Path>) -> Option<WorkerGuard> {
    let default_directive = if verbose {
        "catalog_e2e=debug,warn"
    } else {
        "catalog_e2e=info,warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact();

    let Some(path) = log_file else {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .init();
        return None;
    };

    let dir = path.parent().filter(|d| !d.as_os_str().is_empty());
    let file_name = path.file_name().map(|n| n.to_os_string());

    match (file_name, ensure_dir(dir)) {
        (Some(file_name), Ok(())) => {
            let appender =
                tracing_appender::rolling::never(dir.unwrap_or_else(|| Path::new(".")), file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_span_events(FmtSpan::CLOSE);

            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(file_layer)
                .init();

            Some(guard)
        }
        (_, result) => {
            if let Err(e) = result {
                eprintln!("Warning: Could not create log directory: {}", e);
            } else {
                eprintln!("Warning: Invalid log file path '{}'", path.display());
            }
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .init();
            None
        }
    }
}

fn ensure_dir(dir: Option<&Path>) -> std::io::Result<()> {
    match dir {
        Some(dir) if !dir.exists() => std::fs::create_dir_all(dir),
        _ => Ok(()),
    }
}
