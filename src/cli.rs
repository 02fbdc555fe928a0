use crate::container;
use anyhow::{Context, Result};
use std::env::consts::ARCH;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

pub fn init_logging(level: Level) -> Result<()> {
    let mut subscriber = FmtSubscriber::builder()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_max_level(level);

    // when we run the command with `TRACE` or `DEBUG` level, we want to see
    // the file and line number...
    if [Level::DEBUG, Level::TRACE].contains(&level) {
        subscriber = subscriber.with_file(true).with_line_number(true);
    }

    let subscriber = subscriber.finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set default subscriber")
}

/// Target triple the orchestrator is cross-compiled for when embedded in a
/// container image: a static binary for the host architecture.
pub fn get_default_triple() -> String {
    format!("{ARCH}-unknown-linux-musl")
}

/// An explicitly requested runtime wins over detection.
pub fn resolve_runtime(requested: Option<String>) -> String {
    requested.unwrap_or_else(container::find_runtime)
}

/// Logs the outcome of a build program and maps it to its exit status.
pub fn report(result: Result<Vec<PathBuf>>) -> ExitCode {
    match result {
        Ok(staged) => {
            for path in &staged {
                info!("artifact: {}", path.display());
            }

            ExitCode::SUCCESS
        }

        Err(err) => {
            error!("{err:#}");

            ExitCode::FAILURE
        }
    }
}
