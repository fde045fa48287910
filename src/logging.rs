//! Logging setup for drive.
//!
//! Output goes to stdout and, optionally, to a log file. `RUST_LOG` takes
//! precedence over the configured level.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::Result;

/// Dependencies that are too chatty at the application's level.
const QUIET_TARGETS: [&str; 3] = ["sqlx=warn", "hyper=warn", "reqwest=warn"];

fn level_from_name(name: &str) -> Level {
    name.trim().parse().unwrap_or(Level::INFO)
}

/// Filter for `level`, unless `RUST_LOG` is set.
fn build_filter(level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let level = level_from_name(level);
    QUIET_TARGETS
        .iter()
        .filter_map(|directive| directive.parse::<Directive>().ok())
        .fold(EnvFilter::default().add_directive(level.into()), |filter, directive| {
            filter.add_directive(directive)
        })
}

/// Initialize logging from the configuration.
///
/// With an empty `file`, only stdout is used. The log file is appended to.
pub fn init(config: &LoggingConfig) -> Result<()> {
    if config.file.is_empty() {
        init_console_only(&config.level);
        return Ok(());
    }

    let path = Path::new(&config.file);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let log_file = Arc::new(OpenOptions::new().create(true).append(true).open(path)?);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout.and(log_file))
                .with_ansi(false)
                .with_target(true),
        )
        .with(build_filter(&config.level))
        .try_init()
        .map_err(|e| crate::DriveError::Config(format!("logging already initialized: {e}")))?;

    Ok(())
}

/// Initialize stdout-only logging.
///
/// Does nothing when a subscriber is already installed.
pub fn init_console_only(level: &str) {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(build_filter(level))
        .try_init();
}
