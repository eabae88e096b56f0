//! Tracing subscriber setup shared by the binaries

use std::path::Path;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info,trip_planner=debug,tower_http=info";

/// Initialize logging.
///
/// With a log directory, writes daily-rotated JSON files named
/// `<file_prefix>.log.<date>`; otherwise writes human-readable lines to stderr.
pub fn init_logging(log_dir: Option<&Path>, file_prefix: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    match log_dir {
        Some(log_dir) => {
            std::fs::create_dir_all(log_dir)?;
            let file_appender = tracing_appender::rolling::daily(log_dir, format!("{}.log", file_prefix));

            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(file_appender)
                        .with_ansi(false)
                        .with_target(true)
                        .with_thread_ids(true)
                        .with_file(true)
                        .with_line_number(true)
                        .json(),
                )
                .try_init()?;

            info!(log_dir = %log_dir.display(), "Logging initialized");
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .try_init()?;

            debug!("Logging initialized on stderr");
        }
    }

    Ok(())
}
