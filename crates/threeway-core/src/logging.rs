//! Logging setup (§4.11): a rolling file appender alongside stdout,
//! filtered by `RUST_LOG` with an engine-appropriate default.

use std::path::Path;
use tracing_appender::rolling;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes logging with both stdout and file output. The returned
/// guard must be held for the lifetime of the process so buffered log
/// lines are flushed on exit.
pub fn init_logging(log_dir: &Path) -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = rolling::never(log_dir, "threeway.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // `try_init` rather than `init`: a process that constructs more than one
    // session (e.g. the CLI's own test binary) must not panic the second
    // time a global subscriber is installed.
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();

    Ok(guard)
}
