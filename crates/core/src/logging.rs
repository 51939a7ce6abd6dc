use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Filter directive variable, checked before `RUST_LOG`.
pub const LOG_ENV: &str = "STRATA_LOG";

/// `$HOME/.strata/logs`, or `./.strata/logs` without a home directory.
pub fn log_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".strata/logs")
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Daily `<component>.<date>` file under `dir`, or a sink when `dir` is unusable.
fn file_writer(dir: &Path, component: &str) -> (NonBlocking, WorkerGuard, Option<std::io::Error>) {
    match std::fs::create_dir_all(dir) {
        Ok(()) => {
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, component));
            (writer, guard, None)
        }
        Err(err) => {
            let (writer, guard) = tracing_appender::non_blocking(std::io::sink());
            (writer, guard, Some(err))
        }
    }
}

/// Install the global subscriber. Keep the guard alive for the life of the
/// process or buffered lines are lost.
pub fn init_logging(component: &str, to_stderr: bool) -> WorkerGuard {
    let dir = log_dir();
    let (writer, guard, dir_error) = file_writer(&dir, component);

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true);
    let registry = tracing_subscriber::registry().with(filter()).with(file_layer);

    // Without a log file, stderr is the only place left to report to.
    if to_stderr || dir_error.is_some() {
        let stderr_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(to_stderr)
            .with_target(false);
        registry.with(stderr_layer).init();
    } else {
        registry.init();
    }

    if let Some(err) = dir_error {
        tracing::warn!("cannot create log directory {}: {}; file logging disabled", dir.display(), err);
    }
    guard
}
