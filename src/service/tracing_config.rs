use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use super::{AppResult, LogConfig};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Maps the number of `-v` flags to the level used when `RUST_LOG` is unset.
pub fn default_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Installs the global subscriber.
///
/// Console output always; with a non-empty `log.file_prefix` the same lines
/// also go to an hourly rolling file under `log.dir`. The returned guard must
/// be held until exit or buffered file output is lost.
pub fn setup_tracing(verbosity: u8, log: &LogConfig) -> AppResult<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbosity)));
    let timer = ChronoLocal::new(TIMESTAMP_FORMAT.to_string());

    if log.file_prefix.is_empty() {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_timer(timer)
            .with_target(true)
            .with_thread_names(true)
            .with_line_number(true);
        tracing_subscriber::registry()
            .with(fmt_layer)
            .with(filter)
            .try_init()?;
        return Ok(None);
    }

    let file_appender =
        tracing_appender::rolling::hourly(Path::new(&log.dir), format!("{}.log", log.file_prefix));
    let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);
    // write to both the console and the file
    let writer = non_blocking.and(std::io::stdout);

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_timer(timer)
        .with_target(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_writer(writer);
    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .try_init()?;

    Ok(Some(worker_guard))
}
