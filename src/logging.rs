use std::fs::File;
use std::io;
use std::path::PathBuf;

use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable naming a log file base path.
pub const LOG_FILE_ENV: &str = "QUERYBIND_LOG";

/// Initialize tracing.
///
/// Filtered by `RUST_LOG` (default `warn`). Logs go to stderr unless
/// `QUERYBIND_LOG` names a file base path; the file is then
/// `{path}.{timestamp}.{pid}` so concurrent runs never share one. Returns the
/// log file path when one was opened.
pub fn init_tracing() -> Option<PathBuf> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (writer, ansi, log_file) = match std::env::var(LOG_FILE_ENV).ok() {
        Some(base) => match open_log_file(&base) {
            Ok((file, path)) => (BoxMakeWriter::new(file), false, Some(path)),
            Err(e) => {
                eprintln!("Warning: Failed to create log file for '{}': {}", base, e);
                (BoxMakeWriter::new(io::stderr), true, None)
            }
        },
        None => (BoxMakeWriter::new(io::stderr), true, None),
    };

    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_timer(UtcTime::rfc_3339())
        .with_target(true)
        .with_level(true);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init();

    log_file
}

fn open_log_file(base: &str) -> io::Result<(File, PathBuf)> {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let path = PathBuf::from(format!("{}.{}.{}", base, timestamp, std::process::id()));
    let file = File::create(&path)?;
    Ok((file, path))
}
