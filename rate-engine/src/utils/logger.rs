//! Logging setup
//!
//! `RUST_LOG` wins when set; otherwise `level` (default `info`) applies to
//! every target.

use tracing_subscriber::EnvFilter;

/// Initialize the logger
pub fn init_logger() {
    init_logger_with_level(None, false);
}

/// Initialize the logger with an explicit default level, optionally as JSON lines
pub fn init_logger_with_level(level: Option<&str>, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.unwrap_or("info")));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    // a global subscriber may already be installed
    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = result {
        tracing::debug!("Logger already initialized: {e}");
    }
}
