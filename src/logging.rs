use crate::config::LoggingConfig;
use std::fs;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// `EnvFilter` directive for this crate at `level`.
pub fn default_directive(level: &str) -> String {
    format!("iso_scraper={}", level.trim().to_ascii_lowercase())
}

/// Daily rolling appender for `config.file_name`, creating `config.dir` first.
fn file_appender(config: &LoggingConfig) -> RollingFileAppender {
    // Ensure logs directory exists
    let _ = fs::create_dir_all(&config.dir);
    tracing_appender::rolling::daily(&config.dir, &config.file_name)
}

/// Initializes the logging system with console output and a JSON file in
/// `config.dir`, rotated daily.
///
/// Console output goes to stderr so stdout stays free for records.
pub fn init_logging(config: &LoggingConfig) {
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender(config));

    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);
    let console_layer = fmt::layer().with_writer(std::io::stderr);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(&config.level)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init();

    // Keep the writer alive for the life of the process so buffered lines are flushed
    std::mem::forget(guard);
}
