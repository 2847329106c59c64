//! Logging setup: compact console output plus a daily rolling file

use tracing_subscriber::fmt;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Registry;

use crate::RagChatError;
use crate::Result;

const LOG_DIR: &str = "logs";
const LOG_FILE: &str = "ragchat.log";

pub fn init_logging_with_config(config: &crate::config::AppConfig) -> Result<()> {
    init_logging_with_level(&config.logging.level)
}

/// Install the global subscriber; `RUST_LOG` wins over `level` when set
pub fn init_logging_with_level(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directive(level)))
        .map_err(|e| RagChatError::ConfigError(format!("Invalid log level '{level}': {e}")))?;

    std::fs::create_dir_all(LOG_DIR)?;
    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(LOG_DIR, LOG_FILE));

    let console = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let file = fmt::layer()
        .with_ansi(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(file_writer);

    Registry::default()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| RagChatError::Custom(format!("Failed to initialize logging: {e}")))?;

    // Dropping the guard would stop the background file writer
    std::mem::forget(guard);

    tracing::debug!("Logging to stderr and {LOG_DIR}/{LOG_FILE}.YYYY-MM-DD");
    Ok(())
}

/// Default directive: `level` for our crate and the HTTP layer, warnings from everything else
fn filter_directive(level: &str) -> String {
    format!("warn,ragchat={level},tower_http={level}")
}

/// Test-writer subscriber for unit tests
pub fn init_simple_logging() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_test_writer()
        .try_init()
        .map_err(|e| RagChatError::Custom(format!("Failed to initialize logging: {e}")))
}
