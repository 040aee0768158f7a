// Process-wide tracing setup: console output plus the log file pipeline

use crate::config::{BoardlogConfig, ConsoleFormat};
use crate::error::{BoardlogError, Result};
use crate::logs::{LogLevel, LogPipeline, PipelineLayer};
use std::sync::Arc;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// Noisy dependencies kept out of the log file below WARN
const QUIET_TARGETS: [&str; 3] = ["hyper", "h2", "tower"];

/// Install the global subscriber
///
/// Console output honours `RUST_LOG` and falls back to `console.level`; the
/// file pipeline receives everything at or above `logs.level`.
pub fn init(config: &BoardlogConfig, pipeline: Arc<LogPipeline>) -> Result<()> {
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.console.level));

    let console: Box<dyn Layer<Registry> + Send + Sync> = match config.console.format {
        ConsoleFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .boxed(),
        ConsoleFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(console.with_filter(console_filter))
        .with(PipelineLayer::new(pipeline).with_filter(file_targets(config.file_level()?)))
        .try_init()
        .map_err(|e| BoardlogError::Internal(format!("Failed to install subscriber: {}", e)))
}

/// Target filter for the file pipeline
pub fn file_targets(min_level: LogLevel) -> Targets {
    QUIET_TARGETS.iter().fold(
        Targets::new().with_default(level_filter(min_level)),
        |targets, target| targets.with_target(*target, LevelFilter::WARN),
    )
}

/// Closest tracing level for a log level; CRITICAL has no tracing counterpart
/// and maps to ERROR (the pipeline itself still drops records below it).
fn level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Warning => LevelFilter::WARN,
        LogLevel::Error | LogLevel::Critical => LevelFilter::ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    #[test]
    fn test_file_targets() {
        let targets = file_targets(LogLevel::Info);
        assert!(targets.would_enable("boardlog::server", &Level::INFO));
        assert!(!targets.would_enable("boardlog::server", &Level::DEBUG));
        assert!(!targets.would_enable("hyper::proto", &Level::INFO));
        assert!(targets.would_enable("hyper::proto", &Level::WARN));
    }

    #[test]
    fn test_level_filter() {
        assert_eq!(level_filter(LogLevel::Warning), LevelFilter::WARN);
        assert_eq!(level_filter(LogLevel::Critical), LevelFilter::ERROR);
    }
}
