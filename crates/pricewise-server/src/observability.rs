//! Structured logging setup.
//!
//! The engine emits `tracing` events and spans: resolution statistics at
//! debug, degraded cache or repository behavior at warn. This module installs
//! a `tracing-subscriber` pipeline for them, JSON for production and pretty
//! text for development. `RUST_LOG` overrides the configured level.
//!
//! ```json
//! {"timestamp":"2026-01-15T10:30:00.000Z","level":"DEBUG","target":"pricewise_server::handlers::discount::handler","fields":{"message":"batch resolved","unique":3}}
//! ```

use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::config::LoggingSettings;

/// Configuration for structured logging.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// JSON lines when true, pretty text otherwise
    pub json_format: bool,
    /// Level used when RUST_LOG is not set
    pub default_level: Level,
    /// Emit span enter/exit events
    pub include_spans: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json_format: false,
            default_level: Level::INFO,
            include_spans: false,
        }
    }
}

impl LoggingConfig {
    pub fn json() -> Self {
        Self {
            json_format: true,
            ..Default::default()
        }
    }

    pub fn text() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }

    pub fn with_spans(mut self) -> Self {
        self.include_spans = true;
        self
    }
}

impl From<&LoggingSettings> for LoggingConfig {
    /// Unparseable levels fall back to INFO; `EngineConfig::validate` rejects
    /// them before this point in normal startup.
    fn from(settings: &LoggingSettings) -> Self {
        let level = Level::from_str(&settings.level).unwrap_or(Level::INFO);
        let base = if settings.json {
            LoggingConfig::json()
        } else {
            LoggingConfig::text()
        };
        base.with_level(level)
    }
}

/// Installs the global subscriber.
///
/// Call once at startup; later calls are ignored because the subscriber is
/// global.
pub fn init_logging(config: LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_level.to_string()));

    let span_events = if config.include_spans {
        FmtSpan::ENTER | FmtSpan::EXIT
    } else {
        FmtSpan::NONE
    };

    if config.json_format {
        let subscriber = tracing_subscriber::registry().with(filter).with(
            fmt::layer()
                .json()
                .with_span_events(span_events)
                .with_current_span(true)
                .with_target(true)
                .with_file(false)
                .with_line_number(false),
        );
        let _ = tracing::subscriber::set_global_default(subscriber);
    } else {
        let subscriber = tracing_subscriber::registry().with(filter).with(
            fmt::layer()
                .pretty()
                .with_span_events(span_events)
                .with_target(true),
        );
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

/// Builds a JSON subscriber writing to `writer`, for capturing log output.
pub fn create_json_layer<W>(writer: W) -> impl tracing::Subscriber + Send + Sync
where
    W: for<'writer> tracing_subscriber::fmt::MakeWriter<'writer> + Send + Sync + 'static,
{
    tracing_subscriber::registry()
        .with(EnvFilter::new("trace"))
        .with(
            fmt::layer()
                .json()
                .with_writer(writer)
                .with_target(true)
                .with_current_span(true),
        )
}
