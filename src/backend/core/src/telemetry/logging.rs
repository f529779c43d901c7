//! Structured logging with JSON, pretty and compact formats.
//!
//! Output goes to stderr so it never interleaves with command output on
//! stdout. Events carry user, resource and action fields; content and key
//! material are never logged.

use serde::Deserialize;
use std::collections::HashMap;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Global log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, pretty or compact)
    #[serde(default)]
    pub format: LogFormat,

    /// Per-module log levels
    #[serde(default)]
    pub module_levels: HashMap<String, String>,

    /// Whether to include file/line information
    #[serde(default)]
    pub include_location: bool,

    /// Whether to include target (module path)
    #[serde(default = "default_include_target")]
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            module_levels: HashMap::new(),
            include_location: false,
            include_target: default_include_target(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format for log shipping
    Json,
    /// Multi-line format for debugging
    Pretty,
    /// Single-line format for interactive use
    #[default]
    Compact,
}

fn default_log_level() -> String {
    std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string())
}

fn default_include_target() -> bool {
    true
}

/// Build the filter from the global level plus per-module directives.
pub fn build_filter(config: &LoggingConfig) -> anyhow::Result<EnvFilter> {
    let mut filter = EnvFilter::try_new(&config.level)?;
    for (module, level) in &config.module_levels {
        let directive = format!("{}={}", module, level);
        filter = filter.add_directive(directive.parse()?);
    }
    Ok(filter)
}

/// Initialize the logging subsystem.
///
/// # Errors
///
/// Returns an error if a level directive is invalid or a global subscriber
/// is already installed.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = build_filter(config)?;

    match config.format {
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_target(config.include_target);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()?;
        }
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .pretty()
                .with_writer(std::io::stderr)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_target(config.include_target);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()?;
        }
        LogFormat::Compact => {
            let fmt_layer = fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_target(config.include_target);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()?;
        }
    }

    Ok(())
}
