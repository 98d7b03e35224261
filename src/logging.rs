//! Logging initialisation
//!
//! txscope emits `tracing` events and spans on its own; this module is a
//! convenience for binaries and tests that want a subscriber installed.
//!
//! Priority order (highest to lowest):
//! 1. `TXSCOPE_LOG` (filter directives) and `TXSCOPE_LOG_FORMAT`
//! 2. [`LoggingConfig`]
//! 3. Defaults
//!
//! Interesting targets:
//! - `txscope_engine::coordinator`: scope open/commit/rollback/timeout
//! - `txscope_engine::router`: per-operation routing decisions (trace)
//! - `txscope_concurrency`: handle installation and call-graph entry (trace)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};
use txscope_core::{Error, Result};

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text
    #[serde(default = "default_format")]
    pub format: String,

    /// Enable colored output (text format only)
    #[serde(default)]
    pub ansi: bool,

    /// Module-specific log levels
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_format(),
            ansi: false,
            modules: HashMap::new(),
        }
    }
}

/// Install a global subscriber
///
/// Returns `Ok(false)` when a global subscriber was already installed, so it
/// is safe to call from every test.
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<bool> {
    let filter = build_env_filter(config)?;
    let format = determine_format(config)?;
    let ansi = config.map(|c| c.ansi).unwrap_or(false);

    let registry = Registry::default().with(filter);
    let installed = if format == "json" {
        registry
            .with(fmt::layer().json().with_target(true))
            .try_init()
            .is_ok()
    } else {
        registry
            .with(fmt::layer().with_target(true).with_ansi(ansi))
            .try_init()
            .is_ok()
    };
    if installed {
        tracing::debug!(format = %format, "logging initialised");
    }
    Ok(installed)
}

/// Build environment filter from config or environment variables
fn build_env_filter(config: Option<&LoggingConfig>) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_env("TXSCOPE_LOG") {
        return Ok(filter);
    }

    let level = config.map(|c| c.level.as_str()).unwrap_or("info");
    if level == "off" {
        return Ok(EnvFilter::new("off"));
    }

    let mut filter = EnvFilter::new(level);
    if let Some(config) = config {
        for (module, module_level) in &config.modules {
            let directive = format!("{}={}", module, module_level);
            filter = filter.add_directive(
                directive
                    .parse()
                    .map_err(|e| Error::InvalidConfig(format!("invalid log directive: {}", e)))?,
            );
        }
    }
    Ok(filter)
}

/// Determine output format from config or environment
fn determine_format(config: Option<&LoggingConfig>) -> Result<String> {
    if let Ok(format) = std::env::var("TXSCOPE_LOG_FORMAT") {
        if format == "json" || format == "text" {
            return Ok(format);
        }
    }

    let format = config.map(|c| c.format.as_str()).unwrap_or("text");
    if format != "json" && format != "text" {
        return Err(Error::InvalidConfig(format!(
            "invalid log format: {} (must be 'json' or 'text')",
            format
        )));
    }
    Ok(format.to_string())
}
