//! Coordinator configuration
//!
//! Configuration is either built in code through [`CoordinatorBuilder`] or
//! loaded from TOML:
//!
//! ```toml
//! default_timeout_ms = 5000
//! max_nesting_depth = 8
//! read_only_default = false
//! ```
//!
//! Missing fields take their defaults.

use crate::coordinator::Coordinator;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use txscope_core::{Driver, Error, Result};

/// Default maximum number of nested scopes per coordinator and call graph
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 32;

/// Whole milliseconds in `duration`, saturating at `u64::MAX`
pub(crate) fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Scope manager settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Time budget applied to scopes that do not set their own
    pub default_timeout_ms: Option<u64>,
    /// Maximum nested scopes on one call graph
    pub max_nesting_depth: usize,
    /// Open read-only transactions unless options say otherwise
    pub read_only_default: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: None,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            read_only_default: false,
        }
    }
}

impl CoordinatorConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: CoordinatorConfig =
            toml::from_str(input).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the scope manager cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.max_nesting_depth == 0 {
            return Err(Error::InvalidConfig(
                "max_nesting_depth must be at least 1".to_string(),
            ));
        }
        if self.default_timeout_ms == Some(0) {
            return Err(Error::InvalidConfig(
                "default_timeout_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Default timeout as a duration
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_ms.map(Duration::from_millis)
    }
}

/// Builder for [`Coordinator`]
///
/// # Example
///
/// ```ignore
/// let coordinator = CoordinatorBuilder::new()
///     .timeout(Duration::from_secs(5))
///     .max_nesting_depth(4)
///     .build(driver)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct CoordinatorBuilder {
    config: CoordinatorConfig,
}

impl CoordinatorBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Default time budget for every scope
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.default_timeout_ms = Some(duration_ms(timeout));
        self
    }

    /// No default time budget
    pub fn no_timeout(mut self) -> Self {
        self.config.default_timeout_ms = None;
        self
    }

    /// Maximum nested scopes per call graph
    pub fn max_nesting_depth(mut self, depth: usize) -> Self {
        self.config.max_nesting_depth = depth;
        self
    }

    /// Open read-only transactions by default
    pub fn read_only(mut self) -> Self {
        self.config.read_only_default = true;
        self
    }

    /// Validate the configuration and build the coordinator
    pub fn build<D: Driver>(self, driver: D) -> Result<Coordinator<D>> {
        self.config.validate()?;
        Ok(Coordinator::with_config(driver, self.config))
    }
}
