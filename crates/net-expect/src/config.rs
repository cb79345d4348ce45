//! Configuration types for net-expect.
//!
//! [`RegistryConfig`] controls default deadlines, how long terminal
//! expectations stay queryable, how much of a response body is retained, and
//! how logs are emitted. It can be built in code, parsed from TOML, or
//! overlaid from `NET_EXPECT_*` environment variables.

pub mod env;
pub mod file;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{NetExpectError, Result};
use crate::expect::validate_timeout;

/// Default expectation timeout (30 seconds).
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default bound on how long `assert_response` waits (10 seconds).
pub const DEFAULT_ASSERT_TIMEOUT_MS: u64 = 10_000;

/// Default retention of terminal expectations (5 minutes).
pub const DEFAULT_TERMINAL_RETENTION_MS: u64 = 300_000;

/// Default cap on a captured body (1 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Default length of body excerpts in assertion results.
pub const DEFAULT_EXCERPT_CHARS: usize = 200;

/// Default tracing filter directive.
pub const DEFAULT_LOG_FILTER: &str = "net_expect=info";

/// Configuration for an expectation registry and its tool surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Timeout applied when a registration does not carry one.
    pub default_timeout_ms: u64,

    /// Wait bound applied when an assertion does not carry one.
    pub default_assert_timeout_ms: u64,

    /// How long terminal expectations are kept before being reaped.
    pub terminal_retention_ms: u64,

    /// Captured bodies are truncated to this many bytes.
    pub max_body_bytes: usize,

    /// Characters of body shown in assertion results.
    pub excerpt_chars: usize,

    /// Evict an expectation (and its captured response) after asserting it.
    pub evict_after_assert: bool,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            default_assert_timeout_ms: DEFAULT_ASSERT_TIMEOUT_MS,
            terminal_retention_ms: DEFAULT_TERMINAL_RETENTION_MS,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
            evict_after_assert: false,
            logging: LoggingConfig::default(),
        }
    }
}

impl RegistryConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default expectation timeout.
    #[must_use]
    pub const fn default_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.default_timeout_ms = timeout_ms;
        self
    }

    /// Set the default assertion wait bound.
    #[must_use]
    pub const fn default_assert_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.default_assert_timeout_ms = timeout_ms;
        self
    }

    /// Set the retention of terminal expectations.
    #[must_use]
    pub const fn terminal_retention_ms(mut self, retention_ms: u64) -> Self {
        self.terminal_retention_ms = retention_ms;
        self
    }

    /// Set the captured body cap.
    #[must_use]
    pub const fn max_body_bytes(mut self, bytes: usize) -> Self {
        self.max_body_bytes = bytes;
        self
    }

    /// Set the excerpt length.
    #[must_use]
    pub const fn excerpt_chars(mut self, chars: usize) -> Self {
        self.excerpt_chars = chars;
        self
    }

    /// Set whether assertions evict their expectation.
    #[must_use]
    pub const fn evict_after_assert(mut self, evict: bool) -> Self {
        self.evict_after_assert = evict;
        self
    }

    /// Set the logging configuration.
    #[must_use]
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }

    /// Retention of terminal expectations as a duration.
    #[must_use]
    pub const fn terminal_retention(&self) -> Duration {
        Duration::from_millis(self.terminal_retention_ms)
    }

    /// Check every value is in range.
    pub fn validate(&self) -> Result<()> {
        validate_timeout(self.default_timeout_ms).map_err(|e| {
            NetExpectError::config(format!("default_timeout_ms: {e}"))
        })?;
        if self.default_assert_timeout_ms == 0 {
            return Err(NetExpectError::config(
                "default_assert_timeout_ms must be greater than zero",
            ));
        }
        if self.max_body_bytes == 0 {
            return Err(NetExpectError::config(
                "max_body_bytes must be greater than zero",
            ));
        }
        if self.excerpt_chars == 0 {
            return Err(NetExpectError::config(
                "excerpt_chars must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Configuration for logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive; `RUST_LOG` takes precedence when set.
    pub filter: String,

    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            format: LogFormat::default(),
        }
    }
}

impl LoggingConfig {
    /// Create a new logging configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the filter directive.
    #[must_use]
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Set the output format.
    #[must_use]
    pub const fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

/// Log format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line human-readable output.
    Pretty,

    /// Single-line human-readable output.
    #[default]
    Compact,

    /// Newline-delimited JSON.
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pretty => "pretty",
            Self::Compact => "compact",
            Self::Json => "json",
        })
    }
}

impl FromStr for LogFormat {
    type Err = NetExpectError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" | "text" => Ok(Self::Compact),
            "json" | "ndjson" => Ok(Self::Json),
            other => Err(NetExpectError::config(format!(
                "unknown log format '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RegistryConfig::default();
        assert_eq!(config.default_timeout_ms, 30_000);
        assert!(!config.evict_after_assert);
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_out_of_range_timeout() {
        let config = RegistryConfig::new().default_timeout_ms(10);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("default_timeout_ms"));
    }

    #[test]
    fn validate_rejects_zero_limits() {
        assert!(RegistryConfig::new().max_body_bytes(0).validate().is_err());
        assert!(RegistryConfig::new().excerpt_chars(0).validate().is_err());
        assert!(
            RegistryConfig::new()
                .default_assert_timeout_ms(0)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn log_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!("xml".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::Pretty.to_string(), "pretty");
    }
}
