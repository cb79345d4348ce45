//! Environment-based configuration.

use std::collections::HashMap;
use std::str::FromStr;

use super::{LogFormat, RegistryConfig};
use crate::error::{NetExpectError, Result};

/// Environment configuration prefix.
pub const DEFAULT_PREFIX: &str = "NET_EXPECT";

/// Environment variable reader.
///
/// Values set through [`EnvConfig::with_var`] shadow the process
/// environment, which keeps tests away from global state.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Prefix for environment variables.
    prefix: String,
    /// Values that shadow the process environment.
    overrides: HashMap<String, String>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl EnvConfig {
    /// Create a new environment config reader.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            overrides: HashMap::new(),
        }
    }

    /// Shadow a variable (name without prefix).
    #[must_use]
    pub fn with_var(mut self, name: &str, value: impl Into<String>) -> Self {
        let var_name = self.var_name(name);
        self.overrides.insert(var_name, value.into());
        self
    }

    /// Build the full environment variable name.
    fn var_name(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_uppercase()
        } else {
            format!("{}_{}", self.prefix, name.to_uppercase())
        }
    }

    /// Get a string value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        let var_name = self.var_name(name);
        self.overrides
            .get(&var_name)
            .cloned()
            .or_else(|| std::env::var(&var_name).ok())
    }

    /// Get a parsed value, reporting values that do not parse.
    pub fn parse<T: FromStr>(&self, name: &str) -> Result<Option<T>> {
        self.get(name)
            .map(|raw| {
                raw.trim().parse().map_err(|_| {
                    NetExpectError::config(format!(
                        "{} has unparsable value '{raw}'",
                        self.var_name(name)
                    ))
                })
            })
            .transpose()
    }

    /// Get a boolean value.
    #[must_use]
    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).map(|v| {
            matches!(
                v.to_lowercase().as_str(),
                "1" | "true" | "yes" | "on" | "enabled"
            )
        })
    }

    /// Overlay every recognised variable onto `config`.
    pub fn apply(&self, config: &mut RegistryConfig) -> Result<()> {
        if let Some(v) = self.parse(vars::DEFAULT_TIMEOUT_MS)? {
            config.default_timeout_ms = v;
        }
        if let Some(v) = self.parse(vars::DEFAULT_ASSERT_TIMEOUT_MS)? {
            config.default_assert_timeout_ms = v;
        }
        if let Some(v) = self.parse(vars::TERMINAL_RETENTION_MS)? {
            config.terminal_retention_ms = v;
        }
        if let Some(v) = self.parse(vars::MAX_BODY_BYTES)? {
            config.max_body_bytes = v;
        }
        if let Some(v) = self.parse(vars::EXCERPT_CHARS)? {
            config.excerpt_chars = v;
        }
        if let Some(v) = self.bool(vars::EVICT_AFTER_ASSERT) {
            config.evict_after_assert = v;
        }
        if let Some(v) = self.get(vars::LOG_LEVEL) {
            config.logging.filter = v;
        }
        if let Some(v) = self.get(vars::LOG_FORMAT) {
            config.logging.format = v.parse::<LogFormat>()?;
        }
        Ok(())
    }
}

impl RegistryConfig {
    /// Defaults overlaid with `NET_EXPECT_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        EnvConfig::default().apply(&mut config)?;
        config.validate()?;
        Ok(config)
    }
}

/// Recognised variable names (without prefix).
pub mod vars {
    /// Default expectation timeout in milliseconds.
    pub const DEFAULT_TIMEOUT_MS: &str = "DEFAULT_TIMEOUT_MS";
    /// Default assertion wait bound in milliseconds.
    pub const DEFAULT_ASSERT_TIMEOUT_MS: &str = "DEFAULT_ASSERT_TIMEOUT_MS";
    /// Terminal retention in milliseconds.
    pub const TERMINAL_RETENTION_MS: &str = "TERMINAL_RETENTION_MS";
    /// Captured body cap in bytes.
    pub const MAX_BODY_BYTES: &str = "MAX_BODY_BYTES";
    /// Excerpt length in characters.
    pub const EXCERPT_CHARS: &str = "EXCERPT_CHARS";
    /// Evict after assert.
    pub const EVICT_AFTER_ASSERT: &str = "EVICT_AFTER_ASSERT";
    /// Log filter directive.
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
    /// Log format.
    pub const LOG_FORMAT: &str = "LOG_FORMAT";
}
