//! File-based configuration loading.
//!
//! Configuration files are TOML. Every key is optional:
//!
//! ```toml
//! default_timeout_ms = 15000
//! evict_after_assert = true
//!
//! [logging]
//! filter = "net_expect=debug"
//! format = "json"
//! ```

use std::path::Path;

use super::RegistryConfig;
use crate::error::{NetExpectError, Result};

impl RegistryConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| NetExpectError::config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            NetExpectError::io_context(format!("reading config file {}", path.display()), e)
        })?;
        Self::from_toml_str(&content)
    }

    /// Render the configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| NetExpectError::config(format!("cannot serialize config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogFormat;

    #[test]
    fn parse_partial_document() {
        let config = RegistryConfig::from_toml_str(
            r#"
            default_timeout_ms = 15000
            evict_after_assert = true

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.default_timeout_ms, 15_000);
        assert!(config.evict_after_assert);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.excerpt_chars, crate::config::DEFAULT_EXCERPT_CHARS);
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(
            RegistryConfig::from_toml_str("").unwrap(),
            RegistryConfig::default()
        );
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = RegistryConfig::from_toml_str("default_timeout_ms = 5").unwrap_err();
        assert!(err.to_string().contains("default_timeout_ms"));

        let err = RegistryConfig::from_toml_str("default_timeout_ms = \"soon\"").unwrap_err();
        assert!(err.to_string().contains("invalid TOML"));
    }

    #[test]
    fn round_trip_through_toml() {
        let config = RegistryConfig::new().excerpt_chars(64);
        let text = config.to_toml_string().unwrap();
        assert_eq!(RegistryConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = RegistryConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.toml"));
    }
}
