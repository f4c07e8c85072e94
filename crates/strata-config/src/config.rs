//! Main configuration types.
//!
//! This module provides the top-level [`StrataConfig`] struct and its builder.

use serde::{Deserialize, Serialize};
use strata_telemetry::LogConfig;

use crate::{ConfigError, LogFormat, LoggingConfig, SerializerConfig};

/// Complete Strata configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load configuration from files
/// and environment variables.
///
/// # Example
///
/// ```
/// use strata_config::StrataConfig;
///
/// let config = StrataConfig::default();
/// assert_eq!(config.serializer.name, "default");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct StrataConfig {
    /// Serializer configuration.
    #[serde(default)]
    pub serializer: SerializerConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StrataConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> StrataConfigBuilder {
        StrataConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - The serializer name is empty
    /// - A context key is empty
    /// - The log level is not a valid filter directive
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.serializer.name.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "serializer.name",
                "cannot be empty",
            ));
        }

        if self.serializer.context.keys().any(|k| k.trim().is_empty()) {
            return Err(ConfigError::invalid_value(
                "serializer.context",
                "keys cannot be empty",
            ));
        }

        if self.logging.enabled {
            LogConfig::from(&self.logging)
                .validate()
                .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))?;
        }

        Ok(())
    }

    /// Create a development configuration preset.
    ///
    /// - Pretty log formatting
    /// - Debug log level with span events and source locations
    ///
    /// # Example
    ///
    /// ```
    /// use strata_config::StrataConfig;
    ///
    /// let config = StrataConfig::development();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();

        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.span_events = true;
        config.logging.include_location = true;

        config
    }

    /// Create a production configuration preset.
    ///
    /// # Example
    ///
    /// ```
    /// use strata_config::{LogFormat, StrataConfig};
    ///
    /// let config = StrataConfig::production();
    /// assert_eq!(config.logging.format, LogFormat::Json);
    /// ```
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();

        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config.logging.span_events = false;
        config.logging.include_location = false;

        config
    }

    /// Returns the logging section as a telemetry [`LogConfig`].
    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        LogConfig::from(&self.logging)
    }
}

/// Builder for [`StrataConfig`].
#[derive(Debug, Default)]
pub struct StrataConfigBuilder {
    config: StrataConfig,
}

impl StrataConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the serializer configuration.
    #[must_use]
    pub fn serializer(mut self, serializer: SerializerConfig) -> Self {
        self.config.serializer = serializer;
        self
    }

    /// Set the logging configuration.
    #[must_use]
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.config.logging = logging;
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> StrataConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(StrataConfig::default().validate().is_ok());
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(StrataConfig::development().validate().is_ok());
        assert!(StrataConfig::production().validate().is_ok());
    }

    #[test]
    fn test_empty_name_rejected() {
        let config = StrataConfig::builder()
            .serializer(SerializerConfig {
                name: " ".to_string(),
                ..Default::default()
            })
            .build();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "serializer.name"
        ));
    }

    #[test]
    fn test_bad_log_level_rejected() {
        let config = StrataConfig::builder()
            .logging(LoggingConfig {
                level: "strata=verbose".to_string(),
                ..Default::default()
            })
            .build();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_disabled_logging_skips_level_check() {
        let config = StrataConfig::builder()
            .logging(LoggingConfig {
                enabled: false,
                level: String::new(),
                ..Default::default()
            })
            .build();

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_log_config_conversion() {
        let log = StrataConfig::development().log_config();
        assert!(!log.json_format);
        assert!(log.span_events);
        assert_eq!(log.level, "debug");
    }

    #[test]
    fn test_unknown_section_rejected() {
        let result: Result<StrataConfig, _> = toml::from_str("[server]\nport = 1\n");
        assert!(result.is_err());
    }
}
