//! Configuration section types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strata_middleware::{Context, Serializer, SerializerBuilder};
use strata_telemetry::LogConfig;

/// Serializer configuration.
///
/// The `context` table becomes the pipeline-level [`Context`] of every
/// serializer built from this section.
///
/// ```toml
/// [serializer]
/// name = "chunks"
///
/// [serializer.context]
/// compression_level = 6
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SerializerConfig {
    /// Serializer name, attached to log events.
    #[serde(default = "default_serializer_name")]
    pub name: String,

    /// Pipeline-level context entries.
    #[serde(default)]
    pub context: BTreeMap<String, serde_json::Value>,
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            name: default_serializer_name(),
            context: BTreeMap::new(),
        }
    }
}

impl SerializerConfig {
    /// Returns the configured pipeline-level context.
    #[must_use]
    pub fn pipeline_context(&self) -> Context {
        self.context
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Returns a serializer builder seeded with the configured name and
    /// context.
    ///
    /// # Example
    ///
    /// ```
    /// use strata_config::SerializerConfig;
    /// use strata_middleware::FnMiddleware;
    ///
    /// let mut config = SerializerConfig::default();
    /// config.name = "chunks".to_string();
    /// config.context.insert("level".to_string(), 6.into());
    ///
    /// let serializer = config
    ///     .builder()
    ///     .middleware(FnMiddleware::new("noop"))
    ///     .build();
    /// assert_eq!(serializer.name(), "chunks");
    /// assert_eq!(serializer.context().get("level"), Some(&6.into()));
    /// ```
    #[must_use]
    pub fn builder(&self) -> SerializerBuilder {
        SerializerBuilder::new()
            .name(self.name.clone())
            .context(self.pipeline_context())
    }
}

fn default_serializer_name() -> String {
    Serializer::DEFAULT_NAME.to_string()
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs (production).
    #[default]
    Json,
    /// Human-readable pretty format (development).
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (trace, debug, info, warn, error, or per-target).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include span open/close events.
    #[serde(default)]
    pub span_events: bool,

    /// Include source file and line in logs.
    #[serde(default)]
    pub include_location: bool,

    /// Include thread IDs in logs.
    #[serde(default)]
    pub thread_ids: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            span_events: false,
            include_location: false,
            thread_ids: false,
        }
    }
}

impl From<&LoggingConfig> for LogConfig {
    fn from(config: &LoggingConfig) -> Self {
        Self {
            enabled: config.enabled,
            level: config.level.clone(),
            json_format: config.format == LogFormat::Json,
            span_events: config.span_events,
            file_line_info: config.include_location,
            thread_ids: config.thread_ids,
            include_target: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serializer_config_default() {
        let config = SerializerConfig::default();
        assert_eq!(config.name, "default");
        assert!(config.context.is_empty());
        assert!(config.pipeline_context().is_empty());
    }

    #[test]
    fn test_serializer_context_from_toml() {
        let config: SerializerConfig = toml::from_str(
            r#"
            name = "chunks"

            [context]
            compression_level = 6
            codec = "gzip"
        "#,
        )
        .unwrap();

        let ctx = config.pipeline_context();
        assert_eq!(ctx.get("compression_level"), Some(&json!(6)));
        assert_eq!(ctx.get("codec"), Some(&json!("gzip")));
    }

    #[test]
    fn test_builder_carries_name_and_context() {
        let mut config = SerializerConfig::default();
        config.name = "chunks".to_string();
        config.context.insert("codec".to_string(), json!("gzip"));

        let serializer = config.builder().build();
        assert_eq!(serializer.name(), "chunks");
        assert_eq!(serializer.context().get("codec"), Some(&json!("gzip")));
        assert!(serializer.is_empty());
    }

    #[test]
    fn test_serializer_config_rejects_unknown_fields() {
        let result: Result<SerializerConfig, _> = serde_json::from_str(r#"{"nmae": "x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_log_format_deserialize() {
        let format: LogFormat = serde_json::from_str(r#""json""#).unwrap();
        assert_eq!(format, LogFormat::Json);

        let format: LogFormat = serde_json::from_str(r#""pretty""#).unwrap();
        assert_eq!(format, LogFormat::Pretty);
    }

    #[test]
    fn test_logging_config_into_log_config() {
        let config = LoggingConfig {
            format: LogFormat::Pretty,
            include_location: true,
            ..Default::default()
        };

        let log = LogConfig::from(&config);
        assert!(!log.json_format);
        assert!(log.file_line_info);
        assert_eq!(log.level, "info");
    }
}
