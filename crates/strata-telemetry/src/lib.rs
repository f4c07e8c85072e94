//! Structured logging for Strata.
//!
//! The serializer and the lazy-value protocol emit `tracing` events at
//! every stage. This crate installs a subscriber that renders them either
//! as JSON (production) or in a human-readable form (development).
//!
//! # Event levels
//!
//! | Level | Event |
//! |-------|-------|
//! | `trace` | a middleware is applied to a value |
//! | `debug` | a serialize fold stops at a falsy value; a lazy value is un-memoised |
//! | `warn` | a synchronous serialize failure is turned into a rejected result |
//!
//! # Example
//!
//! ```rust,ignore
//! use strata_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//! tracing::info!(serializer = "main", "Serializer ready");
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, fields, init_logging, LogConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
