//! Typed configuration for Strata.
//!
//! This crate provides a strongly-typed configuration system for Strata
//! serializers with support for:
//! - TOML and JSON configuration files
//! - Environment variable overrides
//! - Strict validation (fails on unknown fields)
//! - Layered configuration (defaults → file → env)
//!
//! # Overview
//!
//! [`StrataConfig`] has two sections:
//!
//! - [`SerializerConfig`] - serializer name and pipeline-level context
//! - [`LoggingConfig`] - log level and output format
//!
//! # Example
//!
//! ```no_run
//! use strata_config::ConfigLoader;
//! use strata_middleware::FnMiddleware;
//!
//! # fn main() -> Result<(), strata_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_defaults()
//!     .with_file("strata.toml")?
//!     .with_env_prefix("STRATA")
//!     .load()?;
//!
//! let serializer = config
//!     .serializer
//!     .builder()
//!     .middleware(FnMiddleware::new("noop"))
//!     .build();
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [serializer]
//! name = "chunks"
//!
//! [serializer.context]
//! compression_level = 6
//!
//! [logging]
//! enabled = true
//! level = "info"
//! format = "json"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Values can be overridden via environment variables using the format
//! `PREFIX__SECTION__KEY`, for example:
//!
//! - `STRATA__SERIALIZER__NAME=chunks`
//! - `STRATA__SERIALIZER__CONTEXT__COMPRESSION_LEVEL=9`
//! - `STRATA__LOGGING__FORMAT=pretty`

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::*;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
