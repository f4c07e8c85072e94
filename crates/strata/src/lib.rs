//! # Strata
//!
//! A layered serializer for persistent caches. Values are folded through an
//! ordered list of middlewares on the way to storage and back through the
//! same list in reverse on the way out. Expensive sub-values can be
//! deferred as lazy, memoised handles that are only computed on demand.
//!
//! ## Quick Start
//!
//! ```
//! use strata::prelude::*;
//!
//! let config = StrataConfig::development();
//!
//! let serializer = config
//!     .serializer
//!     .builder()
//!     .middleware(
//!         FnMiddleware::new("stringify")
//!             .on_serialize(|v, _| Ok(Outcome::ready(v.as_i64().unwrap_or(0).to_string())))
//!             .on_deserialize(|v, _| {
//!                 Ok(Outcome::ready(v.as_str().unwrap_or("0").parse::<i64>().unwrap_or(0)))
//!             }),
//!     )
//!     .build();
//!
//! let stored = serializer.serialize(Value::Int(10), &Context::new());
//! assert_eq!(stored.into_ready(), Some(Value::from("10")));
//! ```
//!
//! ## Architecture
//!
//! | Crate | Purpose |
//! |-------|---------|
//! | [`middleware`] | Value model, middleware contract, lazy protocol, serializer |
//! | [`config`] | Layered configuration (file, env, presets) |
//! | [`telemetry`] | Structured logging setup |

#![doc(html_root_url = "https://docs.rs/strata/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Value model, middleware contract, lazy protocol and serializer.
pub use strata_middleware as middleware;

/// Layered configuration.
pub use strata_config as config;

/// Structured logging setup.
pub use strata_telemetry as telemetry;

/// Installs the global log subscriber described by `config.logging`.
///
/// # Errors
///
/// Fails if the log level does not parse or a subscriber is already set.
pub fn init_logging(config: &strata_config::StrataConfig) -> strata_telemetry::TelemetryResult<()> {
    strata_telemetry::init_logging(&config.log_config())
}

/// Commonly used types.
pub mod prelude {
    pub use strata_middleware::{
        create_lazy, deserialize_lazy, get_lazy_options, get_lazy_serialized_value, is_lazy,
        serialize_lazy, set_lazy_serialized_value, un_memoize_lazy, BoxedMiddleware, Context,
        Direction, FnMiddleware, LazyOptions, LazyState, LazyValue, Middleware, MiddlewareId,
        Outcome, Serializer, SerializerBuilder, StrataError, StrataResult, Value,
    };

    pub use strata_config::{ConfigLoader, LogFormat, StrataConfig};
}
