//! # Strata Middleware
//!
//! Middleware contract, lazy-value protocol and serializer pipeline for the
//! Strata storage engine.
//!
//! Storage code never encodes values directly. It hands them to a
//! [`Serializer`], which folds them through an ordered list of
//! [`Middleware`] stages, each owning one narrow concern. Reading reverses
//! the same list.
//!
//! ## Pipeline
//!
//! ```text
//! serialize:    value ─▶ structure ─▶ binary ─▶ compress ─▶ stored
//! deserialize: stored ─▶ compress ─▶ binary ─▶ structure ─▶ value
//! ```
//!
//! ## Key Features
//!
//! - **Sync or async stages**: a stage returns an [`Outcome`], either a
//!   ready [`Value`] or a pending future. The fold only goes async when a
//!   stage does.
//! - **Lazy values**: a stage can defer an expensive sub-value with
//!   [`create_lazy`]. Lazy values are memoised, tagged with the owning
//!   stage's [`MiddlewareId`], and linked across serialize/deserialize so a
//!   re-save can reuse an already-computed stored form.
//! - **Shared context**: every stage receives a [`Context`]; pipeline-level
//!   entries override caller entries.
//!
//! ## Example
//!
//! ```
//! use strata_middleware::{Context, FnMiddleware, Outcome, Serializer, Value};
//!
//! let serializer = Serializer::builder()
//!     .middleware(
//!         FnMiddleware::new("stringify")
//!             .on_serialize(|v, _| Ok(Outcome::ready(v.as_i64().unwrap_or(0).to_string())))
//!             .on_deserialize(|v, _| {
//!                 Ok(Outcome::ready(v.as_str().unwrap_or("0").parse::<i64>().unwrap_or(0)))
//!             }),
//!     )
//!     .build();
//!
//! let stored = serializer.serialize(Value::Int(7), &Context::new());
//! assert_eq!(stored.into_ready(), Some(Value::from("7")));
//! ```

#![doc(html_root_url = "https://docs.rs/strata-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod context;
pub mod error;
pub mod lazy;
pub mod middleware;
pub mod outcome;
pub mod pipeline;
pub mod value;

// Re-export main types at crate root
pub use context::Context;
pub use error::{StrataError, StrataResult, UNMEMOIZED_MESSAGE};
pub use lazy::{
    create_lazy, deserialize_lazy, get_lazy_options, get_lazy_serialized_value, is_lazy,
    serialize_lazy, set_lazy_serialized_value, un_memoize_lazy, LazyOptions, LazyState, LazyValue,
};
pub use middleware::{BoxedMiddleware, Direction, FnMiddleware, Middleware, MiddlewareId};
pub use outcome::{BoxFuture, Outcome, PendingValue};
pub use pipeline::{Serializer, SerializerBuilder};
pub use value::Value;
