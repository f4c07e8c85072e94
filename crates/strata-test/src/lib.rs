//! # Strata Test
//!
//! Fixture middlewares for exercising a Strata [`Serializer`] without any
//! production stage.
//!
//! ## Fixtures
//!
//! | Fixture | Serialize | Deserialize |
//! |---------|-----------|-------------|
//! | [`RecordingMiddleware`] | pass through, logged | pass through, logged |
//! | [`FailingMiddleware`] | fails in the chosen direction | fails in the chosen direction |
//! | [`DeferredMiddleware`] | wraps a stage, result pending | wraps a stage, result pending |
//! | [`DoubleFieldMiddleware`] | `{x}` → `x * 2` | `y` → `{x: y / 2}` |
//! | [`StringifyMiddleware`] | integer → string | string → integer |
//! | [`JsonMiddleware`] | value → JSON bytes | JSON bytes → value |
//! | [`GzipMiddleware`] | bytes → gzip | gzip → bytes |
//! | [`LazyFieldMiddleware`] | map field → lazy JSON text | lazy JSON text → lazy value |
//!
//! ## Example
//!
//! ```
//! use strata_middleware::{Serializer, Value};
//! use strata_test::{assert_round_trip, DoubleFieldMiddleware, StringifyMiddleware};
//!
//! let serializer = Serializer::builder()
//!     .middleware(DoubleFieldMiddleware::default())
//!     .middleware(StringifyMiddleware)
//!     .build();
//!
//! let input = Value::from_iter([("x".to_string(), Value::Int(5))]);
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! let stored = runtime.block_on(assert_round_trip(&serializer, input));
//! assert_eq!(stored, Value::from("10"));
//! ```
//!
//! [`Serializer`]: strata_middleware::Serializer

#![doc(html_root_url = "https://docs.rs/strata-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod assertions;
mod codec;
mod lazy_field;
mod stages;

pub use assertions::assert_round_trip;
pub use codec::{GzipMiddleware, JsonMiddleware};
pub use lazy_field::LazyFieldMiddleware;
pub use stages::{
    Call, CallLog, DeferredMiddleware, DoubleFieldMiddleware, FailingMiddleware, FailureMode,
    RecordingMiddleware, StringifyMiddleware,
};
