//! Core middleware trait and types.
//!
//! This module defines the [`Middleware`] trait that every pipeline stage
//! implements. A stage owns one narrow concern (structural flattening,
//! binary encoding, compression, ...) and implements it in both directions:
//! [`serialize`](Middleware::serialize) moves a value towards its stored
//! form, [`deserialize`](Middleware::deserialize) moves it back.
//!
//! # Example
//!
//! ```
//! use strata_middleware::{Context, Middleware, Outcome, StrataResult, Value};
//!
//! struct Uppercase;
//!
//! impl Middleware for Uppercase {
//!     fn name(&self) -> &'static str {
//!         "uppercase"
//!     }
//!
//!     fn serialize(&self, data: Value, _ctx: &Context) -> StrataResult<Outcome> {
//!         Ok(Outcome::ready(data.as_str().unwrap_or_default().to_uppercase()))
//!     }
//!
//!     fn deserialize(&self, data: Value, _ctx: &Context) -> StrataResult<Outcome> {
//!         Ok(Outcome::ready(data.as_str().unwrap_or_default().to_lowercase()))
//!     }
//! }
//!
//! let out = Uppercase.serialize(Value::from("chunk"), &Context::new()).unwrap();
//! assert_eq!(out.into_ready(), Some(Value::from("CHUNK")));
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::context::Context;
use crate::error::{StrataError, StrataResult};
use crate::outcome::Outcome;
use crate::value::Value;

/// A type-erased middleware that can be stored in a list.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// The direction a value is travelling through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// From in-memory form towards stored form.
    Serialize,
    /// From stored form back to in-memory form.
    Deserialize,
}

impl Direction {
    /// Returns the direction name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Serialize => "serialize",
            Self::Deserialize => "deserialize",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identifies the middleware that owns a lazy value.
///
/// Middlewares that create lazy values allocate one id at construction and
/// pass it as the target of every lazy value they produce, so that
/// [`is_lazy`](crate::lazy::is_lazy) can tell their values apart from those
/// of other stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MiddlewareId(u64);

static NEXT_MIDDLEWARE_ID: AtomicU64 = AtomicU64::new(1);

impl MiddlewareId {
    /// Allocates a process-unique id.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_MIDDLEWARE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MiddlewareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mw#{}", self.0)
    }
}

/// The core middleware trait.
///
/// Both directions default to [`StrataError::NotImplemented`]; a stage that
/// only makes sense one way overrides just that method.
///
/// # Invariants
///
/// - A stage returning [`Outcome::Pending`] must not rely on being polled
///   before the next stage is scheduled; the serializer only attaches
///   continuations.
/// - A stage that defers a sub-value MUST do so through
///   [`create_lazy`](crate::lazy::create_lazy) or [`LazyValue::new`](crate::LazyValue::new),
///   never by hand-rolling its own deferred type.
/// - `Err` from either method is a synchronous failure.
pub trait Middleware: Send + Sync + 'static {
    /// Returns the name of this middleware, used in logs and errors.
    fn name(&self) -> &'static str;

    /// Moves `data` one step towards its stored form.
    fn serialize(&self, data: Value, ctx: &Context) -> StrataResult<Outcome> {
        let _ = (data, ctx);
        Err(StrataError::not_implemented(self.name(), Direction::Serialize))
    }

    /// Moves `data` one step back towards its in-memory form.
    fn deserialize(&self, data: Value, ctx: &Context) -> StrataResult<Outcome> {
        let _ = (data, ctx);
        Err(StrataError::not_implemented(self.name(), Direction::Deserialize))
    }
}

type StageFn = Box<dyn Fn(Value, &Context) -> StrataResult<Outcome> + Send + Sync>;

/// A middleware built from closures.
///
/// Useful for small one-off stages that do not warrant their own type.
/// A direction without a closure reports [`StrataError::NotImplemented`].
///
/// # Example
///
/// ```
/// use strata_middleware::{Context, FnMiddleware, Middleware, Outcome, Value};
///
/// let negate = FnMiddleware::new("negate")
///     .on_serialize(|v, _| Ok(Outcome::ready(-v.as_i64().unwrap_or_default())))
///     .on_deserialize(|v, _| Ok(Outcome::ready(-v.as_i64().unwrap_or_default())));
///
/// let out = negate.serialize(Value::Int(4), &Context::new()).unwrap();
/// assert_eq!(out.into_ready(), Some(Value::Int(-4)));
/// ```
pub struct FnMiddleware {
    name: &'static str,
    serialize: Option<StageFn>,
    deserialize: Option<StageFn>,
}

impl FnMiddleware {
    /// Creates a function-based middleware with no directions implemented.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            serialize: None,
            deserialize: None,
        }
    }

    /// Sets the serialize closure.
    #[must_use]
    pub fn on_serialize<F>(mut self, f: F) -> Self
    where
        F: Fn(Value, &Context) -> StrataResult<Outcome> + Send + Sync + 'static,
    {
        self.serialize = Some(Box::new(f));
        self
    }

    /// Sets the deserialize closure.
    #[must_use]
    pub fn on_deserialize<F>(mut self, f: F) -> Self
    where
        F: Fn(Value, &Context) -> StrataResult<Outcome> + Send + Sync + 'static,
    {
        self.deserialize = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for FnMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMiddleware")
            .field("name", &self.name)
            .field("serialize", &self.serialize.is_some())
            .field("deserialize", &self.deserialize.is_some())
            .finish()
    }
}

impl Middleware for FnMiddleware {
    fn name(&self) -> &'static str {
        self.name
    }

    fn serialize(&self, data: Value, ctx: &Context) -> StrataResult<Outcome> {
        match &self.serialize {
            Some(f) => f(data, ctx),
            None => Err(StrataError::not_implemented(self.name, Direction::Serialize)),
        }
    }

    fn deserialize(&self, data: Value, ctx: &Context) -> StrataResult<Outcome> {
        match &self.deserialize {
            Some(f) => f(data, ctx),
            None => Err(StrataError::not_implemented(self.name, Direction::Deserialize)),
        }
    }
}
