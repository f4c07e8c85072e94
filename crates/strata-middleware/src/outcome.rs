//! Immediate-or-pending results.
//!
//! Middlewares may finish synchronously or hand back a future. [`Outcome`]
//! is the disjoint union of the two; the [`Serializer`](crate::Serializer)
//! and the lazy wrappers pattern-match on it at each step instead of
//! forcing every stage to be async.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::error::{StrataError, StrataResult};
use crate::value::Value;

/// A boxed future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A pending pipeline value: a one-shot future that resolves or rejects.
pub type PendingValue = BoxFuture<'static, StrataResult<Value>>;

/// Result of a middleware or lazy invocation.
pub enum Outcome {
    /// The value is available now.
    Ready(Value),
    /// The value will be available when the future settles.
    Pending(PendingValue),
}

impl Outcome {
    /// Wraps an immediately available value.
    pub fn ready(value: impl Into<Value>) -> Self {
        Self::Ready(value.into())
    }

    /// Wraps a future.
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = StrataResult<Value>> + Send + 'static,
    {
        Self::Pending(Box::pin(future))
    }

    /// A pending result that rejects with `err` when awaited.
    pub fn rejected(err: StrataError) -> Self {
        Self::pending(async move { Err(err) })
    }

    /// Returns true if the value is not yet available.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// Returns the value if it is immediately available.
    #[must_use]
    pub fn into_ready(self) -> Option<Value> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Pending(_) => None,
        }
    }

    /// Waits for the value.
    pub async fn resolve(self) -> StrataResult<Value> {
        match self {
            Self::Ready(value) => Ok(value),
            Self::Pending(future) => future.await,
        }
    }

    /// Chains a continuation onto this outcome.
    ///
    /// A ready value is handed to `f` straight away and its result returned
    /// as-is, so a synchronous error stays synchronous. A pending value gets
    /// `f` attached as a continuation; an error returned by `f` then becomes
    /// a rejection of the combined future.
    pub fn then<F>(self, f: F) -> StrataResult<Self>
    where
        F: FnOnce(Value) -> StrataResult<Self> + Send + 'static,
    {
        match self {
            Self::Ready(value) => f(value),
            Self::Pending(future) => Ok(Self::pending(async move {
                let value = future.await?;
                f(value)?.resolve().await
            })),
        }
    }
}

impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            Self::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

impl From<Value> for Outcome {
    fn from(value: Value) -> Self {
        Self::Ready(value)
    }
}
