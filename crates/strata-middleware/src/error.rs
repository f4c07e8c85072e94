//! Error types for the serializer pipeline.
//!
//! [`StrataError`] is the single error type that flows through middlewares,
//! lazy values and the [`Serializer`](crate::Serializer). It is `Clone` so
//! that a failure memoised inside a lazy value can be handed to every caller
//! that invokes it.

use std::sync::Arc;
use thiserror::Error;

use crate::middleware::Direction;

/// Result type alias using [`StrataError`].
pub type StrataResult<T> = Result<T, StrataError>;

/// Message carried by [`StrataError::Unmemoized`].
pub const UNMEMOIZED_MESSAGE: &str = "A lazy value that has been unmemorized can't be called again";

/// Errors produced while serializing or deserializing through a pipeline.
#[derive(Error, Debug, Clone)]
pub enum StrataError {
    /// A middleware was asked to run a direction it does not implement.
    ///
    /// This is a configuration defect, never a recoverable condition.
    #[error("middleware '{middleware}' does not implement {direction}")]
    NotImplemented {
        /// Name of the middleware.
        middleware: &'static str,
        /// The direction that was invoked.
        direction: Direction,
    },

    /// A middleware stage failed.
    #[error("middleware '{middleware}' failed: {message}")]
    Middleware {
        /// Name of the failing middleware.
        middleware: String,
        /// Human-readable failure description.
        message: String,
    },

    /// A stage received a value of a shape it cannot handle.
    #[error("unexpected value: expected {expected}, got {actual}")]
    UnexpectedValue {
        /// What the stage expected.
        expected: String,
        /// What it actually got.
        actual: String,
    },

    /// A lazy value produced by un-memoisation was invoked.
    #[error("A lazy value that has been unmemorized can't be called again")]
    Unmemoized,

    /// A foreign error raised inside a stage (codec, I/O, ...).
    #[error(transparent)]
    Other(Arc<dyn std::error::Error + Send + Sync>),
}

impl StrataError {
    /// Create a not-implemented error.
    pub fn not_implemented(middleware: &'static str, direction: Direction) -> Self {
        Self::NotImplemented {
            middleware,
            direction,
        }
    }

    /// Create a middleware failure.
    pub fn middleware(middleware: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Middleware {
            middleware: middleware.into(),
            message: message.into(),
        }
    }

    /// Create an unexpected-value error.
    pub fn unexpected(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::UnexpectedValue {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Wrap any foreign error.
    pub fn other<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Other(Arc::new(err))
    }

    /// Returns true if this error signals a programming defect rather than
    /// a runtime failure.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::NotImplemented { .. } | Self::Unmemoized)
    }
}

impl From<std::io::Error> for StrataError {
    fn from(err: std::io::Error) -> Self {
        Self::other(err)
    }
}

impl From<serde_json::Error> for StrataError {
    fn from(err: serde_json::Error) -> Self {
        Self::other(err)
    }
}
