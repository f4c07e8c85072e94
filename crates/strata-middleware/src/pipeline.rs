//! The serializer pipeline.
//!
//! A [`Serializer`] holds an ordered list of middlewares fixed at
//! construction. [`serialize`](Serializer::serialize) folds a value through
//! them in list order; [`deserialize`](Serializer::deserialize) folds stored
//! data back through the same list in reverse. There is only one list, so
//! the two orders are always exact mirrors.
//!
//! ```text
//! serialize:    value ─▶ mw[0] ─▶ mw[1] ─▶ ... ─▶ mw[n-1] ─▶ stored
//! deserialize: stored ─▶ mw[n-1] ─▶ ... ─▶ mw[1] ─▶ mw[0] ─▶ value
//! ```
//!
//! Every call merges the caller's [`Context`] with the pipeline-level one;
//! pipeline entries win on collision.
//!
//! Log events carry the serializer's name under
//! [`fields::SERIALIZER`](strata_telemetry::fields::SERIALIZER), so several
//! pipelines in one process can be told apart.
//!
//! ## Sync and async stages
//!
//! Each stage returns an [`Outcome`]. While every stage is synchronous the
//! fold stays synchronous; as soon as one stage returns a pending result the
//! remaining stages are attached as continuations, still strictly in order.
//!
//! The two directions handle failures and empty values differently:
//!
//! | | serialize | deserialize |
//! |---|---|---|
//! | falsy value between stages | fold stops, value returned | next stage still runs |
//! | synchronous stage error | becomes a rejected pending result | returned as `Err` |
//! | asynchronous rejection | propagated, later stages skipped | propagated, later stages skipped |
//!
//! Persisted data may depend on this exact behaviour, so it is kept as is.

use std::sync::Arc;
use strata_telemetry::fields;
use tracing::{debug, trace, warn};

use crate::context::Context;
use crate::error::StrataResult;
use crate::middleware::{BoxedMiddleware, Direction, Middleware};
use crate::outcome::Outcome;
use crate::value::Value;

/// An ordered middleware pipeline.
///
/// # Example
///
/// ```
/// use strata_middleware::{Context, FnMiddleware, Outcome, Serializer, Value};
///
/// let double = FnMiddleware::new("double")
///     .on_serialize(|v, _| Ok(Outcome::ready(v.as_i64().unwrap_or(0) * 2)))
///     .on_deserialize(|v, _| Ok(Outcome::ready(v.as_i64().unwrap_or(0) / 2)));
///
/// let serializer = Serializer::builder().middleware(double).build();
///
/// let stored = serializer.serialize(Value::Int(21), &Context::new());
/// assert_eq!(stored.into_ready(), Some(Value::Int(42)));
///
/// let restored = serializer.deserialize(Value::Int(42), &Context::new()).unwrap();
/// assert_eq!(restored.into_ready(), Some(Value::Int(21)));
/// ```
#[derive(Clone)]
pub struct Serializer {
    name: Arc<str>,
    middlewares: Arc<[BoxedMiddleware]>,
    context: Context,
}

impl Serializer {
    /// Name given to serializers built without one.
    pub const DEFAULT_NAME: &'static str = "default";

    /// Creates a serializer from a middleware list and a pipeline context.
    #[must_use]
    pub fn new(middlewares: Vec<BoxedMiddleware>, context: Context) -> Self {
        Self {
            name: Arc::from(Self::DEFAULT_NAME),
            middlewares: middlewares.into(),
            context,
        }
    }

    /// Creates a new serializer builder.
    #[must_use]
    pub fn builder() -> SerializerBuilder {
        SerializerBuilder::new()
    }

    /// Folds `value` through every middleware in order.
    ///
    /// Never fails synchronously: a stage error becomes a rejected
    /// [`Outcome::Pending`], and the stages after it are skipped. A falsy
    /// value (initially or produced by a stage) ends the fold and is
    /// returned unchanged.
    pub fn serialize(&self, value: impl Into<Value>, context: &Context) -> Outcome {
        let ctx = Arc::new(Context::merge(context, &self.context));
        let mut current = Outcome::Ready(value.into());

        for (index, middleware) in self.middlewares.iter().enumerate() {
            current = match current {
                Outcome::Pending(pending) => {
                    let name = Arc::clone(&self.name);
                    let middleware = Arc::clone(middleware);
                    let ctx = Arc::clone(&ctx);
                    Outcome::pending(async move {
                        let data = pending.await?;
                        if data.is_falsy() {
                            return Ok(data);
                        }
                        apply(&name, middleware.as_ref(), Direction::Serialize, data, &ctx)?
                            .resolve()
                            .await
                    })
                }
                Outcome::Ready(data) if data.is_falsy() => {
                    debug!(
                        { fields::SERIALIZER } = %self.name,
                        { fields::STAGE } = index,
                        { fields::VALUE_TYPE } = data.type_name(),
                        "serialize stopped at falsy value"
                    );
                    return Outcome::Ready(data);
                }
                Outcome::Ready(data) => {
                    let applied = apply(
                        &self.name,
                        middleware.as_ref(),
                        Direction::Serialize,
                        data,
                        &ctx,
                    );
                    match applied {
                        Ok(next) => next,
                        Err(err) => {
                            warn!(
                                { fields::SERIALIZER } = %self.name,
                                { fields::MIDDLEWARE } = middleware.name(),
                                { fields::ERROR } = %err,
                                "serialize stage failed, rejecting result"
                            );
                            Outcome::rejected(err)
                        }
                    }
                }
            };
        }

        current
    }

    /// Folds stored data back through every middleware in reverse order.
    ///
    /// # Errors
    ///
    /// A synchronous stage error is returned as `Err` straight away. Errors
    /// from stages that run after a pending result surface as a rejection
    /// of the returned outcome instead.
    pub fn deserialize(&self, value: impl Into<Value>, context: &Context) -> StrataResult<Outcome> {
        let ctx = Arc::new(Context::merge(context, &self.context));
        let mut current = Outcome::Ready(value.into());

        for middleware in self.middlewares.iter().rev() {
            current = match current {
                Outcome::Pending(pending) => {
                    let name = Arc::clone(&self.name);
                    let middleware = Arc::clone(middleware);
                    let ctx = Arc::clone(&ctx);
                    Outcome::pending(async move {
                        let data = pending.await?;
                        apply(&name, middleware.as_ref(), Direction::Deserialize, data, &ctx)?
                            .resolve()
                            .await
                    })
                }
                Outcome::Ready(data) => {
                    apply(&self.name, middleware.as_ref(), Direction::Deserialize, data, &ctx)?
                }
            };
        }

        Ok(current)
    }

    /// Serializes and waits for the final value.
    pub async fn serialize_resolved(
        &self,
        value: impl Into<Value>,
        context: &Context,
    ) -> StrataResult<Value> {
        self.serialize(value, context).resolve().await
    }

    /// Deserializes and waits for the final value.
    pub async fn deserialize_resolved(
        &self,
        value: impl Into<Value>,
        context: &Context,
    ) -> StrataResult<Value> {
        self.deserialize(value, context)?.resolve().await
    }

    /// Returns the serializer's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the names of all middlewares in serialize order.
    #[must_use]
    pub fn middleware_names(&self) -> Vec<&'static str> {
        self.middlewares.iter().map(|mw| mw.name()).collect()
    }

    /// Returns the number of middlewares.
    #[must_use]
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Returns true if the pipeline has no middlewares.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Returns the pipeline-level context.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }
}

impl std::fmt::Debug for Serializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Serializer")
            .field("name", &self.name)
            .field("middlewares", &self.middleware_names())
            .field("context", &self.context)
            .finish()
    }
}

fn apply(
    serializer: &str,
    middleware: &dyn Middleware,
    direction: Direction,
    data: Value,
    ctx: &Context,
) -> StrataResult<Outcome> {
    trace!(
        { fields::SERIALIZER } = serializer,
        { fields::MIDDLEWARE } = middleware.name(),
        { fields::DIRECTION } = direction.name(),
        { fields::VALUE_TYPE } = data.type_name(),
        "applying middleware"
    );
    match direction {
        Direction::Serialize => middleware.serialize(data, ctx),
        Direction::Deserialize => middleware.deserialize(data, ctx),
    }
}

/// Builder for constructing a [`Serializer`].
#[derive(Default)]
pub struct SerializerBuilder {
    name: Option<Arc<str>>,
    middlewares: Vec<BoxedMiddleware>,
    context: Context,
}

impl SerializerBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Names the serializer. Defaults to [`Serializer::DEFAULT_NAME`].
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(Arc::from(name.into()));
        self
    }

    /// Appends a middleware.
    #[must_use]
    pub fn middleware<M: Middleware>(mut self, middleware: M) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Appends an already shared middleware.
    ///
    /// Use this when the caller keeps a handle to the middleware, e.g. to
    /// read its [`MiddlewareId`](crate::MiddlewareId).
    #[must_use]
    pub fn shared_middleware(mut self, middleware: BoxedMiddleware) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Replaces the pipeline-level context.
    #[must_use]
    pub fn context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    /// Adds one pipeline-level context entry.
    #[must_use]
    pub fn context_entry(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.context.insert(key, value);
        self
    }

    /// Builds the serializer. The middleware order is fixed from here on.
    #[must_use]
    pub fn build(self) -> Serializer {
        let mut serializer = Serializer::new(self.middlewares, self.context);
        if let Some(name) = self.name {
            serializer.name = name;
        }
        serializer
    }
}
