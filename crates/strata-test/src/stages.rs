//! Behavioural fixture stages.

use parking_lot::Mutex;
use std::sync::Arc;
use strata_middleware::{
    BoxedMiddleware, Context, Direction, Middleware, Outcome, StrataError, StrataResult, Value,
};

/// One recorded middleware invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// Name of the middleware that was invoked.
    pub middleware: &'static str,
    /// Direction of the invocation.
    pub direction: Direction,
    /// Value the middleware received.
    pub input: Value,
}

/// A shared, append-only log of invocations.
///
/// Clones share the same log, so several [`RecordingMiddleware`]s can write
/// to one log and a test can assert on the interleaving.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every call so far.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().clone()
    }

    /// Returns `"<direction>:<middleware>"` for every call, in order.
    #[must_use]
    pub fn trace(&self) -> Vec<String> {
        self.0
            .lock()
            .iter()
            .map(|call| format!("{}:{}", call.direction, call.middleware))
            .collect()
    }

    /// Number of calls made by `middleware` in `direction`.
    #[must_use]
    pub fn count(&self, middleware: &str, direction: Direction) -> usize {
        self.0
            .lock()
            .iter()
            .filter(|call| call.middleware == middleware && call.direction == direction)
            .count()
    }

    /// Total number of calls.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    /// Forgets every recorded call.
    pub fn clear(&self) {
        self.0.lock().clear();
    }

    fn push(&self, middleware: &'static str, direction: Direction, input: &Value) {
        self.0.lock().push(Call {
            middleware,
            direction,
            input: input.clone(),
        });
    }
}

/// Passes values through unchanged and records every invocation.
#[derive(Debug, Clone)]
pub struct RecordingMiddleware {
    name: &'static str,
    log: CallLog,
}

impl RecordingMiddleware {
    /// Creates a recorder with its own log.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self::with_log(name, CallLog::new())
    }

    /// Creates a recorder writing to a shared log.
    #[must_use]
    pub fn with_log(name: &'static str, log: CallLog) -> Self {
        Self { name, log }
    }

    /// Returns the log this recorder writes to.
    #[must_use]
    pub fn log(&self) -> CallLog {
        self.log.clone()
    }
}

impl Middleware for RecordingMiddleware {
    fn name(&self) -> &'static str {
        self.name
    }

    fn serialize(&self, data: Value, _ctx: &Context) -> StrataResult<Outcome> {
        self.log.push(self.name, Direction::Serialize, &data);
        Ok(Outcome::Ready(data))
    }

    fn deserialize(&self, data: Value, _ctx: &Context) -> StrataResult<Outcome> {
        self.log.push(self.name, Direction::Deserialize, &data);
        Ok(Outcome::Ready(data))
    }
}

/// How a [`FailingMiddleware`] fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Return `Err` from the middleware call.
    Throw,
    /// Return a pending outcome that rejects.
    Reject,
}

/// Fails in one direction and passes values through in the other.
#[derive(Debug, Clone)]
pub struct FailingMiddleware {
    name: &'static str,
    direction: Direction,
    mode: FailureMode,
    message: String,
}

impl FailingMiddleware {
    /// Fails synchronously in `direction`.
    #[must_use]
    pub fn throwing(direction: Direction) -> Self {
        Self::new(direction, FailureMode::Throw)
    }

    /// Fails asynchronously in `direction`.
    #[must_use]
    pub fn rejecting(direction: Direction) -> Self {
        Self::new(direction, FailureMode::Reject)
    }

    fn new(direction: Direction, mode: FailureMode) -> Self {
        Self {
            name: "failing",
            direction,
            mode,
            message: "boom".to_string(),
        }
    }

    /// Sets the middleware name.
    #[must_use]
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Sets the failure message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// The error this middleware fails with.
    #[must_use]
    pub fn error(&self) -> StrataError {
        StrataError::middleware(self.name, self.message.clone())
    }

    fn run(&self, direction: Direction, data: Value) -> StrataResult<Outcome> {
        if direction != self.direction {
            return Ok(Outcome::Ready(data));
        }
        match self.mode {
            FailureMode::Throw => Err(self.error()),
            FailureMode::Reject => Ok(Outcome::rejected(self.error())),
        }
    }
}

impl Middleware for FailingMiddleware {
    fn name(&self) -> &'static str {
        self.name
    }

    fn serialize(&self, data: Value, _ctx: &Context) -> StrataResult<Outcome> {
        self.run(Direction::Serialize, data)
    }

    fn deserialize(&self, data: Value, _ctx: &Context) -> StrataResult<Outcome> {
        self.run(Direction::Deserialize, data)
    }
}

/// Wraps another middleware so that every result is pending.
///
/// The wrapped stage runs after one `tokio` yield, so its errors surface as
/// rejections rather than synchronous failures.
#[derive(Clone)]
pub struct DeferredMiddleware {
    inner: BoxedMiddleware,
}

impl DeferredMiddleware {
    /// Wraps `inner`.
    #[must_use]
    pub fn new<M: Middleware>(inner: M) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    fn defer(&self, direction: Direction, data: Value, ctx: &Context) -> Outcome {
        let inner = Arc::clone(&self.inner);
        let ctx = ctx.clone();
        Outcome::pending(async move {
            tokio::task::yield_now().await;
            let outcome = match direction {
                Direction::Serialize => inner.serialize(data, &ctx)?,
                Direction::Deserialize => inner.deserialize(data, &ctx)?,
            };
            outcome.resolve().await
        })
    }
}

impl std::fmt::Debug for DeferredMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredMiddleware")
            .field("inner", &self.inner.name())
            .finish()
    }
}

impl Middleware for DeferredMiddleware {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn serialize(&self, data: Value, ctx: &Context) -> StrataResult<Outcome> {
        Ok(self.defer(Direction::Serialize, data, ctx))
    }

    fn deserialize(&self, data: Value, ctx: &Context) -> StrataResult<Outcome> {
        Ok(self.defer(Direction::Deserialize, data, ctx))
    }
}

/// Turns `{field: n}` into `n * 2` and back.
#[derive(Debug, Clone, Copy)]
pub struct DoubleFieldMiddleware {
    field: &'static str,
}

impl DoubleFieldMiddleware {
    /// Doubles the integer stored under `field`.
    #[must_use]
    pub const fn new(field: &'static str) -> Self {
        Self { field }
    }
}

impl Default for DoubleFieldMiddleware {
    fn default() -> Self {
        Self::new("x")
    }
}

impl Middleware for DoubleFieldMiddleware {
    fn name(&self) -> &'static str {
        "double-field"
    }

    fn serialize(&self, data: Value, _ctx: &Context) -> StrataResult<Outcome> {
        let n = data
            .get(self.field)
            .and_then(Value::as_i64)
            .ok_or_else(|| {
                StrataError::unexpected(format!("map with integer '{}'", self.field), data.type_name())
            })?;
        Ok(Outcome::ready(n * 2))
    }

    fn deserialize(&self, data: Value, _ctx: &Context) -> StrataResult<Outcome> {
        let n = data
            .as_i64()
            .ok_or_else(|| StrataError::unexpected("int", data.type_name()))?;
        Ok(Outcome::ready(Value::from_iter([(
            self.field.to_string(),
            Value::Int(n / 2),
        )])))
    }
}

/// Turns an integer into its decimal string and back.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringifyMiddleware;

impl Middleware for StringifyMiddleware {
    fn name(&self) -> &'static str {
        "stringify"
    }

    fn serialize(&self, data: Value, _ctx: &Context) -> StrataResult<Outcome> {
        let n = data
            .as_i64()
            .ok_or_else(|| StrataError::unexpected("int", data.type_name()))?;
        Ok(Outcome::ready(n.to_string()))
    }

    fn deserialize(&self, data: Value, _ctx: &Context) -> StrataResult<Outcome> {
        let text = data
            .as_str()
            .ok_or_else(|| StrataError::unexpected("string", data.type_name()))?;
        let n: i64 = text
            .parse()
            .map_err(|_| StrataError::unexpected("decimal integer", text))?;
        Ok(Outcome::ready(n))
    }
}
