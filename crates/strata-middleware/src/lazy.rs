//! Lazy values: deferred, memoised computations owned by a middleware.
//!
//! A middleware that does not want to materialise an expensive sub-value
//! wraps it in a [`LazyValue`]. The value carries three pieces of metadata
//! alongside its computation:
//!
//! - a **target**, the [`MiddlewareId`] of the owning middleware, so that
//!   [`is_lazy`] can scope identity checks;
//! - **options**, an opaque [`LazyOptions`] bag the owner reads back later;
//! - a **link** slot pointing at the most recent transformation of the value.
//!   [`serialize_lazy`] links the pre-image forward to its serialised form,
//!   [`deserialize_lazy`] links the deserialised form back to its source.
//!
//! The computation runs at most once per handle. Every invocation after the
//! first (including concurrent ones) observes the single memoised outcome.
//!
//! ```text
//!              invoke()                 settles
//! Unevaluated ─────────▶ Evaluating ─────────────▶ Memoized(result)
//!
//! un_memoize_lazy(v) ─▶ Poisoned   (every invocation fails)
//! ```
//!
//! A memoised handle is never reset in place. [`un_memoize_lazy`] builds a
//! parallel chain of poisoned handles instead, preserving the shape of the
//! link chain while refusing any further evaluation.

use futures_util::future::{FutureExt, Shared};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::{Arc, OnceLock};
use strata_telemetry::fields;
use tracing::{debug, trace};

use crate::error::{StrataError, StrataResult};
use crate::middleware::MiddlewareId;
use crate::outcome::{Outcome, PendingValue};
use crate::value::Value;

/// Options a middleware attaches to its lazy values.
pub type LazyOptions = serde_json::Map<String, serde_json::Value>;

type Thunk = Box<dyn FnOnce() -> StrataResult<Outcome> + Send>;

/// Evaluation state of a [`LazyValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LazyState {
    /// Not yet invoked.
    Unevaluated,
    /// Invoked; the computation is running.
    Evaluating,
    /// The computation produced a result (which may still be pending).
    Memoized,
    /// Produced by [`un_memoize_lazy`]; can never be invoked successfully.
    Poisoned,
}

enum Memo {
    Ready(Value),
    Pending(Shared<PendingValue>),
}

impl From<Outcome> for Memo {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Ready(value) => Self::Ready(value),
            Outcome::Pending(future) => Self::Pending(future.shared()),
        }
    }
}

enum Body {
    Deferred {
        thunk: Mutex<Option<Thunk>>,
        memo: OnceLock<StrataResult<Memo>>,
    },
    Poisoned,
}

struct LazyInner {
    target: MiddlewareId,
    options: Arc<LazyOptions>,
    body: Body,
    // The serialised handle's thunk holds its pre-image, so a forward link
    // is a cycle until that thunk has run; invoking drops the thunk.
    link: RwLock<Option<Value>>,
}

/// A deferred, memoised computation tagged with its owning middleware.
///
/// Cloning a `LazyValue` clones the handle, not the computation: all clones
/// share one memo and one link slot.
///
/// # Example
///
/// ```
/// use strata_middleware::{LazyValue, MiddlewareId, Outcome, Value};
///
/// let owner = MiddlewareId::next();
/// let lazy = LazyValue::new(owner, Default::default(), || Ok(Outcome::ready(21i64 * 2)));
///
/// let first = lazy.invoke().unwrap().into_ready();
/// let second = lazy.invoke().unwrap().into_ready();
/// assert_eq!(first, Some(Value::Int(42)));
/// assert_eq!(first, second);
/// ```
#[derive(Clone)]
pub struct LazyValue {
    inner: Arc<LazyInner>,
}

impl LazyValue {
    /// Creates a lazy value from a computation.
    ///
    /// `compute` runs on the first [`invoke`](Self::invoke) and never again.
    pub fn new<F>(target: MiddlewareId, options: LazyOptions, compute: F) -> Self
    where
        F: FnOnce() -> StrataResult<Outcome> + Send + 'static,
    {
        Self::from_parts(target, Arc::new(options), Box::new(compute), None)
    }

    /// Creates a lazy value that resolves to an already available value.
    ///
    /// There is nothing to compute, so the handle starts out memoised.
    #[must_use]
    pub fn from_value(value: Value, target: MiddlewareId, options: LazyOptions) -> Self {
        Self::build(
            target,
            Arc::new(options),
            Body::Deferred {
                thunk: Mutex::new(None),
                memo: OnceLock::from(Ok(Memo::Ready(value))),
            },
            None,
        )
    }

    fn from_parts(
        target: MiddlewareId,
        options: Arc<LazyOptions>,
        thunk: Thunk,
        link: Option<Value>,
    ) -> Self {
        Self::build(
            target,
            options,
            Body::Deferred {
                thunk: Mutex::new(Some(thunk)),
                memo: OnceLock::new(),
            },
            link,
        )
    }

    fn build(
        target: MiddlewareId,
        options: Arc<LazyOptions>,
        body: Body,
        link: Option<Value>,
    ) -> Self {
        Self {
            inner: Arc::new(LazyInner {
                target,
                options,
                body,
                link: RwLock::new(link),
            }),
        }
    }

    /// Runs (or replays) the computation.
    ///
    /// The first call runs the computation; its result is memoised and every
    /// later call replays it. A pending result is shared between callers,
    /// and once it has settled later calls get the settled value directly.
    ///
    /// # Errors
    ///
    /// Returns the computation's synchronous error (memoised like any other
    /// result), or [`StrataError::Unmemoized`] for a poisoned handle.
    pub fn invoke(&self) -> StrataResult<Outcome> {
        let (thunk, memo) = match &self.inner.body {
            Body::Poisoned => return Err(StrataError::Unmemoized),
            Body::Deferred { thunk, memo } => (thunk, memo),
        };

        let memo = memo.get_or_init(|| {
            trace!({ fields::TARGET_ID } = %self.inner.target, "evaluating lazy value");
            let compute = thunk.lock().take();
            match compute {
                Some(compute) => compute().map(Memo::from),
                // Only reachable if a previous computation panicked.
                None => Err(StrataError::Unmemoized),
            }
        });

        match memo {
            Ok(Memo::Ready(value)) => Ok(Outcome::Ready(value.clone())),
            Ok(Memo::Pending(shared)) => Ok(match shared.peek() {
                Some(Ok(value)) => Outcome::Ready(value.clone()),
                Some(Err(err)) => Outcome::rejected(err.clone()),
                None => Outcome::Pending(Box::pin(shared.clone())),
            }),
            Err(err) => Err(err.clone()),
        }
    }

    /// Invokes the computation and waits for its value.
    pub async fn resolve(&self) -> StrataResult<Value> {
        self.invoke()?.resolve().await
    }

    /// Returns the owning middleware.
    #[must_use]
    pub fn target(&self) -> MiddlewareId {
        self.inner.target
    }

    /// Returns true if this value is owned by `target`.
    #[must_use]
    pub fn is_for(&self, target: MiddlewareId) -> bool {
        self.inner.target == target
    }

    /// Returns the options attached by the owning middleware.
    #[must_use]
    pub fn options(&self) -> &LazyOptions {
        &self.inner.options
    }

    /// Returns the current evaluation state.
    #[must_use]
    pub fn state(&self) -> LazyState {
        match &self.inner.body {
            Body::Poisoned => LazyState::Poisoned,
            Body::Deferred { thunk, memo } => {
                if memo.get().is_some() {
                    LazyState::Memoized
                } else if thunk.lock().is_some() {
                    LazyState::Unevaluated
                } else {
                    LazyState::Evaluating
                }
            }
        }
    }

    /// Returns true if this handle was produced by [`un_memoize_lazy`].
    #[must_use]
    pub fn is_poisoned(&self) -> bool {
        matches!(self.inner.body, Body::Poisoned)
    }

    /// Returns the value in the link slot.
    #[must_use]
    pub fn serialized_value(&self) -> Option<Value> {
        self.inner.link.read().clone()
    }

    /// Replaces the value in the link slot.
    pub fn set_serialized_value(&self, value: Value) {
        *self.inner.link.write() = Some(value);
    }

    /// Returns true if both handles share the same computation.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for LazyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyValue")
            .field("target", &self.inner.target)
            .field("options", &self.inner.options)
            .field("state", &self.state())
            .finish()
    }
}

impl PartialEq for LazyValue {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

/// Wraps `value` in a lazy value owned by `target`.
///
/// A lazy value already owned by `target` is returned unchanged. A lazy
/// value owned by another middleware is wrapped in a new handle that
/// delegates to it, so the foreign handle keeps its own target. Anything
/// else becomes an already-resolved lazy value.
///
/// `options` defaults to an empty map; `cached` pre-fills the link slot.
#[must_use]
pub fn create_lazy(
    value: Value,
    target: MiddlewareId,
    options: Option<LazyOptions>,
    cached: Option<Value>,
) -> LazyValue {
    let lazy = match value {
        Value::Lazy(lazy) if lazy.is_for(target) => return lazy,
        Value::Lazy(foreign) => LazyValue::new(target, options.unwrap_or_default(), move || {
            foreign.invoke()
        }),
        other => LazyValue::from_value(other, target, options.unwrap_or_default()),
    };
    if let Some(cached) = cached {
        lazy.set_serialized_value(cached);
    }
    lazy
}

/// Returns true if `candidate` is a lazy value, optionally one owned by
/// `target`.
#[must_use]
pub fn is_lazy(candidate: &Value, target: Option<MiddlewareId>) -> bool {
    match (candidate, target) {
        (Value::Lazy(lazy), Some(target)) => lazy.is_for(target),
        (Value::Lazy(_), None) => true,
        _ => false,
    }
}

/// Returns the options of a lazy value; `None` for anything else.
#[must_use]
pub fn get_lazy_options(candidate: &Value) -> Option<&LazyOptions> {
    candidate.as_lazy().map(LazyValue::options)
}

/// Returns the link slot of a lazy value; `None` for anything else.
#[must_use]
pub fn get_lazy_serialized_value(candidate: &Value) -> Option<Value> {
    candidate.as_lazy().and_then(LazyValue::serialized_value)
}

/// Sets the link slot of a lazy value; a no-op for anything else.
pub fn set_lazy_serialized_value(candidate: &Value, value: Value) {
    if let Some(lazy) = candidate.as_lazy() {
        lazy.set_serialized_value(value);
    }
}

/// Builds the serialised form of `lazy`.
///
/// The returned handle, when first invoked, resolves `lazy` and applies
/// `serialize` to the result unless it is falsy, in which case the falsy
/// value passes through. It inherits the target and options of `lazy`, and
/// `lazy`'s link slot is pointed at it.
pub fn serialize_lazy<F>(lazy: &LazyValue, serialize: F) -> LazyValue
where
    F: FnOnce(Value) -> StrataResult<Outcome> + Send + 'static,
{
    let source = lazy.clone();
    let serialized = LazyValue::from_parts(
        lazy.target(),
        Arc::clone(&lazy.inner.options),
        Box::new(move || {
            source.invoke()?.then(move |data| {
                if data.is_falsy() {
                    Ok(Outcome::Ready(data))
                } else {
                    serialize(data)
                }
            })
        }),
        None,
    );
    lazy.set_serialized_value(Value::Lazy(serialized.clone()));
    serialized
}

/// Builds the deserialised form of `lazy`.
///
/// The returned handle, when first invoked, resolves `lazy` and applies
/// `deserialize` to the result. It inherits the target and options of
/// `lazy`, and its own link slot points back at `lazy`.
pub fn deserialize_lazy<F>(lazy: &LazyValue, deserialize: F) -> LazyValue
where
    F: FnOnce(Value) -> StrataResult<Outcome> + Send + 'static,
{
    let source = lazy.clone();
    LazyValue::from_parts(
        lazy.target(),
        Arc::clone(&lazy.inner.options),
        Box::new(move || source.invoke()?.then(deserialize)),
        Some(Value::Lazy(lazy.clone())),
    )
}

/// Replaces a lazy value with a poisoned stand-in.
///
/// Non-lazy values are returned unchanged. For a lazy value, the result
/// keeps its target and options, fails with [`StrataError::Unmemoized`]
/// whenever invoked, and links to the un-memoised form of whatever the
/// original linked to, so the whole serialize/deserialize chain is mirrored
/// by poisoned handles.
#[must_use]
pub fn un_memoize_lazy(value: &Value) -> Value {
    let Value::Lazy(lazy) = value else {
        return value.clone();
    };

    debug!({ fields::TARGET_ID } = %lazy.target(), "un-memoizing lazy value");
    let link = lazy
        .serialized_value()
        .map(|linked| un_memoize_lazy(&linked));

    Value::Lazy(LazyValue::build(
        lazy.target(),
        Arc::clone(&lazy.inner.options),
        Body::Poisoned,
        link,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(counter: &Arc<AtomicUsize>, target: MiddlewareId, result: i64) -> LazyValue {
        let counter = Arc::clone(counter);
        LazyValue::new(target, LazyOptions::new(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Outcome::ready(result))
        })
    }

    #[test]
    fn test_invoke_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let lazy = counting(&calls, MiddlewareId::next(), 7);

        assert_eq!(lazy.state(), LazyState::Unevaluated);
        assert_eq!(lazy.invoke().unwrap().into_ready(), Some(Value::Int(7)));
        assert_eq!(lazy.invoke().unwrap().into_ready(), Some(Value::Int(7)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(lazy.state(), LazyState::Memoized);
    }

    #[test]
    fn test_clones_share_memo() {
        let calls = Arc::new(AtomicUsize::new(0));
        let lazy = counting(&calls, MiddlewareId::next(), 1);
        let clone = lazy.clone();

        lazy.invoke().unwrap();
        clone.invoke().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(lazy.ptr_eq(&clone));
    }

    #[test]
    fn test_sync_failure_is_memoized() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let lazy = LazyValue::new(MiddlewareId::next(), LazyOptions::new(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(StrataError::middleware("test", "broken"))
        });

        assert!(lazy.invoke().is_err());
        assert!(lazy.invoke().is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_pending_result_is_shared() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let lazy = LazyValue::new(MiddlewareId::next(), LazyOptions::new(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Outcome::pending(async {
                tokio::task::yield_now().await;
                Ok(Value::from("chunk"))
            }))
        });

        let a = lazy.invoke().unwrap();
        let b = lazy.invoke().unwrap();
        assert!(a.is_pending());
        let (a, b) = tokio::join!(a.resolve(), b.resolve());
        assert_eq!(a.unwrap(), Value::from("chunk"));
        assert_eq!(b.unwrap(), Value::from("chunk"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Settled: later calls are immediate.
        let c = lazy.invoke().unwrap();
        assert_eq!(c.into_ready(), Some(Value::from("chunk")));
    }

    #[tokio::test]
    async fn test_settled_rejection_stays_asynchronous() {
        let lazy = LazyValue::new(MiddlewareId::next(), LazyOptions::new(), || {
            Ok(Outcome::rejected(StrataError::middleware("test", "async")))
        });

        assert!(lazy.resolve().await.is_err());
        let again = lazy.invoke().unwrap();
        assert!(again.is_pending());
        assert!(again.resolve().await.is_err());
    }

    #[test]
    fn test_create_lazy_is_idempotent_for_same_target() {
        let target = MiddlewareId::next();
        let lazy = create_lazy(Value::Int(3), target, None, None);
        let again = create_lazy(Value::Lazy(lazy.clone()), target, None, None);
        assert!(lazy.ptr_eq(&again));
    }

    #[test]
    fn test_create_lazy_rewraps_foreign_target() {
        let a = MiddlewareId::next();
        let b = MiddlewareId::next();
        let foreign = create_lazy(Value::Int(3), a, None, None);

        let wrapped = create_lazy(Value::Lazy(foreign.clone()), b, None, None);
        assert!(!wrapped.ptr_eq(&foreign));
        assert!(wrapped.is_for(b));
        assert!(foreign.is_for(a));
        assert_eq!(wrapped.invoke().unwrap().into_ready(), Some(Value::Int(3)));
    }

    #[test]
    fn test_create_lazy_with_options_and_cached_value() {
        let mut options = LazyOptions::new();
        options.insert("size".to_string(), json!(1024));
        let lazy = create_lazy(
            Value::from("payload"),
            MiddlewareId::next(),
            Some(options),
            Some(Value::from(vec![1u8, 2])),
        );

        let value = Value::Lazy(lazy);
        assert_eq!(
            get_lazy_options(&value).and_then(|o| o.get("size")),
            Some(&json!(1024))
        );
        assert_eq!(
            get_lazy_serialized_value(&value),
            Some(Value::from(vec![1u8, 2]))
        );
    }

    #[test]
    fn test_is_lazy_scoping() {
        let a = MiddlewareId::next();
        let b = MiddlewareId::next();
        let value = Value::Lazy(create_lazy(Value::Int(1), a, None, None));

        assert!(is_lazy(&value, Some(a)));
        assert!(!is_lazy(&value, Some(b)));
        assert!(is_lazy(&value, None));
        assert!(!is_lazy(&Value::Int(1), None));
    }

    #[test]
    fn test_accessors_on_plain_values() {
        let plain = Value::from("plain");
        assert!(get_lazy_options(&plain).is_none());
        assert!(get_lazy_serialized_value(&plain).is_none());
        set_lazy_serialized_value(&plain, Value::Int(1));
        assert!(get_lazy_serialized_value(&plain).is_none());
    }

    #[test]
    fn test_serialize_lazy_links_forward() {
        let target = MiddlewareId::next();
        let lazy = create_lazy(Value::Int(5), target, None, None);

        let serialized = serialize_lazy(&lazy, |v| Ok(Outcome::ready(v.as_i64().unwrap_or(0) * 2)));

        assert_eq!(
            lazy.serialized_value(),
            Some(Value::Lazy(serialized.clone()))
        );
        assert!(serialized.is_for(target));
        assert_eq!(
            serialized.invoke().unwrap().into_ready(),
            Some(Value::Int(10))
        );
    }

    #[test]
    fn test_forward_link_outlives_serialized_handle() {
        let target = MiddlewareId::next();
        let lazy = create_lazy(Value::Int(5), target, None, None);
        let serialized = serialize_lazy(&lazy, |v| Ok(Outcome::Ready(v)));
        serialized.invoke().unwrap();
        drop(serialized);

        let linked = get_lazy_serialized_value(&Value::Lazy(lazy.clone())).unwrap();
        assert!(is_lazy(&linked, Some(target)));
        assert_eq!(
            linked.as_lazy().unwrap().invoke().unwrap().into_ready(),
            Some(Value::Int(5))
        );

        let poisoned = un_memoize_lazy(&Value::Lazy(lazy));
        let poisoned_link = get_lazy_serialized_value(&poisoned).unwrap();
        assert!(poisoned_link.as_lazy().unwrap().is_poisoned());
    }

    #[test]
    fn test_evaluated_serialized_handle_releases_source() {
        let lazy = create_lazy(Value::Int(5), MiddlewareId::next(), None, None);
        let serialized = serialize_lazy(&lazy, |v| Ok(Outcome::Ready(v)));
        assert_eq!(Arc::strong_count(&lazy.inner), 2);

        serialized.invoke().unwrap();
        assert_eq!(Arc::strong_count(&lazy.inner), 1);
    }

    #[test]
    fn test_serialize_lazy_skips_falsy() {
        let lazy = create_lazy(Value::Int(0), MiddlewareId::next(), None, None);
        let serialized = serialize_lazy(&lazy, |_| Err(StrataError::middleware("test", "called")));
        assert_eq!(serialized.invoke().unwrap().into_ready(), Some(Value::Int(0)));
    }

    #[tokio::test]
    async fn test_serialize_lazy_skips_falsy_from_pending_source() {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = LazyValue::new(MiddlewareId::next(), LazyOptions::new(), || {
            Ok(Outcome::pending(async {
                tokio::task::yield_now().await;
                Ok(Value::Int(0))
            }))
        });
        let counter = Arc::clone(&calls);
        let serialized = serialize_lazy(&source, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(StrataError::middleware("test", "called"))
        });

        let out = serialized.invoke().unwrap();
        assert!(out.is_pending());
        assert_eq!(out.resolve().await.unwrap(), Value::Int(0));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_concurrent_invoke_evaluates_once() {
        const THREADS: usize = 8;

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let lazy = LazyValue::new(MiddlewareId::next(), LazyOptions::new(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(20));
            Ok(Outcome::ready(99i64))
        });
        let barrier = Arc::new(std::sync::Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let lazy = lazy.clone();
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    lazy.invoke().unwrap().into_ready()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), Some(Value::Int(99)));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_serialize_lazy_memoizes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let lazy = create_lazy(Value::Int(2), MiddlewareId::next(), None, None);
        let counter = Arc::clone(&calls);
        let serialized = serialize_lazy(&lazy, move |v| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Outcome::Ready(v))
        });

        serialized.invoke().unwrap();
        serialized.invoke().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_deserialize_lazy_links_back() {
        let mut options = LazyOptions::new();
        options.insert("compressed".to_string(), json!(true));
        let stored = create_lazy(Value::Int(10), MiddlewareId::next(), Some(options), None);

        let restored = deserialize_lazy(&stored, |v| Ok(Outcome::ready(v.as_i64().unwrap_or(0) / 2)));

        assert_eq!(restored.serialized_value(), Some(Value::Lazy(stored.clone())));
        assert_eq!(restored.options().get("compressed"), Some(&json!(true)));
        assert_eq!(restored.invoke().unwrap().into_ready(), Some(Value::Int(5)));
    }

    #[test]
    fn test_deserialize_lazy_applies_to_falsy() {
        let stored = create_lazy(Value::Null, MiddlewareId::next(), None, None);
        let restored = deserialize_lazy(&stored, |_| Ok(Outcome::ready("default")));
        assert_eq!(restored.invoke().unwrap().into_ready(), Some(Value::from("default")));
    }

    #[tokio::test]
    async fn test_deserialize_lazy_over_pending_source() {
        let stored = LazyValue::new(MiddlewareId::next(), LazyOptions::new(), || {
            Ok(Outcome::pending(async { Ok(Value::Int(8)) }))
        });
        let restored = deserialize_lazy(&stored, |v| Ok(Outcome::ready(v.as_i64().unwrap_or(0) + 1)));
        assert_eq!(restored.resolve().await.unwrap(), Value::Int(9));
    }

    #[test]
    fn test_un_memoize_poisons() {
        let target = MiddlewareId::next();
        let lazy = create_lazy(Value::Int(1), target, None, None);
        lazy.invoke().unwrap();

        let poisoned = un_memoize_lazy(&Value::Lazy(lazy.clone()));
        let poisoned = poisoned.as_lazy().unwrap();

        assert!(poisoned.is_poisoned());
        assert_eq!(poisoned.state(), LazyState::Poisoned);
        assert!(poisoned.is_for(target));
        assert!(matches!(poisoned.invoke(), Err(StrataError::Unmemoized)));
        assert!(matches!(poisoned.invoke(), Err(StrataError::Unmemoized)));

        // The original handle is untouched.
        assert_eq!(lazy.invoke().unwrap().into_ready(), Some(Value::Int(1)));
    }

    #[test]
    fn test_un_memoize_unevaluated() {
        let calls = Arc::new(AtomicUsize::new(0));
        let lazy = counting(&calls, MiddlewareId::next(), 1);

        let poisoned = un_memoize_lazy(&Value::Lazy(lazy));
        let err = poisoned.as_lazy().unwrap().invoke().unwrap_err();
        assert_eq!(err.to_string(), crate::error::UNMEMOIZED_MESSAGE);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_un_memoize_non_lazy_is_identity() {
        let value = Value::from("plain");
        assert_eq!(un_memoize_lazy(&value), value);
    }

    #[test]
    fn test_un_memoize_walks_link_chain() {
        let target = MiddlewareId::next();
        let stored = create_lazy(Value::Int(4), target, None, None);
        let restored = deserialize_lazy(&stored, |v| Ok(Outcome::Ready(v)));
        let reserialized = serialize_lazy(&restored, |v| Ok(Outcome::Ready(v)));

        let poisoned = un_memoize_lazy(&Value::Lazy(restored.clone()));
        let poisoned = poisoned.as_lazy().unwrap();

        // restored -> reserialized (forward link) mirrors to a poisoned handle.
        let next = poisoned.serialized_value().unwrap();
        let next = next.as_lazy().unwrap();
        assert!(next.is_poisoned());
        assert!(!next.ptr_eq(&reserialized));
        assert!(next.is_for(target));
        assert!(next.serialized_value().is_none());
    }
}
