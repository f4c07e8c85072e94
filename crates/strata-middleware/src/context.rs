//! Serialization context.
//!
//! A [`Context`] is an open mapping handed to every middleware call. The
//! core imposes no required keys; each middleware decides what it reads.
//! Plain settings live in string-keyed JSON entries, and collaborators that
//! cannot be expressed as JSON (writers, hashers, loggers) are stored as
//! typed extensions.
//!
//! The [`Serializer`](crate::Serializer) merges its own pipeline-level
//! context over the caller's on every call; see [`Context::merge`].

use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Context passed to every middleware call.
///
/// # Example
///
/// ```
/// use strata_middleware::Context;
///
/// let pipeline = Context::new().with("a", 1);
/// let caller = Context::new().with("a", 2).with("b", 3);
///
/// let merged = Context::merge(&caller, &pipeline);
/// assert_eq!(merged.get("a"), Some(&serde_json::json!(1)));
/// assert_eq!(merged.get("b"), Some(&serde_json::json!(3)));
/// ```
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context {
    entries: BTreeMap<String, serde_json::Value>,

    #[serde(skip)]
    extensions: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Context {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges two contexts into a new one.
    ///
    /// Entries and extensions of `overrides` win on collision; `base`
    /// supplies everything else. The serializer calls this with the
    /// caller's context as `base` and its own as `overrides`.
    #[must_use]
    pub fn merge(base: &Self, overrides: &Self) -> Self {
        let mut merged = base.clone();
        merged
            .entries
            .extend(overrides.entries.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged.extensions.extend(
            overrides
                .extensions
                .iter()
                .map(|(k, v)| (*k, Arc::clone(v))),
        );
        merged
    }

    /// Builder-style insert of an entry.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts an entry, returning the previous value for the key.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Option<serde_json::Value> {
        self.entries.insert(key.into(), value.into())
    }

    /// Returns the entry for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.entries.get(key)
    }

    /// Removes and returns the entry for `key`.
    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.entries.remove(key)
    }

    /// Returns true if an entry exists for `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterates over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.entries.iter()
    }

    /// Number of entries (extensions are not counted).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries and no extensions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.extensions.is_empty()
    }

    /// Stores a typed extension value.
    ///
    /// # Example
    ///
    /// ```
    /// use strata_middleware::Context;
    ///
    /// struct HashSeed(u64);
    ///
    /// let mut ctx = Context::new();
    /// ctx.set_extension(HashSeed(7));
    /// assert_eq!(ctx.get_extension::<HashSeed>().map(|s| s.0), Some(7));
    /// ```
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Arc::new(value));
    }

    /// Builder-style variant of [`set_extension`](Self::set_extension).
    #[must_use]
    pub fn with_extension<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.set_extension(value);
        self
    }

    /// Retrieves a typed extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
    }

    /// Returns true if an extension of type `T` is stored.
    #[must_use]
    pub fn has_extension<T: Send + Sync + 'static>(&self) -> bool {
        self.extensions.contains_key(&TypeId::of::<T>())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("entries", &self.entries)
            .field("extensions", &self.extensions.len())
            .finish()
    }
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<K: Into<String>, V: Into<serde_json::Value>> FromIterator<(K, V)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            extensions: HashMap::new(),
        }
    }
}
