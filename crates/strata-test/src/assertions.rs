//! Assertion helpers.

use strata_middleware::{Context, Serializer, Value};

/// Serializes `value`, deserializes the result and asserts that the value
/// came back unchanged. Returns the stored form.
///
/// # Panics
///
/// Panics if either direction fails or the round trip changes the value.
pub async fn assert_round_trip(serializer: &Serializer, value: impl Into<Value>) -> Value {
    let value = value.into();
    let ctx = Context::new();

    let stored = match serializer.serialize_resolved(value.clone(), &ctx).await {
        Ok(stored) => stored,
        Err(err) => panic!("serialize through {:?} failed: {err}", serializer.middleware_names()),
    };
    let restored = match serializer.deserialize_resolved(stored.clone(), &ctx).await {
        Ok(restored) => restored,
        Err(err) => panic!(
            "deserialize through {:?} failed: {err}",
            serializer.middleware_names()
        ),
    };

    assert_eq!(
        restored,
        value,
        "round trip through {:?} changed the value",
        serializer.middleware_names()
    );
    stored
}
