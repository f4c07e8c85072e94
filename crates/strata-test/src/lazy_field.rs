//! A stage that routes one map field through the lazy-value protocol.

use strata_middleware::{
    create_lazy, deserialize_lazy, get_lazy_serialized_value, is_lazy, serialize_lazy, Context,
    LazyOptions, Middleware, MiddlewareId, Outcome, StrataError, StrataResult, Value,
};

/// Defers one field of a map.
///
/// On serialize the field is replaced by a lazy value that yields the
/// field's JSON text when invoked. On deserialize the stored lazy value is
/// replaced by one that parses that text back. Nothing is encoded or parsed
/// until someone invokes the lazy value.
///
/// A field that still holds a lazy value produced by this stage (either
/// direction) is linked to its stored form, and that stored form is reused
/// as is on the next serialize.
#[derive(Debug, Clone)]
pub struct LazyFieldMiddleware {
    id: MiddlewareId,
    field: &'static str,
}

impl LazyFieldMiddleware {
    /// Creates a stage deferring `field`.
    #[must_use]
    pub fn new(field: &'static str) -> Self {
        Self {
            id: MiddlewareId::next(),
            field,
        }
    }

    /// The target every lazy value of this stage carries.
    #[must_use]
    pub const fn id(&self) -> MiddlewareId {
        self.id
    }

    fn options(&self) -> LazyOptions {
        let mut options = LazyOptions::new();
        options.insert("field".to_string(), self.field.into());
        options
    }
}

fn encode(value: Value) -> StrataResult<Outcome> {
    let text = serde_json::to_string(&value.to_json()?)?;
    Ok(Outcome::ready(text))
}

fn decode(value: Value) -> StrataResult<Outcome> {
    if value.is_falsy() {
        return Ok(Outcome::Ready(value));
    }
    let text = value
        .as_str()
        .ok_or_else(|| StrataError::unexpected("JSON text", value.type_name()))?;
    let json: serde_json::Value = serde_json::from_str(text)?;
    Ok(Outcome::ready(json))
}

impl Middleware for LazyFieldMiddleware {
    fn name(&self) -> &'static str {
        "lazy-field"
    }

    fn serialize(&self, data: Value, _ctx: &Context) -> StrataResult<Outcome> {
        let Value::Map(mut map) = data else {
            return Ok(Outcome::Ready(data));
        };
        let Some(field) = map.remove(self.field) else {
            return Ok(Outcome::Ready(Value::Map(map)));
        };

        let stored = match get_lazy_serialized_value(&field) {
            Some(linked @ Value::Lazy(_)) if is_lazy(&field, Some(self.id)) => linked,
            _ => {
                let lazy = create_lazy(field, self.id, Some(self.options()), None);
                Value::Lazy(serialize_lazy(&lazy, encode))
            }
        };

        map.insert(self.field.to_string(), stored);
        Ok(Outcome::Ready(Value::Map(map)))
    }

    fn deserialize(&self, data: Value, _ctx: &Context) -> StrataResult<Outcome> {
        let Value::Map(mut map) = data else {
            return Ok(Outcome::Ready(data));
        };
        let Some(field) = map.remove(self.field) else {
            return Ok(Outcome::Ready(Value::Map(map)));
        };

        let stored = create_lazy(field, self.id, Some(self.options()), None);
        map.insert(
            self.field.to_string(),
            Value::Lazy(deserialize_lazy(&stored, decode)),
        );
        Ok(Outcome::Ready(Value::Map(map)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strata_middleware::get_lazy_options;

    fn doc(body: Value) -> Value {
        Value::from_iter([
            ("id".to_string(), Value::Int(1)),
            ("body".to_string(), body),
        ])
    }

    #[tokio::test]
    async fn test_field_becomes_lazy_json_text() {
        let mw = LazyFieldMiddleware::new("body");
        let out = mw
            .serialize(doc(Value::from("hello")), &Context::new())
            .unwrap()
            .into_ready()
            .unwrap();

        let body = out.get("body").unwrap();
        assert!(is_lazy(body, Some(mw.id())));
        assert_eq!(
            get_lazy_options(body).and_then(|o| o.get("field")),
            Some(&json!("body"))
        );
        assert_eq!(out.get("id"), Some(&Value::Int(1)));

        let text = body.as_lazy().unwrap().resolve().await.unwrap();
        assert_eq!(text, Value::from("\"hello\""));
    }

    #[tokio::test]
    async fn test_deserialized_field_parses_on_demand() {
        let mw = LazyFieldMiddleware::new("body");
        let stored = doc(Value::from("[1,2]"));

        let out = mw
            .deserialize(stored, &Context::new())
            .unwrap()
            .into_ready()
            .unwrap();

        let body = out.get("body").and_then(Value::as_lazy).unwrap();
        assert_eq!(
            body.resolve().await.unwrap(),
            Value::from(vec![Value::Int(1), Value::Int(2)])
        );
    }

    #[test]
    fn test_reserialize_reuses_stored_form() {
        let mw = LazyFieldMiddleware::new("body");
        let ctx = Context::new();

        let stored = mw
            .serialize(doc(Value::from("hello")), &ctx)
            .unwrap()
            .into_ready()
            .unwrap();
        let loaded = mw.deserialize(stored.clone(), &ctx).unwrap().into_ready().unwrap();
        let again = mw.serialize(loaded, &ctx).unwrap().into_ready().unwrap();

        // Same handle, not a new serialisation.
        assert_eq!(again.get("body"), stored.get("body"));
    }

    #[test]
    fn test_missing_field_passes_through() {
        let mw = LazyFieldMiddleware::new("body");
        let value = Value::from_iter([("id".to_string(), Value::Int(1))]);

        let out = mw.serialize(value.clone(), &Context::new()).unwrap();
        assert_eq!(out.into_ready(), Some(value));
    }
}
