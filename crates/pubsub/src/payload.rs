use bytes::Bytes;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors decoding a wire payload.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Payload bytes are not valid UTF-8 JSON.
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload parsed, but the top level is not an object.
    #[error("payload top level is {0}, expected an object")]
    NotAnObject(&'static str),
}

/// Errors encoding a payload for the wire.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Serialization failed.
    #[error("payload could not be serialized: {0}")]
    Json(#[from] serde_json::Error),
}

/// A structured event payload: a field-name to value mapping with unique
/// keys, serialized on the wire as a UTF-8 JSON object.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventPayload(Map<String, Value>);

impl EventPayload {
    /// Creates an empty payload.
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Inserts a field, replacing any previous value under the same key.
    pub fn insert<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.0.insert(key.into(), value.into());
    }

    /// Returns the value for a field, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the payload carries no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consumes the payload, returning the underlying map.
    #[must_use]
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for EventPayload {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for EventPayload {
    type Error = DecodeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(DecodeError::NotAnObject(json_type_name(&other))),
        }
    }
}

impl TryFrom<Bytes> for EventPayload {
    type Error = DecodeError;

    fn try_from(bytes: Bytes) -> Result<Self, Self::Error> {
        let value: Value = serde_json::from_slice(&bytes)?;
        Self::try_from(value)
    }
}

impl TryFrom<EventPayload> for Bytes {
    type Error = EncodeError;

    fn try_from(payload: EventPayload) -> Result<Self, Self::Error> {
        Ok(Self::from(serde_json::to_vec(&Value::Object(payload.0))?))
    }
}

const fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn round_trip_is_identity() {
        let payload = EventPayload::new()
            .with("id", 1)
            .with("name", "orders")
            .with("nested", json!({"a": [1, 2, 3]}));

        let bytes = Bytes::try_from(payload.clone()).unwrap();
        let decoded = EventPayload::try_from(bytes).unwrap();

        assert_eq!(decoded, payload);
    }

    #[test]
    fn decode_rejects_invalid_json() {
        let result = EventPayload::try_from(Bytes::from_static(b"{not json"));
        assert!(matches!(result, Err(DecodeError::Json(_))));
    }

    #[test]
    fn decode_rejects_non_object_top_level() {
        let result = EventPayload::try_from(Bytes::from_static(b"[1, 2, 3]"));
        assert!(matches!(result, Err(DecodeError::NotAnObject("an array"))));
    }

    #[test]
    fn insert_keeps_keys_unique() {
        let mut payload = EventPayload::new().with("id", 1);
        payload.insert("id", 2);

        assert_eq!(payload.len(), 1);
        assert_eq!(payload.get("id"), Some(&json!(2)));
    }
}
