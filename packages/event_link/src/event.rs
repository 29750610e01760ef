use bytes::Bytes;
use serde_json::Value;

/// One argument of an emitted event.
///
/// Connections carry JSON values plus out-of-band binary blobs, so an
/// argument is one or the other. Binary payloads use [`Bytes`] so fan-out to
/// several listeners does not copy chunk data.
#[derive(Clone, Debug)]
pub enum EventValue {
    Binary(Bytes),
    Json(Value),
}

impl EventValue {
    /// The binary payload, if this argument is one.
    pub fn as_binary(&self) -> Option<&Bytes> {
        match self {
            EventValue::Binary(bytes) => Some(bytes),
            EventValue::Json(_) => None,
        }
    }

    /// The JSON payload, if this argument is one.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            EventValue::Json(value) => Some(value),
            EventValue::Binary(_) => None,
        }
    }

    /// The string content of a JSON string argument.
    pub fn as_str(&self) -> Option<&str> {
        self.as_json().and_then(Value::as_str)
    }
}

impl From<Bytes> for EventValue {
    fn from(bytes: Bytes) -> Self {
        EventValue::Binary(bytes)
    }
}

impl From<Value> for EventValue {
    fn from(value: Value) -> Self {
        EventValue::Json(value)
    }
}

impl From<&str> for EventValue {
    fn from(s: &str) -> Self {
        EventValue::Json(Value::String(s.to_string()))
    }
}

/// A named event as delivered to listeners.
#[derive(Clone, Debug)]
pub struct Event {
    pub name: String,
    pub args: Vec<EventValue>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn as_str_only_for_json_strings() {
        assert_eq!(EventValue::from("abc").as_str(), Some("abc"));
        assert_eq!(EventValue::Json(json!(42)).as_str(), None);
        assert_eq!(EventValue::Binary(Bytes::from_static(b"abc")).as_str(), None);
    }

    #[test]
    fn as_binary_only_for_binary() {
        let chunk = Bytes::from_static(b"\x00\x01");
        assert_eq!(
            EventValue::Binary(chunk.clone()).as_binary(),
            Some(&chunk)
        );
        assert_eq!(EventValue::from("abc").as_binary(), None);
    }
}
