//! The value rendered by a log registry.

use std::collections::BTreeMap;
use std::fmt;

/// What a log call carries.
///
/// Payloads take part in registry identity, so two registries with different
/// payloads never share an `Every` rate limit. `Structured` is produced by the
/// tracing bridge from an event message and its fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Payload {
    /// Free text.
    Text(String),
    /// An integer value.
    Integer(i64),
    /// A boolean value.
    Boolean(bool),
    /// A message with named fields, kept sorted by field name.
    Structured {
        message: String,
        fields: BTreeMap<String, String>,
    },
}

impl Payload {
    /// Create a structured payload.
    pub fn structured<I, K, V>(message: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Payload::Structured {
            message: message.into(),
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Text of a `Text` payload or message of a `Structured` one.
    pub fn message(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            Payload::Structured { message, .. } => Some(message),
            _ => None,
        }
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Text(text) => f.write_str(text),
            Payload::Integer(value) => write!(f, "{}", value),
            Payload::Boolean(value) => write!(f, "{}", value),
            Payload::Structured { message, fields } => {
                f.write_str(message)?;
                for (key, value) in fields {
                    write!(f, " {}={}", key, value)?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Payload::Text(value.to_string())
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Payload::Text(value)
    }
}

impl From<i64> for Payload {
    fn from(value: i64) -> Self {
        Payload::Integer(value)
    }
}

impl From<i32> for Payload {
    fn from(value: i32) -> Self {
        Payload::Integer(i64::from(value))
    }
}

impl From<bool> for Payload {
    fn from(value: bool) -> Self {
        Payload::Boolean(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert_eq!(Payload::from("hi"), Payload::Text("hi".into()));
        assert_eq!(Payload::from(String::from("hi")), Payload::Text("hi".into()));
        assert_eq!(Payload::from(3), Payload::Integer(3));
        assert_eq!(Payload::from(true), Payload::Boolean(true));
    }

    #[test]
    fn test_structured_display_sorted() {
        let payload = Payload::structured("request done", [("status", "200"), ("path", "/")]);
        assert_eq!(payload.to_string(), "request done path=/ status=200");
        assert_eq!(payload.message(), Some("request done"));
    }

    #[test]
    fn test_value_equality() {
        assert_eq!(Payload::from("a"), Payload::from("a"));
        assert_ne!(Payload::from("1"), Payload::from(1));
        assert_eq!(Payload::Integer(5).message(), None);
    }
}
