//! Field visitor for extracting tracing event values.
//!
//! Collects the `message` field and every other field of a `tracing` event
//! so the bridge can turn them into a structured payload.

use std::collections::BTreeMap;
use std::fmt;
use tracing::field::{Field, Visit};

const MESSAGE_FIELD: &str = "message";

/// A visitor that extracts field values into a BTreeMap.
///
/// All values are converted to strings; `Debug` formatting is used for
/// values without a dedicated `record_*` method.
#[derive(Debug, Default)]
pub(crate) struct FieldVisitor {
    message: Option<String>,
    fields: BTreeMap<String, String>,
}

impl FieldVisitor {
    /// Create a new field visitor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume the visitor and return the message and the other fields.
    pub fn into_parts(self) -> (String, BTreeMap<String, String>) {
        (self.message.unwrap_or_default(), self.fields)
    }

    fn insert(&mut self, field: &Field, value: String) {
        if field.name() == MESSAGE_FIELD {
            self.message = Some(value);
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for FieldVisitor {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, value.to_string());
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, format!("{:?}", value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_visitor() {
        let (message, fields) = FieldVisitor::new().into_parts();
        assert!(message.is_empty());
        assert!(fields.is_empty());
    }
}
