//! Field patches for partial updates.
//!
//! A patch only ever carries fields whose value differs from the type's
//! default. Empty strings, zero numbers, nil identifiers and absent optionals
//! mean "not specified" and never clear a stored value.

use crate::EntityId;
use serde::Serialize;
use serde_json::{Map, Value};

/// Set of `field -> value` assignments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldPatch {
    fields: Map<String, Value>,
}

impl FieldPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, field: &str, value: &str) -> Self {
        if !value.is_empty() {
            self.fields
                .insert(field.to_string(), Value::String(value.to_string()));
        }
        self
    }

    pub fn int(mut self, field: &str, value: i64) -> Self {
        if value != 0 {
            self.fields.insert(field.to_string(), Value::from(value));
        }
        self
    }

    pub fn float(mut self, field: &str, value: f64) -> Self {
        if value != 0.0 {
            if let Some(number) = serde_json::Number::from_f64(value) {
                self.fields.insert(field.to_string(), Value::Number(number));
            }
        }
        self
    }

    pub fn id(mut self, field: &str, value: EntityId) -> Self {
        if !value.is_nil() {
            self.fields
                .insert(field.to_string(), Value::String(value.to_string()));
        }
        self
    }

    /// Add an optional structured value. `None` and values that fail to
    /// serialize are skipped.
    pub fn optional<T: Serialize>(mut self, field: &str, value: Option<&T>) -> Self {
        if let Some(value) = value.and_then(|v| serde_json::to_value(v).ok()) {
            self.fields.insert(field.to_string(), value);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }
}
