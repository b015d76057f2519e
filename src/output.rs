//! Output record of an extraction.
//!
//! The model decides which fields a document yields, so the record is not
//! schema-fixed: it is an insertion-ordered map of JSON values
//! (`serde_json` is built with `preserve_order`). Failure records share the
//! same type and always carry the four fields written by
//! [`ExtractionRecord::failure`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Value of `extraction_status` on a failure record.
pub const STATUS_FAILED: &str = "failed";

/// Sentinel the prompts ask the model to use for unreadable fields.
pub const NOT_EXTRACTED: &str = "Not Extracted";

/// Extracted fields of one document, or a standardised failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractionRecord {
    fields: Map<String, Value>,
}

impl ExtractionRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Standardised failure record.
    pub fn failure(document_type: &str, error_message: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("extraction_status".into(), Value::from(STATUS_FAILED));
        fields.insert("document_type".into(), Value::from(document_type));
        fields.insert("error_message".into(), Value::from(error_message.into()));
        fields.insert("clarity_score".into(), Value::from(0.0));
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.values()
    }

    /// `true` when this is a failure record.
    pub fn is_failure(&self) -> bool {
        self.fields.get("extraction_status").and_then(Value::as_str) == Some(STATUS_FAILED)
    }

    /// The `is_valid` flag, if present and boolean.
    pub fn is_valid(&self) -> Option<bool> {
        self.fields.get("is_valid").and_then(Value::as_bool)
    }

    /// The `error_message` of a failure record.
    pub fn error_message(&self) -> Option<&str> {
        self.fields.get("error_message").and_then(Value::as_str)
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.fields
    }
}

impl From<Map<String, Value>> for ExtractionRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

/// Loose truthiness of a JSON value.
///
/// `null`, `false`, `0`, `""`, `[]` and `{}` are falsy; everything else is
/// truthy. Used for "field is present and non-empty" checks and for the
/// validity-flag fallback.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// A field carries information: truthy and not `"Not Extracted"`.
pub fn is_meaningful(value: &Value) -> bool {
    is_truthy(value) && value.as_str() != Some(NOT_EXTRACTED)
}
