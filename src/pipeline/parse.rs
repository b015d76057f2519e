//! Parsing: locate, repair and decode the JSON object in a model completion.
//!
//! Models wrap their answer in prose or ` ```json ` fences and now and then
//! leave a trailing comma behind. Rather than asking for a retry we take the
//! widest `{ ... }` span (first `{` to last `}`), apply three cheap textual
//! repairs and decode. Yes/no style strings are then turned into booleans so
//! verifiers can rely on `true`/`false`.
//!
//! ## Repairs (applied in order)
//!
//! 1. `,` + whitespace before `}` is dropped
//! 2. `,` + whitespace before `]` is dropped
//! 3. whitespace runs collapse to a single space

use crate::document::DocumentType;
use crate::error::ExtractionError;
use crate::output::ExtractionRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, error, info};

static RE_JSON_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());
static RE_TRAILING_COMMA_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*\}").unwrap());
static RE_TRAILING_COMMA_ARRAY: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*\]").unwrap());
static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Parse a raw completion into an extraction record.
pub fn parse_completion(
    text: &str,
    document_type: &DocumentType,
) -> Result<ExtractionRecord, ExtractionError> {
    debug!("Full extraction text for {}: {}", document_type, text);

    let span = RE_JSON_SPAN
        .find(text)
        .ok_or_else(|| ExtractionError::NoJsonObject {
            document_type: document_type.to_string(),
        })?
        .as_str();

    let repaired = repair_json(span);

    let value: Value = serde_json::from_str(&repaired).map_err(|e| {
        error!("JSON parsing error for {}: {}", document_type, e);
        error!("Problematic JSON string: {}", repaired);
        ExtractionError::MalformedJson {
            document_type: document_type.to_string(),
            detail: e.to_string(),
        }
    })?;

    let mut fields = match value {
        Value::Object(map) => map,
        other => {
            error!("Problematic JSON string: {}", repaired);
            return Err(ExtractionError::MalformedJson {
                document_type: document_type.to_string(),
                detail: format!("expected a JSON object, got {}", json_kind(&other)),
            });
        }
    };

    normalise_flags(&mut fields);
    info!("Parsed {} fields for {}", fields.len(), document_type);

    Ok(ExtractionRecord::from(fields))
}

/// Apply the textual repairs to a candidate JSON span.
fn repair_json(span: &str) -> String {
    let s = RE_TRAILING_COMMA_OBJECT.replace_all(span, "}");
    let s = RE_TRAILING_COMMA_ARRAY.replace_all(&s, "]");
    RE_WHITESPACE.replace_all(&s, " ").into_owned()
}

/// Top-level `"true"`/`"yes"` → `true`, `"false"`/`"no"` → `false`,
/// case-insensitively. Nested values are left alone.
fn normalise_flags(fields: &mut Map<String, Value>) {
    for value in fields.values_mut() {
        let flag = match value {
            Value::String(s) => match s.to_lowercase().as_str() {
                "true" | "yes" => Some(true),
                "false" | "no" => Some(false),
                _ => None,
            },
            _ => None,
        };
        if let Some(flag) = flag {
            *value = Value::Bool(flag);
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
