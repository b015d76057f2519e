//! Verification: per-document-type business rules on a parsed record.
//!
//! A rule either accepts the record unchanged or rejects it with a reason.
//! Records are never corrected or partially accepted.

use crate::document::{DocumentType, VerificationRule};
use crate::error::ExtractionError;
use crate::output::{is_meaningful, is_truthy, ExtractionRecord};
use chrono::{Local, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

/// Minimum `clarity_score` for photos and signatures.
pub const MIN_CLARITY_SCORE: f64 = 0.7;

/// Date layout of `expiry_date`.
pub const EXPIRY_DATE_FORMAT: &str = "%d/%m/%Y";

static RE_PAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{5}[0-9]{4}[A-Z]$").unwrap());

/// Verify a record against the rule for its document type, using the
/// current local time for expiry checks.
pub fn verify(
    record: ExtractionRecord,
    document_type: &DocumentType,
) -> Result<ExtractionRecord, ExtractionError> {
    verify_at(record, document_type, Local::now().naive_local())
}

/// Verify a record as of `now`.
pub fn verify_at(
    record: ExtractionRecord,
    document_type: &DocumentType,
    now: NaiveDateTime,
) -> Result<ExtractionRecord, ExtractionError> {
    let key = document_type.as_str();
    if record.is_empty() {
        return Err(reject(key, "no fields were extracted"));
    }

    match document_type.verification_rule() {
        VerificationRule::Generic => check_generic(&record, key)?,
        VerificationRule::Aadhar => {
            require_truthy(&record, key, &["name", "aadhar_number", "address"])?
        }
        VerificationRule::Pan => check_pan(&record, key)?,
        VerificationRule::Passport => check_passport(&record, key, now)?,
        VerificationRule::PassportPhoto => check_quality(
            &record,
            key,
            &["is_passport_style", "face_visible"],
            "passport photo does not meet requirements",
        )?,
        VerificationRule::Signature => check_quality(
            &record,
            key,
            &["is_handwritten", "is_complete"],
            "signature does not meet requirements",
        )?,
    }
    Ok(record)
}

fn reject(key: &str, reason: impl Into<String>) -> ExtractionError {
    let err = ExtractionError::rejected(key, reason);
    warn!("{}", err);
    err
}

/// At least half of the values must be meaningful.
fn check_generic(record: &ExtractionRecord, key: &str) -> Result<(), ExtractionError> {
    let meaningful = record.values().filter(|v| is_meaningful(v)).count();
    if meaningful * 2 < record.len() {
        return Err(reject(
            key,
            format!(
                "insufficient meaningful data extracted ({meaningful} of {} fields)",
                record.len()
            ),
        ));
    }
    Ok(())
}

fn require_truthy(
    record: &ExtractionRecord,
    key: &str,
    fields: &[&str],
) -> Result<(), ExtractionError> {
    for field in fields {
        if !record.get(field).is_some_and(is_truthy) {
            return Err(reject(key, format!("missing required field '{field}'")));
        }
    }
    Ok(())
}

fn check_pan(record: &ExtractionRecord, key: &str) -> Result<(), ExtractionError> {
    require_truthy(record, key, &["name", "pan_number", "dob"])?;
    let valid = record
        .get("pan_number")
        .and_then(Value::as_str)
        .is_some_and(|pan| RE_PAN.is_match(pan));
    if !valid {
        return Err(reject(key, "invalid PAN number format"));
    }
    Ok(())
}

fn check_passport(
    record: &ExtractionRecord,
    key: &str,
    now: NaiveDateTime,
) -> Result<(), ExtractionError> {
    require_truthy(record, key, &["name", "passport_number", "dob", "expiry_date"])?;
    let expiry = record
        .get("expiry_date")
        .and_then(Value::as_str)
        .and_then(|s| NaiveDate::parse_from_str(s.trim(), EXPIRY_DATE_FORMAT).ok())
        .ok_or_else(|| reject(key, "invalid passport expiry date"))?;

    // Expiry is compared at midnight, so a passport expiring today is
    // already expired.
    if expiry.and_hms_opt(0, 0, 0).map_or(true, |at| at < now) {
        return Err(reject(key, format!("passport expired on {expiry}")));
    }
    Ok(())
}

/// Shared rule for passport photos and signatures: `clarity_score` plus two
/// boolean checks, all of which must be present.
fn check_quality(
    record: &ExtractionRecord,
    key: &str,
    flags: &[&str; 2],
    failure: &str,
) -> Result<(), ExtractionError> {
    for field in std::iter::once(&"clarity_score").chain(flags.iter()) {
        if !record.contains_key(field) {
            return Err(reject(key, format!("missing required field '{field}'")));
        }
    }

    let clarity = record
        .get("clarity_score")
        .and_then(Value::as_f64)
        .ok_or_else(|| reject(key, "clarity_score is not a number"))?;
    if clarity < MIN_CLARITY_SCORE {
        return Err(reject(
            key,
            format!("clarity too low ({clarity} < {MIN_CLARITY_SCORE})"),
        ));
    }

    if !flags.iter().all(|f| record.get(f).is_some_and(is_truthy)) {
        return Err(reject(key, failure));
    }
    Ok(())
}
