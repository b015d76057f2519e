//! Extraction entry points: the orchestrator that runs every stage in order.
//!
//! ```text
//! Loading → Normalizing → PromptSelection → Invoking → Parsing → Verifying → Finalizing
//! ```
//!
//! Each stage returns `Result`; the first `Err` short-circuits the rest via
//! `?`. [`Extractor::extract`] is the boundary where errors (and panics)
//! become a failure [`ExtractionRecord`], so callers always get a record
//! back and never an error.
//!
//! Calls share nothing but the immutable [`ExtractionConfig`]; running many
//! extractions concurrently needs no locking. Dropping the returned future
//! cancels any in-flight download or model call.

use crate::config::ExtractionConfig;
use crate::document::DocumentType;
use crate::error::ExtractionError;
use crate::output::{is_truthy, ExtractionRecord};
use crate::pipeline::{encode, input, llm, normalize, parse, verify};
use crate::prompts;
use edgequake_llm::{LLMProvider, OpenAIProvider, ProviderFactory};
use futures::FutureExt;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, Instrument};

/// Document extractor bound to one configuration.
///
/// # Example
/// ```rust,no_run
/// use docextract::{ExtractionConfig, Extractor};
///
/// # #[tokio::main]
/// # async fn main() {
/// let extractor = Extractor::new(ExtractionConfig::default());
/// let record = extractor.extract("scans/pan.jpg", "pan").await;
/// println!("{}", serde_json::to_string_pretty(&record).unwrap());
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    config: ExtractionConfig,
}

impl Extractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    /// Extractor using the given OpenAI API key and default settings.
    pub fn with_api_key(api_key: impl Into<String>) -> Result<Self, ExtractionError> {
        let config = ExtractionConfig::builder().api_key(api_key).build()?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract a document and always return a record.
    ///
    /// On success the record carries the verified fields plus `is_valid`; on
    /// any failure it is the standard failure record (see
    /// [`ExtractionRecord::failure`]) with `document_type` as given.
    pub async fn extract(&self, source: &str, document_type: &str) -> ExtractionRecord {
        let start = Instant::now();
        let ty = DocumentType::parse(document_type);
        let span = info_span!("extract", document_type = %ty);

        let outcome = AssertUnwindSafe(self.try_extract(source, &ty))
            .catch_unwind()
            .instrument(span)
            .await
            .unwrap_or_else(|panic| Err(ExtractionError::Internal(panic_message(&panic))));

        match outcome {
            Ok(record) => {
                info!(
                    "Completed extraction for {} in {:.2} seconds",
                    ty,
                    start.elapsed().as_secs_f64()
                );
                record
            }
            Err(e) => {
                error!(
                    "Extraction failure for {} ({:?}): {}",
                    document_type,
                    e.kind(),
                    e
                );
                ExtractionRecord::failure(document_type, e.to_string())
            }
        }
    }

    /// Run the full pipeline, returning the first error instead of a
    /// failure record.
    pub async fn try_extract(
        &self,
        source: &str,
        document_type: &DocumentType,
    ) -> Result<ExtractionRecord, ExtractionError> {
        info!("Starting extraction: {}", document_type);
        debug!("Input source: {}", source);

        // ── Loading ──────────────────────────────────────────────────────
        let raw = input::load_document(source, &self.config).await?;

        // ── Normalizing ──────────────────────────────────────────────────
        let image = normalize::normalize(raw, self.config.max_rendered_pixels).await?;
        debug!(
            "Canonical image {}x{} ({:?})",
            image.width, image.height, image.origin
        );

        // ── Prompt selection ─────────────────────────────────────────────
        let prompt = prompts::extraction_prompt(document_type);

        // ── Invoking ─────────────────────────────────────────────────────
        let provider = resolve_provider(&self.config)?;
        let completion = llm::invoke_model(
            &provider,
            encode::encode_image(&image),
            document_type,
            &prompt,
            &self.config,
        )
        .await?;

        // ── Parsing → Verifying → Finalizing ─────────────────────────────
        Self::process_completion(&completion, document_type)
    }

    /// Parse, verify and finalise a raw model completion.
    pub fn process_completion(
        completion: &str,
        document_type: &DocumentType,
    ) -> Result<ExtractionRecord, ExtractionError> {
        let parsed = parse::parse_completion(completion, document_type)?;
        let verified = verify::verify(parsed, document_type)?;
        Ok(finalize(verified, document_type))
    }
}

/// Extract with a one-off [`Extractor`].
pub async fn extract(
    source: impl AsRef<str>,
    document_type: impl AsRef<str>,
    config: &ExtractionConfig,
) -> ExtractionRecord {
    Extractor::new(config.clone())
        .extract(source.as_ref(), document_type.as_ref())
        .await
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally; do not call from inside an
/// async context.
pub fn extract_sync(
    source: impl AsRef<str>,
    document_type: impl AsRef<str>,
    config: &ExtractionConfig,
) -> ExtractionRecord {
    match tokio::runtime::Runtime::new() {
        Ok(rt) => rt.block_on(extract(source, document_type, config)),
        Err(e) => ExtractionRecord::failure(
            document_type.as_ref(),
            ExtractionError::Internal(format!("Failed to create tokio runtime: {e}")).to_string(),
        ),
    }
}

/// Make sure the record carries a boolean `is_valid`.
///
/// An existing `is_valid` is kept as is. Otherwise the first truthy value
/// among `valid`, `is_valid_<type>` and `valid_document` (in that order)
/// decides: strings count only when they read `yes`/`true`, other values by
/// truthiness. No truthy candidate means `false`.
pub fn finalize(mut record: ExtractionRecord, document_type: &DocumentType) -> ExtractionRecord {
    if record.contains_key("is_valid") {
        return record;
    }

    let candidates = [
        "valid".to_string(),
        document_type.validity_key(),
        "valid_document".to_string(),
    ];
    let is_valid = candidates
        .iter()
        .filter_map(|key| record.get(key))
        .find(|value| is_truthy(value))
        .map(|value| match value {
            Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "yes" | "true"),
            other => is_truthy(other),
        })
        .unwrap_or(false);

    record.insert("is_valid", is_valid);
    record
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, ExtractionError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ExtractionError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Explicit API key** (`config.api_key`): OpenAI with `config.model`.
/// 3. **Named provider** (`config.provider_name`) via
///    [`ProviderFactory::create_llm_provider`], which reads that provider's
///    key from the environment.
/// 4. **`OPENAI_API_KEY`**: OpenAI with `config.model`.
fn resolve_provider(config: &ExtractionConfig) -> Result<Arc<dyn LLMProvider>, ExtractionError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref key) = config.api_key {
        let provider = OpenAIProvider::new(key.clone()).with_model(config.model.as_str());
        return Ok(Arc::new(provider));
    }

    if let Some(ref name) = config.provider_name {
        return create_vision_provider(name, &config.model);
    }

    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.trim().is_empty() => create_vision_provider("openai", &config.model),
        _ => Err(ExtractionError::ProviderNotConfigured {
            provider: "openai".to_string(),
            hint: "Set OPENAI_API_KEY or pass an API key to the extractor.".to_string(),
        }),
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("extraction panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("extraction panicked: {s}")
    } else {
        "extraction panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn record(value: Value) -> ExtractionRecord {
        match value {
            Value::Object(map) => ExtractionRecord::from(map),
            _ => panic!("fixture must be an object"),
        }
    }

    // ── finalize ────────────────────────────────────────────────────────

    #[test]
    fn hoists_valid_document_yes() {
        let out = finalize(record(json!({"valid_document": "yes"})), &DocumentType::Noc);
        assert_eq!(out.is_valid(), Some(true));
    }

    #[test]
    fn existing_is_valid_wins() {
        let out = finalize(
            record(json!({"is_valid": false, "valid": true})),
            &DocumentType::Pan,
        );
        assert_eq!(out.is_valid(), Some(false));
    }

    #[test]
    fn priority_order_takes_first_truthy() {
        // `valid` is falsy, so the type-specific flag decides.
        let out = finalize(
            record(json!({"valid": false, "is_valid_pan": true, "valid_document": "no"})),
            &DocumentType::Pan,
        );
        assert_eq!(out.is_valid(), Some(true));

        // First truthy is a non-yes string, so the later `true` is ignored.
        let out = finalize(
            record(json!({"valid": "maybe", "valid_document": true})),
            &DocumentType::Pan,
        );
        assert_eq!(out.is_valid(), Some(false));
    }

    #[test]
    fn missing_flags_mean_invalid() {
        let out = finalize(record(json!({"name": "Foo"})), &DocumentType::Pan);
        assert_eq!(out.is_valid(), Some(false));
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn type_specific_flag_uses_lower_case_key() {
        let out = finalize(
            record(json!({"is_valid_driving_license": " TRUE "})),
            &DocumentType::parse("Driving_License"),
        );
        assert_eq!(out.is_valid(), Some(true));
    }

    // ── process_completion ──────────────────────────────────────────────

    #[test]
    fn completion_to_valid_pan_record() {
        let text = "```json\n{\"name\": \"Foo\", \"pan_number\": \"ABCDE1234F\", \"dob\": \"01/01/1990\", \"valid\": \"Yes\",}\n```";
        let rec = Extractor::process_completion(text, &DocumentType::Pan).unwrap();
        assert_eq!(rec.get("valid"), Some(&json!(true)));
        assert_eq!(rec.is_valid(), Some(true));
        assert!(!rec.is_failure());
    }

    #[test]
    fn completion_failing_rules_is_rejected() {
        let text = r#"{"name": "Foo", "pan_number": "ABCDE12345", "dob": "01/01/1990"}"#;
        let err = Extractor::process_completion(text, &DocumentType::Pan).unwrap_err();
        assert_eq!(err.kind(), crate::error::FailureKind::Verification);
    }

    // ── extract ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn unreachable_url_yields_failure_record() {
        let config = ExtractionConfig::builder()
            .download_timeout_secs(5)
            .build()
            .unwrap();
        let rec = extract("http://127.0.0.1:9/pan.png", "pan", &config).await;
        assert!(rec.is_failure());
        assert_eq!(rec.get("document_type"), Some(&json!("pan")));
        assert_eq!(rec.get("clarity_score"), Some(&json!(0.0)));
        assert!(rec.error_message().unwrap().contains("127.0.0.1"));
        assert_eq!(rec.len(), 4);
    }

    #[tokio::test]
    async fn failure_record_keeps_caller_spelling() {
        let rec = Extractor::default().extract("not a source", "PAN").await;
        assert_eq!(rec.get("document_type"), Some(&json!("PAN")));
        assert!(rec.error_message().unwrap().contains("Unsupported document source"));
    }

    #[tokio::test]
    async fn text_file_fails_normalisation() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"just some notes, not a scan").unwrap();
        let path = f.path().to_str().unwrap().to_string();
        let err = Extractor::default()
            .try_extract(&path, &DocumentType::Noc)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::FailureKind::Normalization);
    }

    #[test]
    fn resolve_without_credentials_fails() {
        if std::env::var("OPENAI_API_KEY").is_ok() {
            println!("SKIP: OPENAI_API_KEY is set");
            return;
        }
        let Err(err) = resolve_provider(&ExtractionConfig::default()) else {
            panic!("expected ProviderNotConfigured");
        };
        assert!(matches!(err, ExtractionError::ProviderNotConfigured { .. }));
    }

    #[test]
    fn panic_payloads_are_described() {
        let p: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&p), "extraction panicked: boom");
        let p: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(&p), "extraction panicked: bang");
    }
}
