//! # docextract
//!
//! Extract structured fields from identity and supporting documents (Aadhar,
//! PAN, passport, driving licence, utility bills, ...) using a Vision
//! Language Model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! path / URL
//!  │
//!  ├─ 1. Load       read a local file or download (Google Drive links rewritten)
//!  ├─ 2. Normalize  any image, or page 1 of a PDF, → one RGB PNG (spawn_blocking)
//!  ├─ 3. Prompt     pick the type-specific extraction prompt
//!  ├─ 4. Invoke     one vision chat call with the base64 PNG attached
//!  ├─ 5. Parse      find the JSON object, repair trailing commas, yes/no → bool
//!  ├─ 6. Verify     per-type business rules (PAN format, passport expiry, ...)
//!  └─ 7. Finalize   hoist a boolean `is_valid` into the record
//! ```
//!
//! Any failure along the way produces a failure record instead of an error:
//!
//! ```json
//! {"extraction_status": "failed", "document_type": "pan",
//!  "error_message": "...", "clarity_score": 0.0}
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docextract::{ExtractionConfig, Extractor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider taken from OPENAI_API_KEY unless configured explicitly
//!     let extractor = Extractor::new(ExtractionConfig::default());
//!     let record = extractor.extract("https://example.com/pan.jpg", "pan").await;
//!     if record.is_failure() {
//!         eprintln!("failed: {}", record.error_message().unwrap_or_default());
//!     }
//!     println!("{}", serde_json::to_string_pretty(&record)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docextract` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder};
pub use document::{DocumentType, VerificationRule};
pub use error::{ExtractionError, FailureKind};
pub use extract::{extract, extract_sync, finalize, Extractor};
pub use output::ExtractionRecord;
