//! Error types for the docextract library.
//!
//! Every stage of the pipeline returns `Result<_, ExtractionError>`. The
//! orchestrator ([`crate::extract::Extractor::extract`]) is the only place
//! where an error is turned into data: it becomes a failure
//! [`crate::output::ExtractionRecord`] whose `error_message` is the
//! `Display` text of the variant. Nothing is retried.
//!
//! Variants are grouped by the stage that produces them; [`FailureKind`]
//! exposes that grouping to callers who only care about the class.

use crate::pipeline::normalize::DocumentFormat;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse failure class of an [`ExtractionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Source is neither a file nor a URL, download failed, non-200 status.
    Load,
    /// Bytes could not be turned into an image (neither raster nor PDF).
    Normalization,
    /// Model provider missing, transport error, timeout, empty completion.
    Invocation,
    /// No JSON object in the completion, or malformed after repair.
    Parse,
    /// Business rule rejected the parsed record.
    Verification,
    /// Invalid builder configuration.
    Configuration,
    /// Panic or runtime failure inside the pipeline.
    Internal,
}

/// All errors produced by the extraction pipeline.
#[derive(Debug, Error)]
pub enum ExtractionError {
    // ── Load errors ───────────────────────────────────────────────────────
    /// The input string is not an existing file or an HTTP/HTTPS URL.
    #[error("Unsupported document source '{input}': must be an existing file path or an HTTP/HTTPS URL")]
    UnsupportedSource { input: String },

    /// The local file exists but could not be read.
    #[error("Failed to read '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Network error while downloading.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// Server answered with something other than `200 OK`.
    #[error("Download failed for '{url}': HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    /// The document was loaded but contains no bytes.
    #[error("Failed to load document: document is empty")]
    EmptyDocument,

    // ── Normalisation errors ──────────────────────────────────────────────
    /// Bytes decode neither as a raster image nor as a PDF.
    #[error("Image conversion failed ({format} input): {detail}")]
    NormalizationFailed {
        format: DocumentFormat,
        detail: String,
    },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium on the library path."
    )]
    PdfiumBindingFailed(String),

    // ── Invocation errors ─────────────────────────────────────────────────
    /// No model provider could be resolved (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured. {hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The provider returned an error or the transport failed.
    #[error("LLM API error: {message}")]
    InvocationFailed { message: String },

    /// The model call exceeded `api_timeout_secs`.
    #[error("LLM call timed out after {secs}s")]
    InvocationTimeout { secs: u64 },

    /// The provider answered with an empty completion.
    #[error("LLM returned an empty completion")]
    EmptyCompletion,

    // ── Parse errors ──────────────────────────────────────────────────────
    /// The completion contains no `{ ... }` span.
    #[error("No JSON object found in model output for '{document_type}'")]
    NoJsonObject { document_type: String },

    /// The `{ ... }` span is not a JSON object even after repair.
    #[error("Malformed JSON in model output for '{document_type}': {detail}")]
    MalformedJson {
        document_type: String,
        detail: String,
    },

    // ── Verification errors ───────────────────────────────────────────────
    /// A business rule rejected the parsed record.
    #[error("Verification failed for '{document_type}': {reason}")]
    VerificationFailed {
        document_type: String,
        reason: String,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (task panic, runtime creation, ...).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExtractionError {
    /// The failure class this error belongs to.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::UnsupportedSource { .. }
            | Self::FileRead { .. }
            | Self::DownloadFailed { .. }
            | Self::DownloadTimeout { .. }
            | Self::HttpStatus { .. }
            | Self::EmptyDocument => FailureKind::Load,
            Self::NormalizationFailed { .. } | Self::PdfiumBindingFailed(_) => {
                FailureKind::Normalization
            }
            Self::ProviderNotConfigured { .. }
            | Self::InvocationFailed { .. }
            | Self::InvocationTimeout { .. }
            | Self::EmptyCompletion => FailureKind::Invocation,
            Self::NoJsonObject { .. } | Self::MalformedJson { .. } => FailureKind::Parse,
            Self::VerificationFailed { .. } => FailureKind::Verification,
            Self::InvalidConfig(_) => FailureKind::Configuration,
            Self::Internal(_) => FailureKind::Internal,
        }
    }

    pub(crate) fn rejected(document_type: &str, reason: impl Into<String>) -> Self {
        Self::VerificationFailed {
            document_type: document_type.to_string(),
            reason: reason.into(),
        }
    }
}
