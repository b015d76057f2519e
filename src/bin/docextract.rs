//! CLI binary for docextract.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig`, runs one extraction and prints the record as JSON.
//! Exits with status 1 when the record is a failure record.

use anyhow::{Context, Result};
use clap::Parser;
use docextract::{ExtractionConfig, Extractor};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"DOCUMENT TYPES:
  aadhar, aadhar_front, aadhar_back, pan, passport, passport_photo,
  address_proof, electricity_bill, signature, driving_license, noc.
  Any other name is extracted with a generic prompt.

EXAMPLES:
  docextract scans/pan.jpg --document-type pan
  docextract "https://drive.google.com/file/d/<id>/view" -t passport --compact
  OPENAI_API_KEY=sk-... docextract bill.pdf -t electricity_bill

PDF RENDERING:
  PDFs are rendered with pdfium. Set PDFIUM_LIB_PATH to the shared library
  if it is neither next to the binary nor installed system-wide.
"#;

/// Extract verified fields from identity documents using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "docextract",
    version,
    about = "Extract verified fields from identity documents using Vision LLMs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local file path or HTTP/HTTPS URL of the document.
    source: String,

    /// Document type key, e.g. pan, passport, aadhar.
    #[arg(short = 't', long, env = "DOCEXTRACT_DOCUMENT_TYPE")]
    document_type: String,

    /// Vision model ID.
    #[arg(long, env = "DOCEXTRACT_MODEL", default_value = docextract::config::DEFAULT_MODEL)]
    model: String,

    /// LLM provider name: openai, anthropic, gemini, azure, ollama.
    #[arg(long, env = "DOCEXTRACT_PROVIDER")]
    provider: Option<String>,

    /// OpenAI API key.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "DOCEXTRACT_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Max LLM output tokens.
    #[arg(long, env = "DOCEXTRACT_MAX_TOKENS", default_value_t = 300)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "DOCEXTRACT_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Longest side of a rendered PDF page, in pixels.
    #[arg(long, env = "DOCEXTRACT_MAX_PIXELS", default_value_t = 2000)]
    max_pixels: u32,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "DOCEXTRACT_DOWNLOAD_TIMEOUT", default_value_t = 30)]
    download_timeout: u64,

    /// LLM call timeout in seconds.
    #[arg(long, env = "DOCEXTRACT_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Append logs to this file.
    #[arg(long, env = "DOCEXTRACT_LOG_FILE", default_value = "document_extraction.log")]
    log_file: PathBuf,

    /// Log to stderr instead of the log file.
    #[arg(long)]
    log_stderr: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCEXTRACT_VERBOSE")]
    verbose: bool,

    /// Print the record on a single line.
    #[arg(long)]
    compact: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(true)
        .with_line_number(true);

    if cli.log_stderr {
        subscriber.with_writer(std::io::stderr).init();
    } else {
        let file = open_log_file(&cli.log_file)?;
        subscriber
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }

    // ── Config ───────────────────────────────────────────────────────────
    let mut builder = ExtractionConfig::builder()
        .model(cli.model)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .max_rendered_pixels(cli.max_pixels)
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout);

    // A named provider reads its own key from the environment; the OpenAI
    // key only applies when no provider was named.
    match (cli.provider, cli.api_key) {
        (Some(name), _) => builder = builder.provider_name(name),
        (None, Some(key)) if !key.trim().is_empty() => builder = builder.api_key(key),
        _ => {}
    }

    if let Some(path) = &cli.system_prompt {
        let prompt = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read system prompt from {}", path.display()))?;
        builder = builder.system_prompt(prompt);
    }

    let config = builder.build().context("Invalid configuration")?;

    // ── Extraction ───────────────────────────────────────────────────────
    let record = Extractor::new(config)
        .extract(&cli.source, &cli.document_type)
        .await;

    let json = if cli.compact {
        serde_json::to_string(&record)
    } else {
        serde_json::to_string_pretty(&record)
    }
    .context("Failed to serialize extraction record")?;
    println!("{json}");

    Ok(if record.is_failure() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn open_log_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}
