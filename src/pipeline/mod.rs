//! Pipeline stages for document field extraction.
//!
//! Each submodule implements exactly one transformation step, so each is
//! testable on its own and the orchestrator in [`crate::extract`] stays a
//! straight line.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ normalize ──▶ encode ──▶ llm ──▶ parse ──▶ verify
//! (path/URL)  (RGB PNG)    (base64)   (VLM)   (JSON)    (rules)
//!                │
//!                └─▶ render (pdfium, page 1) when the bytes are not a raster image
//! ```
//!
//! 1. [`input`]: resolve a local path or URL to raw bytes
//! 2. [`normalize`]: sniff the format and produce one canonical RGB PNG;
//!    runs in `spawn_blocking` because decoding is CPU-bound
//! 3. [`render`]: rasterise the first PDF page via pdfium
//! 4. [`encode`]: base64-wrap the PNG for the multimodal request body
//! 5. [`llm`]: one vision chat request; the only stage talking to
//!    the model
//! 6. [`parse`]: locate and repair the JSON object in the completion
//! 7. [`verify`]: per-document-type business rules

pub mod encode;
pub mod input;
pub mod llm;
pub mod normalize;
pub mod parse;
pub mod render;
pub mod verify;
