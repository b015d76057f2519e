//! PDF rasterisation: render page 1 of an in-memory PDF via pdfium.
//!
//! Only the first page is ever rendered; identity documents and bills carry
//! the fields the model needs on the front page. Callers must run this on a
//! blocking thread: pdfium is CPU-bound and not async-safe.
//!
//! ## Binding
//!
//! pdfium is a C++ shared library loaded at runtime. Resolution order:
//! `PDFIUM_LIB_PATH`, then the working directory, then the system library
//! path. A missing library is an ordinary error, never a panic.

use crate::config::MAX_RENDERED_PIXELS;
use crate::error::ExtractionError;
use crate::pipeline::normalize::DocumentFormat;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};

/// Bind to a pdfium shared library.
pub fn bind_pdfium() -> Result<Pdfium, ExtractionError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(path) if !path.is_empty() => Pdfium::bind_to_library(PathBuf::from(&path))
            .map_err(|e| ExtractionError::PdfiumBindingFailed(format!("{path}: {e}")))?,
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| ExtractionError::PdfiumBindingFailed(e.to_string()))?,
    };
    Ok(Pdfium::new(bindings))
}

/// Rasterise the first page of `pdf_bytes`, longest edge capped at
/// `max_pixels`.
pub fn render_first_page_blocking(
    pdf_bytes: &[u8],
    max_pixels: u32,
) -> Result<DynamicImage, ExtractionError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium
        .load_pdf_from_byte_slice(pdf_bytes, None)
        .map_err(|e| ExtractionError::NormalizationFailed {
            format: DocumentFormat::detect(pdf_bytes),
            detail: format!("not a readable PDF: {e:?}"),
        })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages (rendering page 1)", total_pages);

    if total_pages == 0 {
        return Err(ExtractionError::NormalizationFailed {
            format: DocumentFormat::Pdf,
            detail: "PDF to image conversion produced no pages".into(),
        });
    }

    let edge = i32::try_from(max_pixels.min(MAX_RENDERED_PIXELS)).unwrap_or(i32::MAX);
    let render_config = PdfRenderConfig::new()
        .set_target_width(edge)
        .set_maximum_height(edge);

    let page = pages
        .get(0)
        .map_err(|e| ExtractionError::NormalizationFailed {
            format: DocumentFormat::Pdf,
            detail: format!("page 1 unavailable: {e:?}"),
        })?;

    let bitmap = page.render_with_config(&render_config).map_err(|e| {
        ExtractionError::NormalizationFailed {
            format: DocumentFormat::Pdf,
            detail: format!("rasterisation of page 1 failed: {e:?}"),
        }
    })?;

    let image = bitmap.as_image();
    debug!("Rendered page 1 → {}x{} px", image.width(), image.height());

    Ok(image)
}
