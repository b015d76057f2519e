//! Image normalisation: arbitrary document bytes → one canonical RGB PNG.
//!
//! The model accepts exactly one image encoding from us, so everything is
//! funnelled into an 8-bit RGB PNG. Raster formats are decoded and
//! re-encoded; anything the image decoder rejects is tried as a PDF, of
//! which only page 1 is rasterised. Text or unknown bytes end in a
//! [`ExtractionError::NormalizationFailed`].
//!
//! The sniffed [`DocumentFormat`] is diagnostic only: decoding is always
//! attempted, whatever the header says.

use crate::error::ExtractionError;
use crate::pipeline::input::RawDocument;
use crate::pipeline::render;
use image::{ColorType, DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use tracing::{debug, error, info, warn};

/// Format inferred from a document's leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentFormat {
    Pdf,
    Png,
    Jpeg,
    Gif,
    Bmp,
    Tiff,
    Unknown,
}

/// Signature table, checked top to bottom.
const SIGNATURES: &[(&[u8], DocumentFormat)] = &[
    (b"%PDF-", DocumentFormat::Pdf),
    (b"\x89PNG\r\n\x1a\n", DocumentFormat::Png),
    (b"\xff\xd8\xff", DocumentFormat::Jpeg),
    (b"GIF87a", DocumentFormat::Gif),
    (b"GIF89a", DocumentFormat::Gif),
    (b"BM", DocumentFormat::Bmp),
    (b"II*\x00", DocumentFormat::Tiff),
    (b"MM\x00*", DocumentFormat::Tiff),
];

impl DocumentFormat {
    /// Sniff the format from the leading bytes.
    pub fn detect(bytes: &[u8]) -> Self {
        SIGNATURES
            .iter()
            .find(|(sig, _)| bytes.starts_with(sig))
            .map(|(_, format)| *format)
            .unwrap_or(Self::Unknown)
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pdf => "PDF",
            Self::Png => "PNG",
            Self::Jpeg => "JPEG",
            Self::Gif => "GIF",
            Self::Bmp => "BMP",
            Self::Tiff => "TIFF",
            Self::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// How a [`CanonicalImage`] was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOrigin {
    /// Decoded raster image, re-encoded.
    Raster(DocumentFormat),
    /// Page 1 of a PDF, rasterised.
    PdfFirstPage,
}

/// Single-frame, 8-bit RGB, PNG-encoded image ready for the model.
#[derive(Debug, Clone)]
pub struct CanonicalImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub origin: ImageOrigin,
}

impl CanonicalImage {
    /// Convert any decoded image to RGB and encode it as PNG.
    pub fn from_image(img: &DynamicImage, origin: ImageOrigin) -> Result<Self, ExtractionError> {
        if img.color() != ColorType::Rgb8 {
            debug!("Converting {:?} image to RGB", img.color());
        }
        let rgb = img.to_rgb8();
        let (width, height) = rgb.dimensions();

        let mut png = Vec::new();
        DynamicImage::ImageRgb8(rgb)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| ExtractionError::NormalizationFailed {
                format: match origin {
                    ImageOrigin::Raster(format) => format,
                    ImageOrigin::PdfFirstPage => DocumentFormat::Pdf,
                },
                detail: format!("PNG encoding failed: {e}"),
            })?;

        Ok(Self {
            png,
            width,
            height,
            origin,
        })
    }
}

/// Normalise a loaded document on the blocking thread pool.
pub async fn normalize(
    raw: RawDocument,
    max_rendered_pixels: u32,
) -> Result<CanonicalImage, ExtractionError> {
    tokio::task::spawn_blocking(move || normalize_blocking(&raw, max_rendered_pixels))
        .await
        .map_err(|e| ExtractionError::Internal(format!("Normalisation task panicked: {e}")))?
}

/// Blocking implementation of [`normalize`].
pub fn normalize_blocking(
    raw: &RawDocument,
    max_rendered_pixels: u32,
) -> Result<CanonicalImage, ExtractionError> {
    info!("Document data length: {} bytes", raw.bytes.len());
    debug!("First 100 bytes: {}", hex_prefix(&raw.bytes, 100));
    info!("Identified file type: {}", raw.format);

    match image::load_from_memory(&raw.bytes) {
        Ok(img) => {
            debug!("Decoded image {}x{}", img.width(), img.height());
            return CanonicalImage::from_image(&img, ImageOrigin::Raster(raw.format));
        }
        Err(e) => warn!("Image decoding failed: {}", e),
    }

    match render::render_first_page_blocking(&raw.bytes, max_rendered_pixels) {
        Ok(page) => CanonicalImage::from_image(&page, ImageOrigin::PdfFirstPage),
        Err(e) => {
            error!("PDF conversion failed: {}", e);
            info!(
                "Decoded text content (first 500 chars): {}",
                text_head(&raw.bytes, 500)
            );
            if raw.format == DocumentFormat::Pdf {
                return Err(e);
            }
            Err(ExtractionError::NormalizationFailed {
                format: raw.format,
                detail: "content is neither a decodable image nor a PDF".into(),
            })
        }
    }
}

/// First `n` characters of the bytes decoded as lossy UTF-8.
fn text_head(bytes: &[u8], n: usize) -> String {
    String::from_utf8_lossy(bytes).chars().take(n).collect()
}

fn hex_prefix(bytes: &[u8], n: usize) -> String {
    bytes.iter().take(n).map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{LumaA, Rgb, RgbImage, Rgba, RgbaImage};

    fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), format)
            .expect("fixture encoding");
        buf
    }

    fn rgb_fixture() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 6, Rgb([200, 30, 30])))
    }

    fn assert_canonical(out: &CanonicalImage, w: u32, h: u32) {
        assert_eq!((out.width, out.height), (w, h));
        assert_eq!(DocumentFormat::detect(&out.png), DocumentFormat::Png);
        let decoded = image::load_from_memory(&out.png).expect("canonical PNG decodes");
        assert_eq!(decoded.color(), ColorType::Rgb8);
    }

    #[test]
    fn detect_signatures() {
        assert_eq!(DocumentFormat::detect(b"%PDF-1.4"), DocumentFormat::Pdf);
        assert_eq!(DocumentFormat::detect(b"\x89PNG\r\n\x1a\n...."), DocumentFormat::Png);
        assert_eq!(DocumentFormat::detect(b"\xff\xd8\xff\xe0"), DocumentFormat::Jpeg);
        assert_eq!(DocumentFormat::detect(b"GIF87a.."), DocumentFormat::Gif);
        assert_eq!(DocumentFormat::detect(b"GIF89a.."), DocumentFormat::Gif);
        assert_eq!(DocumentFormat::detect(b"BM\x00\x00"), DocumentFormat::Bmp);
        assert_eq!(DocumentFormat::detect(b"II*\x00...."), DocumentFormat::Tiff);
        assert_eq!(DocumentFormat::detect(b"hello"), DocumentFormat::Unknown);
        assert_eq!(DocumentFormat::detect(b""), DocumentFormat::Unknown);
    }

    #[test]
    fn every_raster_format_becomes_rgb_png() {
        for format in [
            ImageFormat::Png,
            ImageFormat::Jpeg,
            ImageFormat::Gif,
            ImageFormat::Bmp,
            ImageFormat::Tiff,
        ] {
            let raw = RawDocument::new(encode(&rgb_fixture(), format));
            assert_ne!(raw.format, DocumentFormat::Unknown, "{format:?}");
            let out = normalize_blocking(&raw, 2000)
                .unwrap_or_else(|e| panic!("{format:?} should normalise: {e}"));
            assert_canonical(&out, 8, 6);
            assert_eq!(out.origin, ImageOrigin::Raster(raw.format));
        }
    }

    #[test]
    fn alpha_and_grey_images_are_converted_to_rgb() {
        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 128])));
        let out = normalize_blocking(&RawDocument::new(encode(&rgba, ImageFormat::Png)), 2000)
            .unwrap();
        assert_canonical(&out, 4, 4);

        let grey = DynamicImage::ImageLumaA8(image::ImageBuffer::from_pixel(3, 5, LumaA([90, 255])));
        let out = normalize_blocking(&RawDocument::new(encode(&grey, ImageFormat::Png)), 2000)
            .unwrap();
        assert_canonical(&out, 3, 5);
    }

    #[test]
    fn plain_text_fails_without_panicking() {
        let raw = RawDocument::new(b"Name: Foo\nPAN: ABCDE1234F\n".to_vec());
        assert_eq!(raw.format, DocumentFormat::Unknown);
        let err = normalize_blocking(&raw, 2000).unwrap_err();
        assert!(
            matches!(
                err,
                ExtractionError::NormalizationFailed {
                    format: DocumentFormat::Unknown,
                    ..
                }
            ),
            "got: {err:?}"
        );
    }

    #[test]
    fn truncated_png_fails() {
        let mut bytes = encode(&rgb_fixture(), ImageFormat::Png);
        bytes.truncate(20);
        let raw = RawDocument::new(bytes);
        assert_eq!(raw.format, DocumentFormat::Png);
        assert!(normalize_blocking(&raw, 2000).is_err());
    }

    #[test]
    fn broken_pdf_keeps_the_render_error() {
        let raw = RawDocument::new(b"%PDF-1.7\nnot really a pdf".to_vec());
        assert_eq!(raw.format, DocumentFormat::Pdf);
        let err = normalize_blocking(&raw, 2000).unwrap_err();
        assert_eq!(err.kind(), crate::error::FailureKind::Normalization);
        assert!(!err.to_string().contains("neither a decodable image"), "got: {err}");
    }

    #[test]
    fn text_head_is_bounded_and_lossy() {
        assert_eq!(text_head(b"%PDF-1.7\nbody", 8), "%PDF-1.7");
        assert_eq!(text_head(&[b'a', 0xff, b'b'], 500), "a\u{FFFD}b");
    }

    #[test]
    fn hex_prefix_is_bounded() {
        assert_eq!(hex_prefix(&[0xde, 0xad, 0xbe, 0xef], 2), "dead");
    }

    #[tokio::test]
    async fn async_wrapper_matches_blocking() {
        let raw = RawDocument::new(encode(&rgb_fixture(), ImageFormat::Bmp));
        let out = normalize(raw, 2000).await.unwrap();
        assert_canonical(&out, 8, 6);
    }
}
