//! Image encoding: canonical PNG → base64 `ImageData`.
//!
//! VLM APIs accept images as base64 data URIs embedded in the JSON request
//! body; the provider builds the `data:image/png;base64,...` URI from the
//! `ImageData` we hand it. `detail: "high"` keeps fine print (ID numbers,
//! dates) readable for GPT-4-class models.

use crate::pipeline::normalize::CanonicalImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use tracing::debug;

/// MIME type of every canonical image.
pub const CANONICAL_MIME: &str = "image/png";

/// Wrap a canonical image for the VLM request.
pub fn encode_image(img: &CanonicalImage) -> ImageData {
    let b64 = STANDARD.encode(&img.png);
    debug!("Encoded image → {} bytes base64", b64.len());
    ImageData::new(b64, CANONICAL_MIME).with_detail("high")
}
