use image::RgbImage;
use tracing::debug;

use crate::gallery::image_processing::ProcessingError;

/// Lossy WebP encoding through libwebp.
pub fn encode(image: &RgbImage, quality: f32) -> Result<Vec<u8>, ProcessingError> {
    let (width, height) = image.dimensions();
    let encoded = webp::Encoder::from_rgb(image.as_raw(), width, height).encode(quality);
    debug!("WebP encoded: {}x{}, {} bytes", width, height, encoded.len());
    Ok(encoded.to_vec())
}
