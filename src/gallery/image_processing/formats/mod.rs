pub mod jpeg;
pub mod png;
pub mod webp;

use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;

use super::types::{EmbeddedMetadata, ProcessingError, SanitizeFormat};

/// Quality used when re-encoding lossy formats during sanitization.
const SANITIZE_QUALITY: u8 = 90;

pub type EncodeFn = fn(&RgbImage) -> Result<Vec<u8>, ProcessingError>;

impl SanitizeFormat {
    /// Encoder for this format, or `None` when it cannot be written.
    pub fn encoder(self) -> Option<EncodeFn> {
        match self {
            SanitizeFormat::Png => Some(png::encode),
            SanitizeFormat::Jpeg => Some(|image| jpeg::encode(image, SANITIZE_QUALITY)),
            SanitizeFormat::WebP => Some(|image| webp::encode(image, SANITIZE_QUALITY as f32)),
            SanitizeFormat::Gif => Some(|image| encode_rgb(image, ImageFormat::Gif)),
            SanitizeFormat::Bmp => Some(|image| encode_rgb(image, ImageFormat::Bmp)),
            SanitizeFormat::Tiff => Some(|image| encode_rgb(image, ImageFormat::Tiff)),
            SanitizeFormat::Tga => Some(|image| encode_rgb(image, ImageFormat::Tga)),
            SanitizeFormat::Pnm => Some(|image| encode_rgb(image, ImageFormat::Pnm)),
            SanitizeFormat::Qoi => Some(|image| encode_rgb(image, ImageFormat::Qoi)),
            SanitizeFormat::Ico => Some(encode_ico),
            SanitizeFormat::Farbfeld => Some(encode_farbfeld),
            SanitizeFormat::Unsupported(_) => None,
        }
    }
}

/// Look for colour profiles and EXIF blocks in the original bytes.
pub fn probe_metadata(bytes: &[u8], format: ImageFormat) -> EmbeddedMetadata {
    match format {
        ImageFormat::Jpeg => EmbeddedMetadata {
            icc_profile_len: jpeg::extract_icc_profile(bytes).map(|p| p.len()),
            has_exif: jpeg::has_exif(bytes),
        },
        ImageFormat::Png => EmbeddedMetadata {
            icc_profile_len: png::extract_icc_profile(bytes).map(|p| p.len()),
            has_exif: png::has_exif(bytes),
        },
        _ => EmbeddedMetadata::default(),
    }
}

fn write_dynamic(image: DynamicImage, format: ImageFormat) -> Result<Vec<u8>, ProcessingError> {
    let mut cursor = Cursor::new(Vec::new());
    image
        .write_to(&mut cursor, format)
        .map_err(ProcessingError::Encode)?;
    Ok(cursor.into_inner())
}

fn encode_rgb(image: &RgbImage, format: ImageFormat) -> Result<Vec<u8>, ProcessingError> {
    write_dynamic(DynamicImage::ImageRgb8(image.clone()), format)
}

// ICO entries are stored as RGBA
fn encode_ico(image: &RgbImage) -> Result<Vec<u8>, ProcessingError> {
    let rgba = DynamicImage::ImageRgb8(image.clone()).to_rgba8();
    write_dynamic(DynamicImage::ImageRgba8(rgba), ImageFormat::Ico)
}

// Farbfeld only carries 16-bit RGBA
fn encode_farbfeld(image: &RgbImage) -> Result<Vec<u8>, ProcessingError> {
    let rgba = DynamicImage::ImageRgb8(image.clone()).to_rgba16();
    write_dynamic(DynamicImage::ImageRgba16(rgba), ImageFormat::Farbfeld)
}
