use image::imageops::FilterType;
use tracing::{debug, error};

use super::formats::jpeg;
use super::sanitize::{MAX_IMAGE_DIMENSION, decode, detect_format, image_limits};
use super::types::{ProcessingError, Upload};

/// Scale an upload to `target_width`, keeping its aspect ratio, and re-encode
/// it as JPEG. On any failure the upload is returned as it came in.
pub fn resize_to_width(upload: Upload, target_width: u32, jpeg_quality: u8) -> Upload {
    match try_resize(&upload, target_width, jpeg_quality) {
        Ok(bytes) => {
            debug!(
                "Resized {} to width {} ({} -> {} bytes)",
                upload.file_name,
                target_width,
                upload.bytes.len(),
                bytes.len()
            );
            Upload { bytes, ..upload }
        }
        Err(e) => {
            error!(
                "Failed to resize {} to width {}: {}",
                upload.file_name, target_width, e
            );
            upload
        }
    }
}

fn try_resize(upload: &Upload, target_width: u32, quality: u8) -> Result<Vec<u8>, ProcessingError> {
    if target_width == 0 {
        return Err(ProcessingError::EmptyImage);
    }
    check_target_size(target_width, 1)?;

    let format = detect_format(&upload.bytes, upload.hint())?;
    let image = decode(&upload.bytes, format)?;
    if image.width() == 0 || image.height() == 0 {
        return Err(ProcessingError::EmptyImage);
    }

    let target_height = height_for_width(image.width(), image.height(), target_width);
    check_target_size(target_width, target_height)?;

    let resized = image.resize_exact(target_width, target_height, FilterType::CatmullRom);
    jpeg::encode(&resized.to_rgb8(), quality)
}

/// Height follows the source aspect ratio, rounded, never below one pixel.
/// Saturates at `u32::MAX` rather than wrapping.
fn height_for_width(width: u32, height: u32, target_width: u32) -> u32 {
    let target_height = (height as f64 * target_width as f64 / width as f64).round();
    target_height.clamp(1.0, u32::MAX as f64) as u32
}

/// Refuse targets the decoder would refuse, before any buffer is allocated.
fn check_target_size(width: u32, height: u32) -> Result<(), ProcessingError> {
    let too_large = ProcessingError::TooLarge { width, height };
    if width > MAX_IMAGE_DIMENSION || height > MAX_IMAGE_DIMENSION {
        return Err(too_large);
    }

    // Resampling works on 32-bit float RGBA
    let buffer_bytes = width as u64 * height as u64 * 16;
    if image_limits().max_alloc.is_some_and(|max| buffer_bytes > max) {
        return Err(too_large);
    }
    Ok(())
}
