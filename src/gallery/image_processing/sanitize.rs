use image::{DynamicImage, ImageFormat, ImageReader, Limits, imageops::FilterType};
use std::io::Cursor;
use tracing::{debug, error, warn};

use super::formats;
use super::types::{FormatHint, ProcessingError, SanitizeFormat, SanitizeReport};

/// Largest width or height accepted from an upload.
pub(crate) const MAX_IMAGE_DIMENSION: u32 = 16384;

/// Check that `bytes` hold a decodable image by pushing every pixel through a
/// full decode, resample and re-encode cycle.
pub fn sanitize(bytes: &[u8]) -> bool {
    sanitize_with_hint(bytes, FormatHint::default())
}

/// Like [`sanitize`], but falls back to the client-declared content type and
/// file name when the bytes carry no recognisable signature.
pub fn sanitize_with_hint(bytes: &[u8], hint: FormatHint<'_>) -> bool {
    match sanitize_report(bytes, hint) {
        Ok(report) => {
            debug!(
                "Image accepted: {:?} {}x{}, re-encoded to {} bytes",
                report.format, report.width, report.height, report.encoded_len
            );
            true
        }
        Err(e) => {
            error!("Error during image file processing: {}", e);
            false
        }
    }
}

pub fn sanitize_report(
    bytes: &[u8],
    hint: FormatHint<'_>,
) -> Result<SanitizeReport, ProcessingError> {
    let format = detect_format(bytes, hint)?;
    let image = decode(bytes, format)?;
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(ProcessingError::EmptyImage);
    }

    let encode = SanitizeFormat::from(format)
        .encoder()
        .ok_or(ProcessingError::UnsupportedFormat(format))?;
    let encoded = encode(&resample(&image).to_rgb8())?;

    let metadata = formats::probe_metadata(bytes, format);
    if metadata.is_present() {
        warn!(
            "Upload carries metadata that is not validated (ICC profile: {:?} bytes, EXIF: {})",
            metadata.icc_profile_len, metadata.has_exif
        );
    }

    Ok(SanitizeReport {
        format,
        width,
        height,
        encoded_len: encoded.len(),
        metadata,
    })
}

/// Identify the format from magic bytes, then from the declared content type,
/// then from the file-name extension.
pub fn detect_format(bytes: &[u8], hint: FormatHint<'_>) -> Result<ImageFormat, ProcessingError> {
    if let Ok(format) = image::guess_format(bytes) {
        return Ok(format);
    }

    hint.content_type
        .and_then(|content_type| {
            let essence = content_type.split(';').next().unwrap_or_default().trim();
            ImageFormat::from_mime_type(essence)
        })
        .or_else(|| hint.file_name.and_then(|name| ImageFormat::from_path(name).ok()))
        .ok_or(ProcessingError::UnknownFormat)
}

pub(crate) fn decode(bytes: &[u8], format: ImageFormat) -> Result<DynamicImage, ProcessingError> {
    let mut reader = ImageReader::with_format(Cursor::new(bytes), format);
    reader.limits(image_limits());
    reader.decode().map_err(ProcessingError::Decode)
}

/// Decoder limits. Resizing is held to the same bounds.
pub(crate) fn image_limits() -> Limits {
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_IMAGE_DIMENSION);
    limits.max_image_height = Some(MAX_IMAGE_DIMENSION);
    limits
}

/// Shrink by one pixel on each axis and scale back up, so the output shares no
/// pixel data with the input.
fn resample(image: &DynamicImage) -> DynamicImage {
    let (width, height) = (image.width(), image.height());
    let shrunk = image.resize_exact(
        width.saturating_sub(1).max(1),
        height.saturating_sub(1).max(1),
        FilterType::CatmullRom,
    );
    shrunk.resize_exact(width, height, FilterType::CatmullRom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resample_keeps_dimensions() {
        for (w, h) in [(1, 1), (1, 7), (9, 1), (32, 24)] {
            let image = DynamicImage::new_rgb8(w, h);
            let out = resample(&image);
            assert_eq!((out.width(), out.height()), (w, h));
        }
    }

    #[test]
    fn test_magic_bytes_win_over_hint() {
        let png = b"\x89PNG\r\n\x1a\n\0\0\0\0";
        let hint = FormatHint {
            content_type: Some("image/jpeg"),
            file_name: Some("photo.jpg"),
        };
        assert_eq!(detect_format(png, hint).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_hint_order() {
        let bytes = [0u8; 18];
        let both = FormatHint {
            content_type: Some("image/png; charset=binary"),
            file_name: Some("file.tga"),
        };
        assert_eq!(detect_format(&bytes, both).unwrap(), ImageFormat::Png);

        let name_only = FormatHint {
            content_type: Some("application/octet-stream"),
            file_name: Some("file.tga"),
        };
        assert_eq!(detect_format(&bytes, name_only).unwrap(), ImageFormat::Tga);

        assert!(matches!(
            detect_format(&bytes, FormatHint::default()),
            Err(ProcessingError::UnknownFormat)
        ));
    }
}
