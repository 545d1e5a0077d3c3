use image::{ExtendedColorType, ImageEncoder, ImageFormat, codecs::jpeg::JpegEncoder};

use super::fixtures::{encoded, gradient};
use crate::gallery::image_processing::{
    FormatHint, ProcessingError, sanitize, sanitize_report, sanitize_with_hint,
};

#[test]
fn test_common_formats_pass() {
    for format in [
        ImageFormat::Png,
        ImageFormat::Jpeg,
        ImageFormat::Gif,
        ImageFormat::Bmp,
        ImageFormat::Tiff,
        ImageFormat::Pnm,
        ImageFormat::Qoi,
    ] {
        let bytes = encoded(64, 48, format);
        assert!(sanitize(&bytes), "{:?} should be accepted", format);
    }
}

#[test]
fn test_webp_passes() {
    let image = gradient(40, 30);
    let bytes = webp::Encoder::from_rgb(image.as_raw(), 40, 30)
        .encode(80.0)
        .to_vec();
    let report = sanitize_report(&bytes, FormatHint::default()).unwrap();
    assert_eq!(report.format, ImageFormat::WebP);
    assert_eq!((report.width, report.height), (40, 30));
}

#[test]
fn test_single_pixel_image_passes() {
    assert!(sanitize(&encoded(1, 1, ImageFormat::Png)));
    assert!(sanitize(&encoded(1, 50, ImageFormat::Png)));
}

#[test]
fn test_garbage_fails() {
    assert!(!sanitize(b"definitely not an image"));
    assert!(!sanitize(&[]));

    let hint = FormatHint {
        content_type: Some("image/png"),
        file_name: Some("pretend.png"),
    };
    assert!(!sanitize_with_hint(b"definitely not an image", hint));
}

#[test]
fn test_truncated_png_fails() {
    let bytes = encoded(64, 64, ImageFormat::Png);
    let truncated = &bytes[..bytes.len() / 2];
    assert!(matches!(
        sanitize_report(truncated, FormatHint::default()),
        Err(ProcessingError::Decode(_))
    ));
}

#[test]
fn test_misleading_hint_is_ignored_when_bytes_are_recognised() {
    let bytes = encoded(10, 10, ImageFormat::Png);
    let hint = FormatHint {
        content_type: Some("image/gif"),
        file_name: Some("photo.gif"),
    };
    let report = sanitize_report(&bytes, hint).unwrap();
    assert_eq!(report.format, ImageFormat::Png);
}

#[test]
fn test_tga_needs_the_file_name_hint() {
    let bytes = encoded(12, 8, ImageFormat::Tga);
    let hint = FormatHint {
        content_type: None,
        file_name: Some("sprite.tga"),
    };
    let report = sanitize_report(&bytes, hint).unwrap();
    assert_eq!(report.format, ImageFormat::Tga);
    assert_eq!((report.width, report.height), (12, 8));
}

#[test]
fn test_report_notes_embedded_icc_profile() {
    let image = gradient(16, 16);
    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut bytes, 90);
    encoder.set_icc_profile(vec![7u8; 64]).unwrap();
    encoder
        .write_image(image.as_raw(), 16, 16, ExtendedColorType::Rgb8)
        .unwrap();

    let report = sanitize_report(&bytes, FormatHint::default()).unwrap();
    assert_eq!(report.metadata.icc_profile_len, Some(64));
    assert!(!report.metadata.has_exif);
    assert!(report.encoded_len > 0);
}

#[test]
fn test_plain_png_reports_no_metadata() {
    let report = sanitize_report(&encoded(8, 8, ImageFormat::Png), FormatHint::default()).unwrap();
    assert!(!report.metadata.is_present());
}
