use image::{GenericImageView, ImageFormat};

use super::fixtures::{encoded, upload};
use crate::gallery::image_processing::resize_to_width;
use crate::gallery::image_processing::sanitize::MAX_IMAGE_DIMENSION;

#[test]
fn test_resize_keeps_aspect_ratio_and_outputs_jpeg() {
    let original = upload(encoded(400, 200, ImageFormat::Png), "wide.png", Some("image/png"));
    let resized = resize_to_width(original.clone(), 100, 85);

    assert_eq!(image::guess_format(&resized.bytes).unwrap(), ImageFormat::Jpeg);
    let decoded = image::load_from_memory(&resized.bytes).unwrap();
    assert_eq!(decoded.dimensions(), (100, 50));

    assert_eq!(resized.field_name, original.field_name);
    assert_eq!(resized.file_name, original.file_name);
    assert_eq!(resized.content_type, original.content_type);
}

#[test]
fn test_height_is_rounded() {
    let original = upload(encoded(300, 100, ImageFormat::Png), "a.png", None);
    let resized = resize_to_width(original, 200, 85);
    let decoded = image::load_from_memory(&resized.bytes).unwrap();
    // 100 * 200 / 300 = 66.67
    assert_eq!(decoded.dimensions(), (200, 67));
}

#[test]
fn test_height_never_drops_below_one() {
    let original = upload(encoded(1000, 2, ImageFormat::Png), "strip.png", None);
    let resized = resize_to_width(original, 10, 85);
    let decoded = image::load_from_memory(&resized.bytes).unwrap();
    assert_eq!(decoded.dimensions(), (10, 1));
}

#[test]
fn test_upscaling_is_allowed() {
    let original = upload(encoded(10, 20, ImageFormat::Bmp), "small.bmp", None);
    let resized = resize_to_width(original, 50, 85);
    let decoded = image::load_from_memory(&resized.bytes).unwrap();
    assert_eq!(decoded.dimensions(), (50, 100));
}

#[test]
fn test_zero_width_returns_original() {
    let original = upload(encoded(40, 40, ImageFormat::Png), "a.png", None);
    let resized = resize_to_width(original.clone(), 0, 85);
    assert_eq!(resized, original);
}

#[test]
fn test_undecodable_input_returns_original() {
    let original = upload(b"not an image".to_vec(), "a.jpg", Some("image/jpeg"));
    let resized = resize_to_width(original.clone(), 100, 85);
    assert_eq!(resized, original);
}

#[test]
fn test_absurd_width_returns_original() {
    let original = upload(encoded(10, 10, ImageFormat::Png), "a.png", None);
    let resized = resize_to_width(original.clone(), u32::MAX, 85);
    assert_eq!(resized, original);
}

#[test]
fn test_width_over_decoder_limit_returns_original() {
    let original = upload(encoded(10, 10, ImageFormat::Png), "a.png", None);
    let resized = resize_to_width(original.clone(), MAX_IMAGE_DIMENSION + 1, 85);
    assert_eq!(resized, original);
}

#[test]
fn test_derived_height_over_limit_returns_original() {
    // 1000 * 200 / 10 = 20000 rows
    let original = upload(encoded(10, 1000, ImageFormat::Png), "tall.png", None);
    let resized = resize_to_width(original.clone(), 200, 85);
    assert_eq!(resized, original);
}

#[test]
fn test_target_over_allocation_budget_returns_original() {
    // Within the per-axis limit but far beyond the decoder's memory budget
    let original = upload(encoded(10, 10, ImageFormat::Png), "a.png", None);
    let resized = resize_to_width(original.clone(), MAX_IMAGE_DIMENSION, 85);
    assert_eq!(resized, original);
}
