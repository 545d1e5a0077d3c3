use image::{ExtendedColorType, ImageEncoder, RgbImage, codecs::jpeg::JpegEncoder};
use tracing::debug;

use crate::gallery::image_processing::ProcessingError;

const SOI: [u8; 2] = [0xFF, 0xD8];
const SOS: u8 = 0xDA;
const APP1: u8 = 0xE1;
const APP2: u8 = 0xE2;
const ICC_IDENTIFIER: &[u8] = b"ICC_PROFILE\0";
const EXIF_IDENTIFIER: &[u8] = b"Exif\0\0";

/// Encode an RGB buffer as a baseline JPEG.
pub fn encode(image: &RgbImage, quality: u8) -> Result<Vec<u8>, ProcessingError> {
    let mut output = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut output, quality);
    encoder
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(ProcessingError::Encode)?;
    Ok(output)
}

/// Header segments up to the start of scan, as `(marker, payload)`.
fn segments(bytes: &[u8]) -> impl Iterator<Item = (u8, &[u8])> {
    let mut pos = if bytes.starts_with(&SOI) {
        2
    } else {
        bytes.len()
    };

    std::iter::from_fn(move || {
        // Fill bytes may precede a marker
        while pos < bytes.len() && bytes[pos] == 0xFF && bytes.get(pos + 1) == Some(&0xFF) {
            pos += 1;
        }
        if pos + 4 > bytes.len() || bytes[pos] != 0xFF {
            return None;
        }
        let marker = bytes[pos + 1];
        if marker == SOS {
            return None;
        }
        let length = u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]) as usize;
        if length < 2 || pos + 2 + length > bytes.len() {
            return None;
        }
        let payload = &bytes[pos + 4..pos + 2 + length];
        pos += 2 + length;
        Some((marker, payload))
    })
}

/// Extract the ICC profile from a JPEG, joining multi-segment profiles in
/// sequence order.
pub fn extract_icc_profile(bytes: &[u8]) -> Option<Vec<u8>> {
    let mut chunks: Vec<(u8, &[u8])> = segments(bytes)
        .filter(|(marker, _)| *marker == APP2)
        .filter_map(|(_, payload)| {
            let rest = payload.strip_prefix(ICC_IDENTIFIER)?;
            // Sequence number and chunk count precede the data
            if rest.len() < 2 {
                return None;
            }
            Some((rest[0], &rest[2..]))
        })
        .collect();

    if chunks.is_empty() {
        return None;
    }

    chunks.sort_by_key(|(sequence, _)| *sequence);
    let profile: Vec<u8> = chunks
        .into_iter()
        .flat_map(|(_, data)| data.iter().copied())
        .collect();

    if profile.is_empty() {
        None
    } else {
        debug!("Found ICC profile in JPEG: {} bytes", profile.len());
        Some(profile)
    }
}

pub fn has_exif(bytes: &[u8]) -> bool {
    segments(bytes).any(|(marker, payload)| marker == APP1 && payload.starts_with(EXIF_IDENTIFIER))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(marker: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = vec![0xFF, marker];
        out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    fn icc_segment(sequence: u8, count: u8, data: &[u8]) -> Vec<u8> {
        let mut payload = ICC_IDENTIFIER.to_vec();
        payload.push(sequence);
        payload.push(count);
        payload.extend_from_slice(data);
        segment(APP2, &payload)
    }

    #[test]
    fn test_multi_segment_profile_is_joined_in_order() {
        let mut bytes = SOI.to_vec();
        bytes.extend(icc_segment(2, 2, b"world"));
        bytes.extend(icc_segment(1, 2, b"hello "));
        bytes.extend(segment(SOS, &[0, 0, 0]));

        assert_eq!(extract_icc_profile(&bytes).unwrap(), b"hello world");
    }

    #[test]
    fn test_exif_detection() {
        let mut bytes = SOI.to_vec();
        bytes.extend(segment(APP1, b"Exif\0\0MM\0*"));
        assert!(has_exif(&bytes));
        assert!(extract_icc_profile(&bytes).is_none());
    }

    #[test]
    fn test_truncated_and_foreign_input() {
        assert!(extract_icc_profile(&[]).is_none());
        assert!(extract_icc_profile(&[0xFF]).is_none());
        assert!(!has_exif(b"\x89PNG\r\n\x1a\n"));

        let mut truncated = SOI.to_vec();
        truncated.extend_from_slice(&[0xFF, APP2, 0x40, 0x00, b'I']);
        assert!(extract_icc_profile(&truncated).is_none());
    }

    #[test]
    fn test_encode_roundtrip_dimensions() {
        let image = RgbImage::from_pixel(20, 10, image::Rgb([200, 10, 10]));
        let bytes = encode(&image, 85).unwrap();
        assert!(bytes.starts_with(&SOI));
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (20, 10));
    }
}
