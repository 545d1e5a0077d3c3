use flate2::read::ZlibDecoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage, codecs::png::PngEncoder};
use std::io::Read;
use tracing::debug;

use crate::gallery::image_processing::ProcessingError;

const SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

pub fn encode(image: &RgbImage) -> Result<Vec<u8>, ProcessingError> {
    let mut output = Vec::new();
    PngEncoder::new(&mut output)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(ProcessingError::Encode)?;
    Ok(output)
}

/// Chunks as `(type, data)`, stopping at IEND or the first malformed chunk.
fn chunks(bytes: &[u8]) -> impl Iterator<Item = (&[u8], &[u8])> {
    let mut pos = if bytes.starts_with(SIGNATURE) {
        SIGNATURE.len()
    } else {
        bytes.len()
    };

    std::iter::from_fn(move || {
        if pos + 12 > bytes.len() {
            return None;
        }
        let length =
            u32::from_be_bytes([bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3]])
                as usize;
        let chunk_type = &bytes[pos + 4..pos + 8];
        let data_end = (pos + 8).checked_add(length)?;
        // Data plus the trailing CRC
        if data_end + 4 > bytes.len() || chunk_type == b"IEND" {
            return None;
        }
        let data = &bytes[pos + 8..data_end];
        pos = data_end + 4;
        Some((chunk_type, data))
    })
}

/// Extract and inflate the ICC profile stored in an iCCP chunk.
pub fn extract_icc_profile(bytes: &[u8]) -> Option<Vec<u8>> {
    let (_, data) = chunks(bytes).find(|(chunk_type, _)| *chunk_type == b"iCCP")?;

    // Profile name, NUL, compression method, deflated profile
    let null_pos = data.iter().position(|&b| b == 0)?;
    if null_pos + 2 >= data.len() || data[null_pos + 1] != 0 {
        return None;
    }

    let mut decoder = ZlibDecoder::new(&data[null_pos + 2..]);
    let mut profile = Vec::new();
    decoder.read_to_end(&mut profile).ok()?;
    debug!("Found ICC profile in PNG: {} bytes (decompressed)", profile.len());
    Some(profile)
}

pub fn has_exif(bytes: &[u8]) -> bool {
    chunks(bytes).any(|(chunk_type, _)| chunk_type == b"eXIf")
}
