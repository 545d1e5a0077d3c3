use base64::{Engine as _, engine::general_purpose};

use crate::assets::Asset;

pub fn data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime_type,
        general_purpose::STANDARD.encode(bytes)
    )
}

/// Inline display form of a stored binary; empty when the asset is missing.
pub fn image_data_uri(asset: Option<&Asset>) -> String {
    asset
        .map(|asset| data_uri(&asset.mime_type, &asset.bytes))
        .unwrap_or_default()
}
