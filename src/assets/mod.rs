// Binary asset storage - the bytes behind each image record
mod error;
mod file;
mod memory;

pub use error::AssetError;
pub use file::FileAssetStore;
pub use memory::MemoryAssetStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored binary with the metadata needed to serve it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub id: i32,
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub file_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAsset {
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
    pub file_name: String,
}

/// Sidecar metadata kept next to each stored binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct AssetMetadata {
    pub mime_type: String,
    pub file_name: String,
    pub created_at: DateTime<Utc>,
}

/// Store of binary assets addressed by an opaque numeric id.
#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn add(&self, asset: NewAsset) -> Result<i32, AssetError>;
    /// `Ok(None)` when nothing is stored under `id`.
    async fn fetch(&self, id: i32) -> Result<Option<Asset>, AssetError>;
    /// Returns whether something was removed.
    async fn delete(&self, id: i32) -> Result<bool, AssetError>;
}

/// Declared content type when it is meaningful, otherwise a guess from the
/// file name.
pub(crate) fn resolve_mime_type(declared: Option<&str>, file_name: &str) -> String {
    match declared.map(str::trim) {
        Some(mime) if !mime.is_empty() && mime != "application/octet-stream" => mime.to_string(),
        _ => mime_guess::from_path(file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    }
}
