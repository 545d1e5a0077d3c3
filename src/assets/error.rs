use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Corrupt asset metadata: {0}")]
    MetadataError(#[from] serde_json::Error),

    #[error("Corrupt asset id sequence {0:?}")]
    CorruptSequence(String),
}
