use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{Asset, AssetError, AssetMetadata, AssetStore, NewAsset, resolve_mime_type};

/// Holds the last id handed out, so ids of deleted assets are never reused.
const SEQUENCE_FILE: &str = "sequence";

/// Assets stored on disk as `<id>.bin` with a `<id>.json` metadata sidecar.
pub struct FileAssetStore {
    directory: PathBuf,
    last_id: Mutex<i32>,
}

impl FileAssetStore {
    /// Open (creating if needed) an asset directory. Id allocation resumes
    /// after the recorded sequence, or after the highest id on disk if that
    /// is greater.
    pub async fn open(directory: impl AsRef<Path>) -> Result<Self, AssetError> {
        let directory = directory.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&directory).await?;

        let mut last_id = read_sequence(&directory.join(SEQUENCE_FILE)).await?;
        let mut entries = tokio::fs::read_dir(&directory).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "bin")
                && let Some(id) = path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .and_then(|stem| stem.parse::<i32>().ok())
            {
                last_id = last_id.max(id);
            }
        }

        info!(
            "Asset directory {:?} opened, last asset id {}",
            directory, last_id
        );

        Ok(Self {
            directory,
            last_id: Mutex::new(last_id),
        })
    }

    fn data_path(&self, id: i32) -> PathBuf {
        self.directory.join(format!("{}.bin", id))
    }

    fn metadata_path(&self, id: i32) -> PathBuf {
        self.directory.join(format!("{}.json", id))
    }
}

async fn read_sequence(path: &Path) -> Result<i32, AssetError> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents
            .trim()
            .parse()
            .map_err(|_| AssetError::CorruptSequence(contents.trim().to_string())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl AssetStore for FileAssetStore {
    async fn add(&self, asset: NewAsset) -> Result<i32, AssetError> {
        // Held across the writes so two uploads never share an id
        let mut last_id = self.last_id.lock().await;
        let id = *last_id + 1;
        // Sequence is persisted before the blob
        tokio::fs::write(self.directory.join(SEQUENCE_FILE), id.to_string()).await?;
        *last_id = id;

        let metadata = AssetMetadata {
            mime_type: resolve_mime_type(asset.mime_type.as_deref(), &asset.file_name),
            file_name: asset.file_name,
            created_at: chrono::Utc::now(),
        };

        tokio::fs::write(self.data_path(id), &asset.bytes).await?;
        let json = serde_json::to_vec_pretty(&metadata)?;
        if let Err(e) = tokio::fs::write(self.metadata_path(id), json).await {
            if let Err(cleanup) = tokio::fs::remove_file(self.data_path(id)).await {
                warn!("Failed to remove orphaned asset data {}: {}", id, cleanup);
            }
            return Err(e.into());
        }

        debug!("Stored asset {} ({} bytes)", id, asset.bytes.len());
        Ok(id)
    }

    async fn fetch(&self, id: i32) -> Result<Option<Asset>, AssetError> {
        let bytes = match tokio::fs::read(self.data_path(id)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let metadata = match tokio::fs::read(self.metadata_path(id)).await {
            Ok(json) => serde_json::from_slice::<AssetMetadata>(&json)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Asset {} has no metadata sidecar", id);
                AssetMetadata {
                    mime_type: "application/octet-stream".to_string(),
                    file_name: String::new(),
                    created_at: chrono::Utc::now(),
                }
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Some(Asset {
            id,
            bytes,
            mime_type: metadata.mime_type,
            file_name: metadata.file_name,
            created_at: metadata.created_at,
        }))
    }

    async fn delete(&self, id: i32) -> Result<bool, AssetError> {
        let removed = match tokio::fs::remove_file(self.data_path(id)).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };
        match tokio::fs::remove_file(self.metadata_path(id)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(removed)
    }
}
