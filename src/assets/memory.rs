use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{Asset, AssetError, AssetStore, NewAsset, resolve_mime_type};

#[derive(Default)]
struct Inner {
    assets: HashMap<i32, Asset>,
    last_id: i32,
}

/// Assets kept in process memory; contents are lost on shutdown.
#[derive(Default)]
pub struct MemoryAssetStore {
    inner: RwLock<Inner>,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.assets.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl AssetStore for MemoryAssetStore {
    async fn add(&self, asset: NewAsset) -> Result<i32, AssetError> {
        let mut inner = self.inner.write().await;
        inner.last_id += 1;
        let id = inner.last_id;
        let mime_type = resolve_mime_type(asset.mime_type.as_deref(), &asset.file_name);
        inner.assets.insert(
            id,
            Asset {
                id,
                bytes: asset.bytes,
                mime_type,
                file_name: asset.file_name,
                created_at: chrono::Utc::now(),
            },
        );
        Ok(id)
    }

    async fn fetch(&self, id: i32) -> Result<Option<Asset>, AssetError> {
        Ok(self.inner.read().await.assets.get(&id).cloned())
    }

    async fn delete(&self, id: i32) -> Result<bool, AssetError> {
        Ok(self.inner.write().await.assets.remove(&id).is_some())
    }
}
