use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use super::store::GalleryStore;
use super::{Gallery, GalleryError, GalleryImageLink, Image, ImageRecord, NewGallery};

/// Persisted image columns. The display payload has no column.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ImageRow {
    id: i32,
    title: String,
    description: String,
    file_id: i32,
    gallery_id: i32,
}

impl From<&ImageRow> for Image {
    fn from(row: &ImageRow) -> Self {
        Image {
            id: row.id,
            title: row.title.clone(),
            description: row.description.clone(),
            file_id: row.file_id,
            gallery_id: row.gallery_id,
            display_payload: String::new(),
        }
    }
}

impl From<&Image> for ImageRow {
    fn from(image: &Image) -> Self {
        ImageRow {
            id: image.id,
            title: image.title.clone(),
            description: image.description.clone(),
            file_id: image.file_id,
            gallery_id: image.gallery_id,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Tables {
    #[serde(default)]
    gallery: BTreeMap<i32, Gallery>,
    #[serde(default)]
    image: BTreeMap<i32, ImageRow>,
    #[serde(default)]
    gallery_image: BTreeMap<i32, GalleryImageLink>,
    #[serde(default)]
    last_gallery_id: i32,
    #[serde(default)]
    last_image_id: i32,
    #[serde(default)]
    last_link_id: i32,
}

impl Tables {
    fn next_link(&mut self, gallery_id: i32, image_id: i32) -> GalleryImageLink {
        self.last_link_id += 1;
        let link = GalleryImageLink {
            id: self.last_link_id,
            gallery_id,
            image_id,
        };
        self.gallery_image.insert(link.id, link);
        link
    }

    fn remove_links_where(&mut self, predicate: impl Fn(&GalleryImageLink) -> bool) -> usize {
        let before = self.gallery_image.len();
        self.gallery_image.retain(|_, link| !predicate(link));
        before - self.gallery_image.len()
    }
}

/// In-process implementation of [`GalleryStore`].
///
/// Tables live behind a single lock, so every method is one critical section.
/// When opened with a snapshot path the tables can be saved to and reloaded
/// from a JSON file.
pub struct MemoryStore {
    tables: RwLock<Tables>,
    snapshot_path: Option<PathBuf>,
    dirty: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            snapshot_path: None,
            dirty: AtomicBool::new(false),
        }
    }

    /// Open a store backed by a snapshot file. A missing file starts empty.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, GalleryError> {
        let path = path.as_ref().to_path_buf();
        let tables = match tokio::fs::read_to_string(&path).await {
            Ok(json) => {
                let tables: Tables = serde_json::from_str(&json)?;
                info!(
                    "Loaded store snapshot from {:?}: {} galleries, {} images, {} links",
                    path,
                    tables.gallery.len(),
                    tables.image.len(),
                    tables.gallery_image.len()
                );
                tables
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No store snapshot at {:?}, starting empty", path);
                Tables::default()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            tables: RwLock::new(tables),
            snapshot_path: Some(path),
            dirty: AtomicBool::new(false),
        })
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Relaxed)
    }

    /// Write the tables to the snapshot file, if one was configured.
    pub async fn save(&self) -> Result<(), GalleryError> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        // Writers mark the store dirty under the write lock, so clearing the
        // flag under the read lock covers exactly the rows serialized here.
        let json = {
            let tables = self.tables.read().await;
            let was_dirty = self.dirty.swap(false, Ordering::Relaxed);
            serde_json::to_string_pretty(&*tables).inspect_err(|_| {
                if was_dirty {
                    self.touch();
                }
            })?
        };

        if let Err(e) = Self::write_snapshot(path, json).await {
            self.touch();
            return Err(e);
        }
        debug!("Store snapshot written to {:?}", path);
        Ok(())
    }

    async fn write_snapshot(path: &Path, json: String) -> Result<(), GalleryError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Save the snapshot every `interval_minutes` while there are unsaved
    /// changes.
    pub fn start_periodic_save(store: Arc<Self>, interval_minutes: u64) {
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(tokio::time::Duration::from_secs(interval_minutes * 60));
            interval.tick().await; // first tick fires immediately

            loop {
                interval.tick().await;

                if store.is_dirty() {
                    debug!("Store is dirty, saving snapshot");
                    if let Err(e) = store.save().await {
                        error!("Failed to save store snapshot: {}", e);
                    } else {
                        info!("Periodic store snapshot completed");
                    }
                }
            }
        });
    }

    fn touch(&self) {
        self.dirty.store(true, Ordering::Relaxed);
    }

    /// Raw link rows of one gallery, duplicates included.
    #[cfg(test)]
    pub(crate) async fn select_links_by_gallery(
        &self,
        gallery_id: i32,
    ) -> Result<Vec<GalleryImageLink>, GalleryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .gallery_image
            .values()
            .filter(|link| link.gallery_id == gallery_id)
            .copied()
            .collect())
    }
}

#[async_trait]
impl GalleryStore for MemoryStore {
    async fn insert_gallery(&self, gallery: NewGallery) -> Result<Gallery, GalleryError> {
        let mut tables = self.tables.write().await;
        tables.last_gallery_id += 1;
        let gallery = Gallery {
            id: tables.last_gallery_id,
            code: String::new(),
            label: gallery.label,
            gallery_type: gallery.gallery_type,
            height: gallery.height,
            width: gallery.width,
            requires_authentication: gallery.requires_authentication,
        };
        tables.gallery.insert(gallery.id, gallery.clone());
        self.touch();
        Ok(gallery)
    }

    async fn update_gallery(&self, gallery: &Gallery) -> Result<(), GalleryError> {
        let mut tables = self.tables.write().await;
        match tables.gallery.get_mut(&gallery.id) {
            Some(row) => {
                *row = gallery.clone();
                self.touch();
                Ok(())
            }
            None => Err(GalleryError::Storage(format!(
                "gallery {} does not exist",
                gallery.id
            ))),
        }
    }

    async fn delete_gallery(&self, id: i32) -> Result<(), GalleryError> {
        let mut tables = self.tables.write().await;
        if tables.gallery.remove(&id).is_some() {
            self.touch();
        }
        Ok(())
    }

    async fn load_gallery(&self, id: i32) -> Result<Option<Gallery>, GalleryError> {
        Ok(self.tables.read().await.gallery.get(&id).cloned())
    }

    async fn load_gallery_by_code(&self, code: &str) -> Result<Option<Gallery>, GalleryError> {
        let tables = self.tables.read().await;
        Ok(tables.gallery.values().find(|g| g.code == code).cloned())
    }

    async fn select_galleries(&self) -> Result<Vec<Gallery>, GalleryError> {
        Ok(self.tables.read().await.gallery.values().cloned().collect())
    }

    async fn insert_image(&self, record: ImageRecord) -> Result<Image, GalleryError> {
        let mut tables = self.tables.write().await;
        tables.last_image_id += 1;
        let row = ImageRow {
            id: tables.last_image_id,
            title: record.title,
            description: record.description,
            file_id: record.file_id,
            gallery_id: record.gallery_id,
        };
        let image = Image::from(&row);
        tables.image.insert(row.id, row);
        self.touch();
        Ok(image)
    }

    async fn update_image(&self, image: &Image) -> Result<(), GalleryError> {
        let mut tables = self.tables.write().await;
        match tables.image.get_mut(&image.id) {
            Some(row) => {
                *row = ImageRow::from(image);
                self.touch();
                Ok(())
            }
            None => Err(GalleryError::Storage(format!(
                "image {} does not exist",
                image.id
            ))),
        }
    }

    async fn delete_image(&self, id: i32) -> Result<(), GalleryError> {
        let mut tables = self.tables.write().await;
        if tables.image.remove(&id).is_some() {
            self.touch();
        }
        Ok(())
    }

    async fn load_image(&self, id: i32) -> Result<Option<Image>, GalleryError> {
        Ok(self.tables.read().await.image.get(&id).map(Image::from))
    }

    async fn select_library_images(&self) -> Result<Vec<Image>, GalleryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .image
            .values()
            .filter(|row| row.gallery_id < 1)
            .map(Image::from)
            .collect())
    }

    async fn select_images_by_ids(&self, ids: &[i32]) -> Result<Vec<Image>, GalleryError> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.image.get(id))
            .map(Image::from)
            .collect())
    }

    async fn select_library_image_ids(&self) -> Result<Vec<i32>, GalleryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .image
            .values()
            .filter(|row| row.gallery_id < 1)
            .map(|row| row.id)
            .collect())
    }

    async fn select_image_ids_by_gallery(&self, gallery_id: i32) -> Result<Vec<i32>, GalleryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .image
            .values()
            .filter(|row| row.gallery_id == gallery_id)
            .map(|row| row.id)
            .collect())
    }

    async fn select_image_ids_linked_to_gallery(
        &self,
        gallery_id: i32,
    ) -> Result<Vec<i32>, GalleryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .gallery_image
            .values()
            .filter(|link| link.gallery_id == gallery_id)
            .filter(|link| tables.image.contains_key(&link.image_id))
            .map(|link| link.image_id)
            .collect())
    }

    async fn select_all_image_ids(&self) -> Result<Vec<i32>, GalleryError> {
        Ok(self.tables.read().await.image.keys().copied().collect())
    }

    async fn replace_link(
        &self,
        gallery_id: i32,
        image_id: i32,
    ) -> Result<GalleryImageLink, GalleryError> {
        let mut tables = self.tables.write().await;
        let removed = tables
            .remove_links_where(|link| link.gallery_id == gallery_id && link.image_id == image_id);
        if removed > 0 {
            debug!(
                "Replacing {} existing link(s) for gallery {} / image {}",
                removed, gallery_id, image_id
            );
        }
        let link = tables.next_link(gallery_id, image_id);
        self.touch();
        Ok(link)
    }

    async fn delete_links_by_gallery(&self, gallery_id: i32) -> Result<usize, GalleryError> {
        let mut tables = self.tables.write().await;
        let removed = tables.remove_links_where(|link| link.gallery_id == gallery_id);
        if removed > 0 {
            self.touch();
        }
        Ok(removed)
    }

    async fn delete_links_by_image(&self, image_id: i32) -> Result<usize, GalleryError> {
        let mut tables = self.tables.write().await;
        let removed = tables.remove_links_where(|link| link.image_id == image_id);
        if removed > 0 {
            self.touch();
        }
        Ok(removed)
    }

    async fn delete_link_by_gallery_and_image(
        &self,
        gallery_id: i32,
        image_id: i32,
    ) -> Result<usize, GalleryError> {
        let mut tables = self.tables.write().await;
        let removed = tables
            .remove_links_where(|link| link.gallery_id == gallery_id && link.image_id == image_id);
        if removed > 0 {
            self.touch();
        }
        Ok(removed)
    }
}
