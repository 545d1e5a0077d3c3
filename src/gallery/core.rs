use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use super::store::GalleryStore;
use super::{Gallery, GalleryError, GalleryUpdate, NewGallery, ReferenceItem};

/// Stable external code for a gallery id: lowercase hex SHA-256 of the
/// decimal id.
pub fn gallery_code(id: i32) -> String {
    format!("{:x}", Sha256::digest(id.to_string().as_bytes()))
}

/// Gallery records and their image associations.
#[derive(Clone)]
pub struct GalleryManager {
    store: Arc<dyn GalleryStore>,
}

impl GalleryManager {
    pub fn new(store: Arc<dyn GalleryStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, gallery: NewGallery) -> Result<Gallery, GalleryError> {
        if gallery.label.trim().is_empty() {
            return Err(GalleryError::InvalidInput(
                "gallery label must not be empty".to_string(),
            ));
        }

        // The code depends on the generated id, so it is set in a second write
        let mut created = self.store.insert_gallery(gallery).await?;
        created.code = gallery_code(created.id);
        self.store.update_gallery(&created).await?;

        info!("Created gallery {} ({})", created.id, created.label);
        Ok(created)
    }

    /// Overwrite the editable fields of gallery `id`. The stored code is kept.
    pub async fn update(&self, id: i32, changes: GalleryUpdate) -> Result<Gallery, GalleryError> {
        if id < 1 {
            return Err(GalleryError::InvalidInput(format!(
                "invalid gallery id {}",
                id
            )));
        }
        if changes.label.trim().is_empty() {
            return Err(GalleryError::InvalidInput(
                "gallery label must not be empty".to_string(),
            ));
        }

        let existing = self
            .store
            .load_gallery(id)
            .await?
            .ok_or_else(|| GalleryError::NotFound(format!("gallery {}", id)))?;

        let updated = Gallery {
            id,
            code: existing.code,
            label: changes.label,
            gallery_type: changes.gallery_type,
            height: changes.height,
            width: changes.width,
            requires_authentication: changes.requires_authentication,
        };
        self.store.update_gallery(&updated).await?;
        debug!("Updated gallery {}", id);
        Ok(updated)
    }

    /// Remove a gallery and its links. Images themselves are left in place.
    pub async fn delete(&self, id: i32) -> Result<(), GalleryError> {
        let unlinked = self.unlink_all_for_gallery(id).await?;
        self.store.delete_gallery(id).await?;
        info!("Deleted gallery {} ({} links removed)", id, unlinked);
        Ok(())
    }

    pub async fn find(&self, id: i32) -> Result<Option<Gallery>, GalleryError> {
        self.store.load_gallery(id).await
    }

    pub async fn find_by_code(&self, code: &str) -> Result<Option<Gallery>, GalleryError> {
        self.store.load_gallery_by_code(code).await
    }

    pub async fn find_all(&self) -> Result<Vec<Gallery>, GalleryError> {
        self.store.select_galleries().await
    }

    pub async fn reference_list(&self) -> Result<Vec<ReferenceItem>, GalleryError> {
        Ok(self
            .find_all()
            .await?
            .into_iter()
            .map(|gallery| ReferenceItem {
                code: gallery.code,
                name: gallery.label,
            })
            .collect())
    }

    /// Associate an image with a gallery. Linking twice leaves one link.
    pub async fn link(&self, gallery_id: i32, image_id: i32) -> Result<(), GalleryError> {
        let link = self.store.replace_link(gallery_id, image_id).await?;
        debug!(
            "Linked image {} to gallery {} (link {})",
            image_id, gallery_id, link.id
        );
        Ok(())
    }

    pub async fn unlink(&self, gallery_id: i32, image_id: i32) -> Result<(), GalleryError> {
        let removed = self
            .store
            .delete_link_by_gallery_and_image(gallery_id, image_id)
            .await?;
        debug!(
            "Unlinked image {} from gallery {} ({} removed)",
            image_id, gallery_id, removed
        );
        Ok(())
    }

    pub async fn unlink_all_for_gallery(&self, gallery_id: i32) -> Result<usize, GalleryError> {
        self.store.delete_links_by_gallery(gallery_id).await
    }

    pub async fn unlink_all_for_image(&self, image_id: i32) -> Result<usize, GalleryError> {
        self.store.delete_links_by_image(image_id).await
    }

    /// Ids of images linked to the gallery, in link order.
    pub async fn linked_image_ids(&self, gallery_id: i32) -> Result<Vec<i32>, GalleryError> {
        self.store.select_image_ids_linked_to_gallery(gallery_id).await
    }

    /// Ids of library images (no owning gallery).
    pub async fn library_image_ids(&self) -> Result<Vec<i32>, GalleryError> {
        self.store.select_library_image_ids().await
    }

    /// Library images that are not yet linked to the gallery.
    pub async fn available_image_ids(&self, gallery_id: i32) -> Result<Vec<i32>, GalleryError> {
        let linked: HashSet<i32> = self.linked_image_ids(gallery_id).await?.into_iter().collect();
        Ok(self
            .library_image_ids()
            .await?
            .into_iter()
            .filter(|id| !linked.contains(id))
            .collect())
    }

    /// Ids of images whose owning gallery is `gallery_id`.
    pub async fn owned_image_ids(&self, gallery_id: i32) -> Result<Vec<i32>, GalleryError> {
        self.store.select_image_ids_by_gallery(gallery_id).await
    }

    pub async fn all_image_ids(&self) -> Result<Vec<i32>, GalleryError> {
        self.store.select_all_image_ids().await
    }
}
