use std::sync::Arc;
use tracing::{debug, info, warn};

use super::image_processing::{self, Upload};
use super::store::GalleryStore;
use super::{GalleryError, Image, ImageChanges, ImageRecord, NewImage, ResizeRequest};
use crate::assets::{AssetStore, NewAsset};

/// Image records plus the binaries behind them.
#[derive(Clone)]
pub struct ImageManager {
    store: Arc<dyn GalleryStore>,
    assets: Arc<dyn AssetStore>,
    jpeg_quality: u8,
}

impl ImageManager {
    pub fn new(store: Arc<dyn GalleryStore>, assets: Arc<dyn AssetStore>, jpeg_quality: u8) -> Self {
        Self {
            store,
            assets,
            jpeg_quality,
        }
    }

    /// Store a new image. The upload must pass sanitization; when `resize`
    /// asks for it the stored binary is a width-constrained JPEG.
    pub async fn create(
        &self,
        image: NewImage,
        upload: Option<Upload>,
        resize: ResizeRequest,
    ) -> Result<Image, GalleryError> {
        let upload = upload
            .filter(|upload| !upload.is_empty())
            .ok_or_else(|| GalleryError::InvalidInput("an image file is required".to_string()))?;

        let file_id = self.store_upload(upload, resize).await?;
        let record = ImageRecord {
            title: image.title,
            description: image.description,
            file_id,
            gallery_id: image.gallery_id,
        };

        match self.store.insert_image(record).await {
            Ok(created) => {
                info!("Created image {} (asset {})", created.id, file_id);
                Ok(created)
            }
            Err(e) => {
                self.discard_asset(file_id).await;
                Err(e)
            }
        }
    }

    /// Apply metadata changes and, when a non-empty upload is given, swap the
    /// stored binary. The previous binary is only removed once the record
    /// points at the new one.
    pub async fn update(
        &self,
        id: i32,
        changes: ImageChanges,
        upload: Option<Upload>,
        resize: ResizeRequest,
    ) -> Result<Image, GalleryError> {
        let mut image = self.require(id).await?;

        let new_file_id = match upload.filter(|upload| !upload.is_empty()) {
            Some(upload) => Some(self.store_upload(upload, resize).await?),
            None => None,
        };

        let previous_file_id = image.file_id;
        if let Some(title) = changes.title {
            image.title = title;
        }
        if let Some(description) = changes.description {
            image.description = description;
        }
        if let Some(gallery_id) = changes.gallery_id {
            image.gallery_id = gallery_id;
        }
        if let Some(file_id) = new_file_id {
            image.file_id = file_id;
        }

        if let Err(e) = self.store.update_image(&image).await {
            if let Some(file_id) = new_file_id {
                self.discard_asset(file_id).await;
            }
            return Err(e);
        }

        if new_file_id.is_some() {
            self.discard_asset(previous_file_id).await;
        }
        debug!("Updated image {}", id);
        Ok(image)
    }

    /// Remove an image together with its links and its binary.
    pub async fn delete(&self, id: i32) -> Result<Image, GalleryError> {
        let image = self.require(id).await?;
        let unlinked = self.store.delete_links_by_image(id).await?;
        self.assets.delete(image.file_id).await?;
        self.store.delete_image(id).await?;
        info!("Deleted image {} ({} links removed)", id, unlinked);
        Ok(image)
    }

    pub async fn find(&self, id: i32) -> Result<Option<Image>, GalleryError> {
        self.store.load_image(id).await
    }

    pub async fn find_with_binary(&self, id: i32) -> Result<Option<Image>, GalleryError> {
        match self.store.load_image(id).await? {
            Some(mut image) => {
                self.materialize(&mut image).await?;
                Ok(Some(image))
            }
            None => Ok(None),
        }
    }

    /// Images that belong to no gallery.
    pub async fn library_images(&self) -> Result<Vec<Image>, GalleryError> {
        self.store.select_library_images().await
    }

    pub async fn library_images_with_binary(&self) -> Result<Vec<Image>, GalleryError> {
        let mut images = self.library_images().await?;
        self.materialize_all(&mut images).await?;
        Ok(images)
    }

    /// Images for `ids`, in the same order, skipping unknown ids.
    pub async fn images_by_ids(&self, ids: &[i32]) -> Result<Vec<Image>, GalleryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.store.select_images_by_ids(ids).await
    }

    pub async fn images_by_ids_with_binary(&self, ids: &[i32]) -> Result<Vec<Image>, GalleryError> {
        let mut images = self.images_by_ids(ids).await?;
        self.materialize_all(&mut images).await?;
        Ok(images)
    }

    /// Fill `display_payload` with a data URI of the stored binary, or an
    /// empty string when the binary is gone.
    pub async fn materialize(&self, image: &mut Image) -> Result<(), GalleryError> {
        let asset = self.assets.fetch(image.file_id).await?;
        if asset.is_none() {
            warn!("Image {} points at missing asset {}", image.id, image.file_id);
        }
        image.display_payload = image_processing::image_data_uri(asset.as_ref());
        Ok(())
    }

    async fn materialize_all(&self, images: &mut [Image]) -> Result<(), GalleryError> {
        for image in images.iter_mut() {
            self.materialize(image).await?;
        }
        Ok(())
    }

    async fn require(&self, id: i32) -> Result<Image, GalleryError> {
        self.store
            .load_image(id)
            .await?
            .ok_or_else(|| GalleryError::NotFound(format!("image {}", id)))
    }

    /// Sanitize, optionally resize, then write the binary. Returns the asset id.
    async fn store_upload(&self, upload: Upload, resize: ResizeRequest) -> Result<i32, GalleryError> {
        let quality = self.jpeg_quality;
        let prepared = tokio::task::spawn_blocking(move || {
            if !image_processing::sanitize_with_hint(&upload.bytes, upload.hint()) {
                return None;
            }
            let upload = match resize.target_width() {
                Some(width) => image_processing::resize_to_width(upload, width, quality),
                None => upload,
            };
            // Record what the bytes really are, which differs from the
            // declared type after a resize
            let mime_type = image_processing::detect_format(&upload.bytes, upload.hint())
                .map(|format| format.to_mime_type().to_string())
                .ok();
            Some((upload, mime_type))
        })
        .await?;

        let (upload, mime_type) = prepared.ok_or(GalleryError::UnsafeImage)?;
        let file_id = self
            .assets
            .add(NewAsset {
                bytes: upload.bytes,
                mime_type: mime_type.or(upload.content_type),
                file_name: upload.file_name,
            })
            .await?;
        Ok(file_id)
    }

    async fn discard_asset(&self, file_id: i32) {
        if let Err(e) = self.assets.delete(file_id).await {
            warn!("Failed to remove asset {}: {}", file_id, e);
        }
    }
}
