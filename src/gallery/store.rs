use async_trait::async_trait;

use super::{Gallery, GalleryError, GalleryImageLink, Image, ImageRecord, NewGallery};

/// Persistence port for galleries, images and the links between them.
///
/// Inserts return the record with its generated key. Lookups return `None`
/// for missing rows; deletes of missing rows are not errors.
#[async_trait]
pub trait GalleryStore: Send + Sync {
    async fn insert_gallery(&self, gallery: NewGallery) -> Result<Gallery, GalleryError>;
    async fn update_gallery(&self, gallery: &Gallery) -> Result<(), GalleryError>;
    async fn delete_gallery(&self, id: i32) -> Result<(), GalleryError>;
    async fn load_gallery(&self, id: i32) -> Result<Option<Gallery>, GalleryError>;
    async fn load_gallery_by_code(&self, code: &str) -> Result<Option<Gallery>, GalleryError>;
    async fn select_galleries(&self) -> Result<Vec<Gallery>, GalleryError>;

    async fn insert_image(&self, record: ImageRecord) -> Result<Image, GalleryError>;
    async fn update_image(&self, image: &Image) -> Result<(), GalleryError>;
    async fn delete_image(&self, id: i32) -> Result<(), GalleryError>;
    async fn load_image(&self, id: i32) -> Result<Option<Image>, GalleryError>;
    /// Images without a direct owning gallery.
    async fn select_library_images(&self) -> Result<Vec<Image>, GalleryError>;
    /// Images for `ids`, in the order given. Unknown ids are skipped.
    async fn select_images_by_ids(&self, ids: &[i32]) -> Result<Vec<Image>, GalleryError>;
    async fn select_library_image_ids(&self) -> Result<Vec<i32>, GalleryError>;
    async fn select_image_ids_by_gallery(&self, gallery_id: i32) -> Result<Vec<i32>, GalleryError>;
    /// Ids of existing images joined through the link table, in link order.
    async fn select_image_ids_linked_to_gallery(
        &self,
        gallery_id: i32,
    ) -> Result<Vec<i32>, GalleryError>;
    async fn select_all_image_ids(&self) -> Result<Vec<i32>, GalleryError>;

    /// Removes every (gallery, image) row then inserts a fresh one, atomically.
    async fn replace_link(
        &self,
        gallery_id: i32,
        image_id: i32,
    ) -> Result<GalleryImageLink, GalleryError>;
    async fn delete_links_by_gallery(&self, gallery_id: i32) -> Result<usize, GalleryError>;
    async fn delete_links_by_image(&self, image_id: i32) -> Result<usize, GalleryError>;
    async fn delete_link_by_gallery_and_image(
        &self,
        gallery_id: i32,
        image_id: i32,
    ) -> Result<usize, GalleryError>;
}
