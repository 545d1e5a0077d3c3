use std::sync::Arc;
use tracing::{info, warn};

use super::image_processing::Upload;
use super::paginator::Paginator;
use super::{
    FrontGalleryView, FrontQuery, Gallery, GalleryError, GalleryImagesView, GalleryManager,
    GalleryUpdate, Image, ImageChanges, ImageManager, NewGallery, NewImage, PageSelection,
    ReferenceItem, ResizeRequest,
};
use crate::PaginationConfig;
use crate::rbac::{Authorizer, Permission, Principal, ResourceType, WILDCARD};

/// Access-checked operations behind the admin and front-office routes.
///
/// Lookups run first so a missing record reports `NotFound` whatever the
/// caller's grants; authorization runs before any state change.
#[derive(Clone)]
pub struct GalleryAdmin {
    galleries: GalleryManager,
    images: ImageManager,
    authorizer: Arc<dyn Authorizer>,
    pagination: PaginationConfig,
}

impl GalleryAdmin {
    pub fn new(
        galleries: GalleryManager,
        images: ImageManager,
        authorizer: Arc<dyn Authorizer>,
        pagination: PaginationConfig,
    ) -> Self {
        Self {
            galleries,
            images,
            authorizer,
            pagination,
        }
    }

    pub fn galleries(&self) -> &GalleryManager {
        &self.galleries
    }

    pub fn images(&self) -> &ImageManager {
        &self.images
    }

    fn authorize(
        &self,
        resource_type: ResourceType,
        resource_id: &str,
        permission: Permission,
        principal: &Principal,
    ) -> Result<(), GalleryError> {
        if self
            .authorizer
            .is_authorized(resource_type, resource_id, permission, principal)
        {
            Ok(())
        } else {
            warn!(
                "Access denied: {:?} lacks {} on {}/{}",
                principal.username, permission, resource_type, resource_id
            );
            Err(GalleryError::AccessDenied)
        }
    }

    fn require_signed_in(principal: &Principal) -> Result<(), GalleryError> {
        if principal.is_anonymous() {
            Err(GalleryError::AccessDenied)
        } else {
            Ok(())
        }
    }

    async fn require_gallery(&self, id: i32) -> Result<Gallery, GalleryError> {
        self.galleries
            .find(id)
            .await?
            .ok_or_else(|| GalleryError::NotFound(format!("gallery {}", id)))
    }

    async fn require_image(&self, id: i32) -> Result<Image, GalleryError> {
        self.images
            .find(id)
            .await?
            .ok_or_else(|| GalleryError::NotFound(format!("image {}", id)))
    }

    pub async fn list_galleries(&self, principal: &Principal) -> Result<Vec<Gallery>, GalleryError> {
        Self::require_signed_in(principal)?;
        self.galleries.find_all().await
    }

    pub async fn select_list(&self, principal: &Principal) -> Result<Vec<ReferenceItem>, GalleryError> {
        Self::require_signed_in(principal)?;
        self.galleries.reference_list().await
    }

    pub async fn create_gallery(
        &self,
        principal: &Principal,
        gallery: NewGallery,
    ) -> Result<Gallery, GalleryError> {
        self.authorize(ResourceType::Gallery, WILDCARD, Permission::Create, principal)?;
        self.galleries.create(gallery).await
    }

    pub async fn modify_gallery(
        &self,
        principal: &Principal,
        id: i32,
        changes: GalleryUpdate,
    ) -> Result<Gallery, GalleryError> {
        let gallery = self.require_gallery(id).await?;
        self.authorize(
            ResourceType::Gallery,
            gallery.resource_id(),
            Permission::Modify,
            principal,
        )?;
        self.galleries.update(id, changes).await
    }

    pub async fn delete_gallery(&self, principal: &Principal, id: i32) -> Result<(), GalleryError> {
        let gallery = self.require_gallery(id).await?;
        self.authorize(
            ResourceType::Gallery,
            gallery.resource_id(),
            Permission::Delete,
            principal,
        )?;
        self.galleries.delete(id).await
    }

    /// Linked, available and owned images of a gallery, each paged on its own.
    pub async fn gallery_images(
        &self,
        principal: &Principal,
        id: i32,
        pages: PageSelection,
    ) -> Result<GalleryImagesView, GalleryError> {
        let gallery = self.require_gallery(id).await?;
        self.authorize(
            ResourceType::Gallery,
            gallery.resource_id(),
            Permission::ManageGalleryImage,
            principal,
        )?;

        let per_page = self.pagination.admin_items_per_page;
        let linked = Paginator::new(
            self.galleries.linked_image_ids(id).await?,
            per_page,
            pages.page_linked.unwrap_or(1),
        );
        let available = Paginator::new(
            self.galleries.available_image_ids(id).await?,
            per_page,
            pages.page_available.unwrap_or(1),
        );
        let owned = Paginator::new(
            self.galleries.owned_image_ids(id).await?,
            per_page,
            pages.page_owned.unwrap_or(1),
        );

        Ok(GalleryImagesView {
            id_gallery: id,
            list_image_selected: self.images.images_by_ids_with_binary(linked.page_items()).await?,
            list_available_image: self
                .images
                .images_by_ids_with_binary(available.page_items())
                .await?,
            list_image_of_gallery: self.images.images_by_ids_with_binary(owned.page_items()).await?,
            paginator_image_selected: linked.info(),
            paginator_image: available.info(),
            paginator_image_of_gallery: owned.info(),
            nb_items_per_page: per_page,
        })
    }

    pub async fn add_image_to_gallery(
        &self,
        principal: &Principal,
        gallery_id: i32,
        image_id: i32,
    ) -> Result<(), GalleryError> {
        let gallery = self.require_gallery(gallery_id).await?;
        self.require_image(image_id).await?;
        self.authorize(
            ResourceType::Gallery,
            gallery.resource_id(),
            Permission::ManageGalleryImage,
            principal,
        )?;
        self.galleries.link(gallery_id, image_id).await
    }

    pub async fn remove_image_from_gallery(
        &self,
        principal: &Principal,
        gallery_id: i32,
        image_id: i32,
    ) -> Result<(), GalleryError> {
        let gallery = self.require_gallery(gallery_id).await?;
        self.authorize(
            ResourceType::Gallery,
            gallery.resource_id(),
            Permission::ManageGalleryImage,
            principal,
        )?;
        self.galleries.unlink(gallery_id, image_id).await
    }

    pub async fn list_images(&self, principal: &Principal) -> Result<Vec<Image>, GalleryError> {
        self.authorize(ResourceType::Image, WILDCARD, Permission::View, principal)?;
        self.images.library_images_with_binary().await
    }

    pub async fn get_image(&self, principal: &Principal, id: i32) -> Result<Image, GalleryError> {
        let mut image = self.require_image(id).await?;
        self.authorize(ResourceType::Image, WILDCARD, Permission::View, principal)?;
        self.images.materialize(&mut image).await?;
        Ok(image)
    }

    pub async fn create_image(
        &self,
        principal: &Principal,
        image: NewImage,
        upload: Option<Upload>,
        resize: ResizeRequest,
    ) -> Result<Image, GalleryError> {
        self.authorize(ResourceType::Image, WILDCARD, Permission::Create, principal)?;
        let created = self.images.create(image, upload, resize).await?;
        info!(
            "Image {} uploaded by {:?}",
            created.id, principal.username
        );
        Ok(created)
    }

    pub async fn modify_image(
        &self,
        principal: &Principal,
        id: i32,
        changes: ImageChanges,
        upload: Option<Upload>,
        resize: ResizeRequest,
    ) -> Result<Image, GalleryError> {
        self.require_image(id).await?;
        self.authorize(ResourceType::Image, WILDCARD, Permission::Modify, principal)?;
        self.images.update(id, changes, upload, resize).await
    }

    pub async fn delete_image(&self, principal: &Principal, id: i32) -> Result<Image, GalleryError> {
        self.require_image(id).await?;
        self.authorize(ResourceType::Image, WILDCARD, Permission::Delete, principal)?;
        self.images.delete(id).await
    }

    /// One page of a gallery's linked images for public display.
    pub async fn front_view(
        &self,
        principal: &Principal,
        code: &str,
        query: FrontQuery,
    ) -> Result<FrontGalleryView, GalleryError> {
        let gallery = self
            .galleries
            .find_by_code(code)
            .await?
            .ok_or_else(|| GalleryError::NotFound(format!("gallery {}", code)))?;

        if gallery.requires_authentication {
            self.authorize(ResourceType::Gallery, WILDCARD, Permission::View, principal)?;
        }

        let paginator = Paginator::new(
            self.galleries.linked_image_ids(gallery.id).await?,
            self.pagination.front_items_per_page,
            query.index.unwrap_or(1),
        );
        let index = paginator.page_index();
        let pages_count = paginator.pages_count();

        Ok(FrontGalleryView {
            pages_count,
            index,
            show_previous_btn: index > 1,
            show_next_btn: index < pages_count && pages_count > 1,
            first_page: index < 2,
            list_images: self
                .images
                .images_by_ids_with_binary(paginator.page_items())
                .await?,
            input_name: query.input_name,
            id_file_selected: query.id_file_selected,
            config: gallery,
        })
    }
}
