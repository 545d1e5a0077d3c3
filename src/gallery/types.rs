use serde::{Deserialize, Serialize};

/// A named collection of images with display settings.
///
/// `code` is the stable external reference (and RBAC resource id). It is
/// derived from `id` once, right after the row is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gallery {
    pub id: i32,
    #[serde(default)]
    pub code: String,
    pub label: String,
    #[serde(rename = "type")]
    pub gallery_type: String,
    pub height: i32,
    pub width: i32,
    pub requires_authentication: bool,
}

impl Gallery {
    pub fn resource_id(&self) -> &str {
        &self.code
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewGallery {
    pub label: String,
    #[serde(rename = "type", default)]
    pub gallery_type: String,
    #[serde(default)]
    pub height: i32,
    #[serde(default)]
    pub width: i32,
    #[serde(default)]
    pub requires_authentication: bool,
}

/// Editable gallery fields. The code is never part of an update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GalleryUpdate {
    pub label: String,
    #[serde(rename = "type", default)]
    pub gallery_type: String,
    #[serde(default)]
    pub height: i32,
    #[serde(default)]
    pub width: i32,
    #[serde(default)]
    pub requires_authentication: bool,
}

/// A stored picture record.
///
/// `gallery_id` below 1 marks a library image with no direct owner. The
/// `display_payload` is filled in for views only and never written back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub file_id: i32,
    pub gallery_id: i32,
    #[serde(default, skip_deserializing)]
    pub display_payload: String,
}

impl Image {
    pub fn is_library(&self) -> bool {
        self.gallery_id < 1
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewImage {
    pub title: String,
    pub description: String,
    pub gallery_id: i32,
}

/// Row fields written when inserting an image.
#[derive(Debug, Clone)]
pub struct ImageRecord {
    pub title: String,
    pub description: String,
    pub file_id: i32,
    pub gallery_id: i32,
}

/// Optional width constraint sent with an upload. Only applied when the
/// client also marked the image as croppable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResizeRequest {
    pub croppable: bool,
    pub width: Option<u32>,
}

impl ResizeRequest {
    pub fn target_width(&self) -> Option<u32> {
        self.width.filter(|_| self.croppable)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImageChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub gallery_id: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryImageLink {
    pub id: i32,
    pub gallery_id: i32,
    pub image_id: i32,
}

/// Code/label pair used by selection lists and RBAC resource listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceItem {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page_index: usize,
    pub pages_count: usize,
    pub items_per_page: usize,
    pub total_items: usize,
}

/// Admin model for the "images of a gallery" screen.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryImagesView {
    pub id_gallery: i32,
    pub list_image_selected: Vec<Image>,
    pub list_available_image: Vec<Image>,
    pub list_image_of_gallery: Vec<Image>,
    pub paginator_image_selected: PageInfo,
    pub paginator_image: PageInfo,
    pub paginator_image_of_gallery: PageInfo,
    pub nb_items_per_page: usize,
}

/// Front-office model for one page of a gallery.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontGalleryView {
    pub pages_count: usize,
    pub index: usize,
    pub show_previous_btn: bool,
    pub show_next_btn: bool,
    pub first_page: bool,
    pub list_images: Vec<Image>,
    pub input_name: Option<String>,
    pub id_file_selected: Option<String>,
    pub config: Gallery,
}

/// Page indices for the three independent paginators of the admin view.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageSelection {
    pub page_linked: Option<usize>,
    pub page_available: Option<usize>,
    pub page_owned: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrontQuery {
    pub index: Option<usize>,
    #[serde(rename = "inputName")]
    pub input_name: Option<String>,
    #[serde(rename = "idFileSelected")]
    pub id_file_selected: Option<String>,
}
