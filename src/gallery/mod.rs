// Gallery module - galleries, images, their links and the admin/front operations
mod admin;
mod core;
mod error;
mod handlers;
pub mod image_processing;
mod images;
mod memory;
mod paginator;
mod store;
mod types;

// Re-export public items
pub use admin::GalleryAdmin;
pub use self::core::{GalleryManager, gallery_code};
pub use error::GalleryError;
pub use handlers::*;
pub use images::ImageManager;
pub use memory::MemoryStore;
pub use paginator::Paginator;
pub use store::GalleryStore;
pub use types::*;
