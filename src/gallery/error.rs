use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::assets::AssetError;

#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Asset store error: {0}")]
    AssetError(#[from] AssetError),

    #[error("Background task failed: {0}")]
    JoinError(#[from] tokio::task::JoinError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Access denied")]
    AccessDenied,

    #[error("The uploaded file is not a safe image")]
    UnsafeImage,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Malformed form data: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),
}

impl IntoResponse for GalleryError {
    fn into_response(self) -> Response {
        let status = match &self {
            GalleryError::NotFound(_) => StatusCode::NOT_FOUND,
            GalleryError::AccessDenied => StatusCode::FORBIDDEN,
            GalleryError::UnsafeImage => StatusCode::UNPROCESSABLE_ENTITY,
            GalleryError::InvalidInput(_) | GalleryError::Multipart(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match status {
            StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!("Request failed: {}", self);
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        (status, message).into_response()
    }
}
