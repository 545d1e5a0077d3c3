use crate::Config;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, warn};

const DEFAULT_COOKIE_SECRET: &str = "change-me-in-production";

#[derive(Debug, Error)]
pub enum StartupCheckError {
    #[error("Failed to create directory {path}: {source}")]
    DirectoryCreationFailed {
        path: String,
        source: std::io::Error,
    },

    #[error("Cookie secret must not be empty")]
    EmptyCookieSecret,

    #[error("Invalid setting {0}")]
    InvalidSetting(String),

    #[error("storage.data_file is set but storage.asset_directory is not")]
    UnpersistedAssets,
}

async fn ensure_directory(dir: &Path, label: &str, errors: &mut Vec<StartupCheckError>) {
    if dir.as_os_str().is_empty() || dir.exists() {
        info!("{} directory exists: {:?}", label, dir);
        return;
    }

    info!("{} directory does not exist, creating: {:?}", label, dir);
    if let Err(e) = tokio::fs::create_dir_all(dir).await {
        error!("Failed to create {} directory: {}", label, e);
        errors.push(StartupCheckError::DirectoryCreationFailed {
            path: dir.display().to_string(),
            source: e,
        });
    }
}

pub async fn perform_startup_checks(config: &Config) -> Result<(), Vec<StartupCheckError>> {
    let mut errors = Vec::new();

    info!("Performing startup checks...");

    if let Some(data_file) = &config.storage.data_file
        && let Some(parent) = data_file.parent()
    {
        ensure_directory(parent, "Data", &mut errors).await;
    }

    if let Some(asset_directory) = &config.storage.asset_directory {
        ensure_directory(asset_directory, "Asset", &mut errors).await;
    }

    if config.storage.persists_rows_without_binaries() {
        error!("storage.data_file needs storage.asset_directory, image binaries would be lost");
        errors.push(StartupCheckError::UnpersistedAssets);
    }

    if config.app.cookie_secret.is_empty() {
        error!("app.cookie_secret is empty");
        errors.push(StartupCheckError::EmptyCookieSecret);
    } else if config.app.cookie_secret == DEFAULT_COOKIE_SECRET {
        warn!("app.cookie_secret is still the default value, sessions can be forged");
    }

    if !config.app.user_database.exists() {
        warn!(
            "User database {:?} does not exist, nobody will be able to sign in",
            config.app.user_database
        );
    }

    if !(1..=100).contains(&config.upload.jpeg_quality) {
        error!(
            "upload.jpeg_quality must be between 1 and 100, got {}",
            config.upload.jpeg_quality
        );
        errors.push(StartupCheckError::InvalidSetting(format!(
            "upload.jpeg_quality = {}",
            config.upload.jpeg_quality
        )));
    }

    if config.pagination.admin_items_per_page == 0 || config.pagination.front_items_per_page == 0 {
        warn!("Pagination sizes of 0 are treated as 1");
    }

    if errors.is_empty() {
        info!("All startup checks passed");
        Ok(())
    } else {
        error!("Startup checks failed with {} errors", errors.len());
        Err(errors)
    }
}
