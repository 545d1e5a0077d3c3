use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod api;
pub mod assets;
pub mod gallery;
pub mod login;
pub mod rbac;
pub mod startup_checks;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub app: AppConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub name: String,
    pub log_level: String,
    pub cookie_secret: String,
    #[serde(default = "default_user_database")]
    pub user_database: PathBuf,
}

fn default_user_database() -> PathBuf {
    PathBuf::from("users.toml")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// JSON snapshot of the gallery tables. Without one nothing survives a
    /// restart.
    pub data_file: Option<PathBuf>,
    /// Directory for image binaries. Kept in memory when unset, which is only
    /// allowed when `data_file` is unset too.
    pub asset_directory: Option<PathBuf>,
    /// Minutes between snapshot saves of a dirty store. 0 saves on shutdown
    /// only.
    #[serde(default = "default_save_interval")]
    pub save_interval_minutes: u64,
}

fn default_save_interval() -> u64 {
    5
}

impl StorageConfig {
    /// Persisted image rows refer to binaries by id, so they must not outlive
    /// an in-memory asset store.
    pub fn persists_rows_without_binaries(&self) -> bool {
        self.data_file.is_some() && self.asset_directory.is_none()
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_file: Some(PathBuf::from("data/galleryimage.json")),
            asset_directory: Some(PathBuf::from("data/assets")),
            save_interval_minutes: default_save_interval(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadConfig {
    pub jpeg_quality: u8,
    pub max_upload_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 85,
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct PaginationConfig {
    pub admin_items_per_page: usize,
    pub front_items_per_page: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            admin_items_per_page: 5,
            front_items_per_page: 5,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            app: AppConfig {
                name: "Gallery Image".to_string(),
                log_level: "info".to_string(),
                cookie_secret: "change-me-in-production".to_string(),
                user_database: default_user_database(),
            },
            storage: StorageConfig::default(),
            upload: UploadConfig::default(),
            pagination: PaginationConfig::default(),
        }
    }
}

use assets::{AssetStore, FileAssetStore, MemoryAssetStore};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post, put},
};
use gallery::{GalleryAdmin, GalleryError, GalleryManager, GalleryStore, ImageManager, MemoryStore};
use login::UserDatabase;
use rbac::GrantAuthorizer;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub gallery: GalleryAdmin,
    pub users: Arc<UserDatabase>,
    pub config: Config,
}

impl AppState {
    /// Wire the services over the given stores. Grants come from `users`.
    pub fn new(
        config: Config,
        store: Arc<dyn GalleryStore>,
        assets: Arc<dyn AssetStore>,
        users: UserDatabase,
    ) -> Self {
        let authorizer = Arc::new(GrantAuthorizer::from_database(&users));
        let galleries = GalleryManager::new(store.clone());
        let images = ImageManager::new(store, assets, config.upload.jpeg_quality);

        Self {
            gallery: GalleryAdmin::new(galleries, images, authorizer, config.pagination),
            users: Arc::new(users),
            config,
        }
    }
}

/// Open the table store and the asset store described by `config`.
pub async fn open_storage(
    config: &StorageConfig,
) -> Result<(Arc<MemoryStore>, Arc<dyn AssetStore>), GalleryError> {
    if config.persists_rows_without_binaries() {
        return Err(GalleryError::Storage(
            "storage.data_file requires storage.asset_directory".to_string(),
        ));
    }

    let store = match &config.data_file {
        Some(path) => MemoryStore::open(path).await?,
        None => {
            tracing::warn!("No data file configured, gallery data will not be persisted");
            MemoryStore::new()
        }
    };

    let assets: Arc<dyn AssetStore> = match &config.asset_directory {
        Some(directory) => Arc::new(FileAssetStore::open(directory).await?),
        None => {
            tracing::warn!("No asset directory configured, image binaries are kept in memory");
            Arc::new(MemoryAssetStore::new())
        }
    };

    Ok((Arc::new(store), assets))
}

pub fn create_app(app_state: AppState) -> Router {
    let max_upload_bytes = app_state.config.upload.max_upload_bytes;

    Router::new()
        .route(
            "/admin/galleries",
            get(gallery::list_galleries_handler).post(gallery::create_gallery_handler),
        )
        .route(
            "/admin/galleries/select",
            get(gallery::select_galleries_handler),
        )
        .route(
            "/admin/galleries/{id}",
            put(gallery::modify_gallery_handler).delete(gallery::delete_gallery_handler),
        )
        .route(
            "/admin/galleries/{id}/images",
            get(gallery::gallery_images_handler),
        )
        .route(
            "/admin/galleries/{id}/images/{image_id}",
            post(gallery::link_image_handler).delete(gallery::unlink_image_handler),
        )
        .route(
            "/admin/images",
            get(gallery::list_images_handler).post(gallery::create_image_handler),
        )
        .route(
            "/admin/images/{id}",
            get(gallery::get_image_handler)
                .put(gallery::modify_image_handler)
                .delete(gallery::delete_image_handler),
        )
        .route("/gallery/{code}", get(gallery::front_gallery_handler))
        .route("/api/auth", post(api::authenticate_handler))
        .route("/api/logout", post(api::logout_handler))
        .route("/api/verify", get(api::verify_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    let method = request.method();
                    let uri = request.uri();
                    let matched_path = request
                        .extensions()
                        .get::<axum::extract::MatchedPath>()
                        .map(|matched_path| matched_path.as_str());

                    tracing::info_span!(
                        "http_request",
                        method = %method,
                        uri = %uri,
                        matched_path,
                    )
                })
                .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                    let user_agent = request
                        .headers()
                        .get("user-agent")
                        .and_then(|h| h.to_str().ok())
                        .unwrap_or("-");

                    tracing::info!(
                        target: "access_log",
                        method = %request.method(),
                        path = %request.uri().path(),
                        query = ?request.uri().query(),
                        user_agent = %user_agent,
                        "request"
                    );
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::info!(
                            target: "access_log",
                            status = %response.status(),
                            latency_ms = %latency.as_millis(),
                            "response"
                        );
                    },
                ),
        )
        .with_state(app_state)
}
