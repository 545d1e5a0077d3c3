#![allow(dead_code)]

use axum::http::{HeaderName, HeaderValue, header};
use axum_test::TestServer;
use galleryimage::{
    AppState, Config,
    api::create_signed_cookie,
    assets::MemoryAssetStore,
    create_app,
    gallery::MemoryStore,
    login::{User, UserDatabase},
    rbac::{Grant, ResourceType, WILDCARD},
};
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use std::io::Cursor;
use std::sync::Arc;

pub const SECRET: &str = "integration-test-secret";

/// `admin` holds every permission, `viewer` may only view images and
/// `curator` may manage the images of gallery 1.
pub fn test_users() -> UserDatabase {
    let mut users = UserDatabase::new();

    let mut admin = User::new("hunter2").unwrap();
    admin.grants = vec![
        Grant::new(ResourceType::Gallery, WILDCARD, WILDCARD),
        Grant::new(ResourceType::Image, WILDCARD, WILDCARD),
    ];
    users.add_user("admin".to_string(), admin);

    let mut viewer = User::new("viewer").unwrap();
    viewer.grants = vec![Grant::new(ResourceType::Image, WILDCARD, "VIEW")];
    users.add_user("viewer".to_string(), viewer);

    let mut curator = User::new("curator").unwrap();
    curator.grants = vec![Grant::new(
        ResourceType::Gallery,
        &galleryimage::gallery::gallery_code(1),
        "MANAGE_GALLERY_IMAGE",
    )];
    users.add_user("curator".to_string(), curator);

    users
}

pub fn test_config(front_items_per_page: usize) -> Config {
    let mut config = Config::default();
    config.app.cookie_secret = SECRET.to_string();
    config.storage.data_file = None;
    config.pagination.front_items_per_page = front_items_per_page;
    config
}

pub fn test_server_with(config: Config) -> TestServer {
    let state = AppState::new(
        config,
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryAssetStore::new()),
        test_users(),
    );
    TestServer::new(create_app(state)).unwrap()
}

pub fn test_server() -> TestServer {
    test_server_with(test_config(5))
}

/// Cookie header signed in as `username`.
pub fn session(username: &str) -> (HeaderName, HeaderValue) {
    let signed = create_signed_cookie(SECRET, username).unwrap();
    (
        header::COOKIE,
        HeaderValue::from_str(&format!("auth={}", signed)).unwrap(),
    )
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x * 7) as u8, (y * 13) as u8, 200])
    });
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut cursor, ImageFormat::Png)
        .unwrap();
    cursor.into_inner()
}
