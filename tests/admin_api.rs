mod common;

use axum::http::{HeaderValue, StatusCode, header};
use axum_test::{
    TestServer,
    multipart::{MultipartForm, Part},
};
use common::{png_bytes, session, test_server};
use serde_json::{Value, json};

async fn create_gallery(server: &TestServer, label: &str) -> Value {
    let (name, value) = session("admin");
    let response = server
        .post("/admin/galleries")
        .add_header(name, value)
        .json(&json!({
            "label": label,
            "type": "carousel",
            "height": 300,
            "width": 800,
            "requires_authentication": false
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    response.json::<Value>()
}

fn image_form(title: &str, bytes: Vec<u8>) -> MultipartForm {
    MultipartForm::new()
        .add_text("title", title)
        .add_text("description", "uploaded in a test")
        .add_part(
            "image",
            Part::bytes(bytes).file_name("photo.png").mime_type("image/png"),
        )
}

async fn upload_image(server: &TestServer, title: &str) -> Value {
    let (name, value) = session("admin");
    let response = server
        .post("/admin/images")
        .add_header(name, value)
        .multipart(image_form(title, png_bytes(16, 8)))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    response.json::<Value>()
}

#[tokio::test]
async fn test_login_sets_usable_cookie() {
    let server = test_server();

    let rejected = server
        .post("/api/auth")
        .json(&json!({"username": "admin", "password": "wrong"}))
        .await;
    assert_eq!(rejected.status_code(), StatusCode::UNAUTHORIZED);

    let malformed = server
        .post("/api/auth")
        .json(&json!({"username": "admin:forged", "password": "hunter2"}))
        .await;
    assert_eq!(malformed.status_code(), StatusCode::BAD_REQUEST);

    let response = server
        .post("/api/auth")
        .json(&json!({"username": "admin", "password": "hunter2"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let cookie = response.cookie("auth");

    let verify = server.get("/api/verify").add_cookie(cookie.clone()).await;
    let body = verify.json::<Value>();
    assert_eq!(body["authorized"], true);
    assert_eq!(body["username"], "admin");

    let listed = server.get("/admin/galleries").add_cookie(cookie).await;
    assert_eq!(listed.status_code(), StatusCode::OK);

    let anonymous = server.get("/api/verify").await.json::<Value>();
    assert_eq!(anonymous["authorized"], false);
}

#[tokio::test]
async fn test_tampered_cookie_is_anonymous() {
    let server = test_server();

    let response = server
        .get("/admin/galleries")
        .add_header(
            header::COOKIE,
            HeaderValue::from_static("auth=admin:forged-signature"),
        )
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_gallery_crud() {
    let server = test_server();
    let (name, value) = session("admin");

    let created = create_gallery(&server, "Summer").await;
    assert_eq!(created["id"], 1);
    assert_eq!(
        created["code"],
        "6b86b273ff34fce19d6b804eff5a3f5747ada4eaa22f1d49c01e52ddb7875b4b"
    );

    let select = server
        .get("/admin/galleries/select")
        .add_header(name.clone(), value.clone())
        .await
        .json::<Value>();
    assert_eq!(select[0]["name"], "Summer");
    assert_eq!(select[0]["code"], created["code"]);

    let modified = server
        .put("/admin/galleries/1")
        .add_header(name.clone(), value.clone())
        .json(&json!({"label": "Winter", "type": "grid"}))
        .await;
    assert_eq!(modified.status_code(), StatusCode::OK);
    let modified = modified.json::<Value>();
    assert_eq!(modified["label"], "Winter");
    assert_eq!(modified["code"], created["code"]);

    let invalid = server
        .put("/admin/galleries/1")
        .add_header(name.clone(), value.clone())
        .json(&json!({"label": ""}))
        .await;
    assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);

    let deleted = server
        .delete("/admin/galleries/1")
        .add_header(name.clone(), value.clone())
        .await;
    assert_eq!(deleted.status_code(), StatusCode::NO_CONTENT);

    let missing = server
        .delete("/admin/galleries/1")
        .add_header(name, value)
        .await;
    assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_gallery_permissions() {
    let server = test_server();
    create_gallery(&server, "Summer").await;

    let anonymous = server
        .post("/admin/galleries")
        .json(&json!({"label": "Nope"}))
        .await;
    assert_eq!(anonymous.status_code(), StatusCode::FORBIDDEN);

    let (name, value) = session("viewer");
    let viewer = server
        .delete("/admin/galleries/1")
        .add_header(name, value)
        .await;
    assert_eq!(viewer.status_code(), StatusCode::FORBIDDEN);

    let (name, value) = session("curator");
    let curator = server
        .put("/admin/galleries/1")
        .add_header(name.clone(), value.clone())
        .json(&json!({"label": "Renamed"}))
        .await;
    assert_eq!(curator.status_code(), StatusCode::FORBIDDEN);

    let listing = server
        .get("/admin/galleries/1/images")
        .add_header(name, value)
        .await;
    assert_eq!(listing.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_image_upload_and_retrieval() {
    let server = test_server();
    let (name, value) = session("admin");

    let created = upload_image(&server, "Beach").await;
    assert_eq!(created["title"], "Beach");
    assert_eq!(created["gallery_id"], 0);
    let id = created["id"].as_i64().unwrap();

    let fetched = server
        .get(&format!("/admin/images/{}", id))
        .add_header(name.clone(), value.clone())
        .await;
    assert_eq!(fetched.status_code(), StatusCode::OK);
    let payload = fetched.json::<Value>()["display_payload"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(payload.starts_with("data:image/png;base64,"));

    let (viewer_name, viewer_value) = session("viewer");
    let listed = server
        .get("/admin/images")
        .add_header(viewer_name, viewer_value)
        .await;
    assert_eq!(listed.status_code(), StatusCode::OK);
    assert_eq!(listed.json::<Value>().as_array().unwrap().len(), 1);

    let missing = server
        .get("/admin/images/99")
        .add_header(name, value)
        .await;
    assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_image_upload_rejections() {
    let server = test_server();
    let (name, value) = session("admin");

    let unsafe_upload = server
        .post("/admin/images")
        .add_header(name.clone(), value.clone())
        .multipart(image_form("Evil", b"GIF89a but not really".to_vec()))
        .await;
    assert_eq!(unsafe_upload.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

    let no_file = server
        .post("/admin/images")
        .add_header(name.clone(), value.clone())
        .multipart(MultipartForm::new().add_text("title", "Nothing"))
        .await;
    assert_eq!(no_file.status_code(), StatusCode::BAD_REQUEST);

    let bad_gallery = server
        .post("/admin/images")
        .add_header(name.clone(), value.clone())
        .multipart(image_form("Typo", png_bytes(4, 4)).add_text("idGallery", "abc"))
        .await;
    assert_eq!(bad_gallery.status_code(), StatusCode::BAD_REQUEST);

    let (viewer_name, viewer_value) = session("viewer");
    let viewer = server
        .post("/admin/images")
        .add_header(viewer_name, viewer_value)
        .multipart(image_form("Denied", png_bytes(4, 4)))
        .await;
    assert_eq!(viewer.status_code(), StatusCode::FORBIDDEN);

    let listed = server
        .get("/admin/images")
        .add_header(name, value)
        .await
        .json::<Value>();
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_image_upload_with_resize() {
    let server = test_server();
    let (name, value) = session("admin");

    let created = server
        .post("/admin/images")
        .add_header(name.clone(), value.clone())
        .multipart(
            image_form("Wide", png_bytes(200, 100))
                .add_text("image_width", "50")
                .add_text("image_croppable", "on"),
        )
        .await;
    assert_eq!(created.status_code(), StatusCode::CREATED);
    let id = created.json::<Value>()["id"].as_i64().unwrap();

    let fetched = server
        .get(&format!("/admin/images/{}", id))
        .add_header(name.clone(), value.clone())
        .await
        .json::<Value>();
    assert!(
        fetched["display_payload"]
            .as_str()
            .unwrap()
            .starts_with("data:image/jpeg;base64,")
    );

    let oversized = server
        .post("/admin/images")
        .add_header(name.clone(), value.clone())
        .multipart(
            image_form("Huge", png_bytes(10, 10))
                .add_text("image_width", u32::MAX.to_string())
                .add_text("image_croppable", "on"),
        )
        .await;
    assert_eq!(oversized.status_code(), StatusCode::CREATED);
    let id = oversized.json::<Value>()["id"].as_i64().unwrap();

    let fetched = server
        .get(&format!("/admin/images/{}", id))
        .add_header(name, value)
        .await
        .json::<Value>();
    assert!(
        fetched["display_payload"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,")
    );
}

#[tokio::test]
async fn test_image_modify_and_delete() {
    let server = test_server();
    let (name, value) = session("admin");
    let created = upload_image(&server, "Before").await;
    let id = created["id"].as_i64().unwrap();

    let modified = server
        .put(&format!("/admin/images/{}", id))
        .add_header(name.clone(), value.clone())
        .multipart(MultipartForm::new().add_text("title", "After"))
        .await;
    assert_eq!(modified.status_code(), StatusCode::OK);
    let modified = modified.json::<Value>();
    assert_eq!(modified["title"], "After");
    assert_eq!(modified["file_id"], created["file_id"]);

    let replaced = server
        .put(&format!("/admin/images/{}", id))
        .add_header(name.clone(), value.clone())
        .multipart(image_form("Replaced", png_bytes(10, 10)))
        .await
        .json::<Value>();
    assert_ne!(replaced["file_id"], created["file_id"]);

    let deleted = server
        .delete(&format!("/admin/images/{}", id))
        .add_header(name.clone(), value.clone())
        .await;
    assert_eq!(deleted.status_code(), StatusCode::NO_CONTENT);

    let gone = server
        .delete(&format!("/admin/images/{}", id))
        .add_header(name, value)
        .await;
    assert_eq!(gone.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_link_and_unlink_images() {
    let server = test_server();
    let (name, value) = session("admin");
    create_gallery(&server, "Summer").await;
    let first = upload_image(&server, "One").await["id"].as_i64().unwrap();
    let second = upload_image(&server, "Two").await["id"].as_i64().unwrap();

    for _ in 0..2 {
        let linked = server
            .post(&format!("/admin/galleries/1/images/{}", first))
            .add_header(name.clone(), value.clone())
            .await;
        assert_eq!(linked.status_code(), StatusCode::NO_CONTENT);
    }

    let view = server
        .get("/admin/galleries/1/images")
        .add_header(name.clone(), value.clone())
        .await
        .json::<Value>();
    assert_eq!(view["listImageSelected"].as_array().unwrap().len(), 1);
    assert_eq!(view["listImageSelected"][0]["id"], first);
    assert_eq!(view["listAvailableImage"].as_array().unwrap().len(), 1);
    assert_eq!(view["listAvailableImage"][0]["id"], second);
    assert_eq!(view["paginatorImageSelected"]["totalItems"], 1);

    let missing_image = server
        .post("/admin/galleries/1/images/99")
        .add_header(name.clone(), value.clone())
        .await;
    assert_eq!(missing_image.status_code(), StatusCode::NOT_FOUND);

    let unlinked = server
        .delete(&format!("/admin/galleries/1/images/{}", first))
        .add_header(name.clone(), value.clone())
        .await;
    assert_eq!(unlinked.status_code(), StatusCode::NO_CONTENT);

    let view = server
        .get("/admin/galleries/1/images")
        .add_header(name, value)
        .await
        .json::<Value>();
    assert!(view["listImageSelected"].as_array().unwrap().is_empty());
    assert_eq!(view["listAvailableImage"].as_array().unwrap().len(), 2);
}
