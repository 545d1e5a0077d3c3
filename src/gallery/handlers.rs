use super::image_processing::Upload;
use super::{
    FrontGalleryView, FrontQuery, Gallery, GalleryError, GalleryImagesView, GalleryUpdate, Image,
    ImageChanges, NewGallery, NewImage, PageSelection, ReferenceItem, ResizeRequest,
};
use crate::AppState;
use crate::rbac::Principal;
use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;

pub async fn list_galleries_handler(
    State(app_state): State<AppState>,
    principal: Principal,
) -> Result<Json<Vec<Gallery>>, GalleryError> {
    Ok(Json(app_state.gallery.list_galleries(&principal).await?))
}

pub async fn select_galleries_handler(
    State(app_state): State<AppState>,
    principal: Principal,
) -> Result<Json<Vec<ReferenceItem>>, GalleryError> {
    Ok(Json(app_state.gallery.select_list(&principal).await?))
}

pub async fn create_gallery_handler(
    State(app_state): State<AppState>,
    principal: Principal,
    Json(gallery): Json<NewGallery>,
) -> Result<impl IntoResponse, GalleryError> {
    let created = app_state.gallery.create_gallery(&principal, gallery).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn modify_gallery_handler(
    State(app_state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
    Json(changes): Json<GalleryUpdate>,
) -> Result<Json<Gallery>, GalleryError> {
    Ok(Json(
        app_state
            .gallery
            .modify_gallery(&principal, id, changes)
            .await?,
    ))
}

pub async fn delete_gallery_handler(
    State(app_state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
) -> Result<StatusCode, GalleryError> {
    app_state.gallery.delete_gallery(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn gallery_images_handler(
    State(app_state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
    Query(pages): Query<PageSelection>,
) -> Result<Json<GalleryImagesView>, GalleryError> {
    Ok(Json(
        app_state
            .gallery
            .gallery_images(&principal, id, pages)
            .await?,
    ))
}

pub async fn link_image_handler(
    State(app_state): State<AppState>,
    principal: Principal,
    Path((gallery_id, image_id)): Path<(i32, i32)>,
) -> Result<StatusCode, GalleryError> {
    app_state
        .gallery
        .add_image_to_gallery(&principal, gallery_id, image_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unlink_image_handler(
    State(app_state): State<AppState>,
    principal: Principal,
    Path((gallery_id, image_id)): Path<(i32, i32)>,
) -> Result<StatusCode, GalleryError> {
    app_state
        .gallery
        .remove_image_from_gallery(&principal, gallery_id, image_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_images_handler(
    State(app_state): State<AppState>,
    principal: Principal,
) -> Result<Json<Vec<Image>>, GalleryError> {
    Ok(Json(app_state.gallery.list_images(&principal).await?))
}

pub async fn get_image_handler(
    State(app_state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
) -> Result<Json<Image>, GalleryError> {
    Ok(Json(app_state.gallery.get_image(&principal, id).await?))
}

pub async fn create_image_handler(
    State(app_state): State<AppState>,
    principal: Principal,
    multipart: Multipart,
) -> Result<impl IntoResponse, GalleryError> {
    let form = ImageForm::read(multipart).await?;
    let image = NewImage {
        title: form.title.unwrap_or_default(),
        description: form.description.unwrap_or_default(),
        gallery_id: form.gallery_id.unwrap_or(0),
    };
    let created = app_state
        .gallery
        .create_image(&principal, image, form.upload, form.resize)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn modify_image_handler(
    State(app_state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<Json<Image>, GalleryError> {
    let form = ImageForm::read(multipart).await?;
    let changes = ImageChanges {
        title: form.title,
        description: form.description,
        gallery_id: form.gallery_id,
    };
    Ok(Json(
        app_state
            .gallery
            .modify_image(&principal, id, changes, form.upload, form.resize)
            .await?,
    ))
}

pub async fn delete_image_handler(
    State(app_state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
) -> Result<StatusCode, GalleryError> {
    app_state.gallery.delete_image(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn front_gallery_handler(
    State(app_state): State<AppState>,
    principal: Principal,
    Path(code): Path<String>,
    Query(query): Query<FrontQuery>,
) -> Result<Json<FrontGalleryView>, GalleryError> {
    Ok(Json(
        app_state
            .gallery
            .front_view(&principal, &code, query)
            .await?,
    ))
}

/// Fields of the image create/modify form.
#[derive(Debug, Default)]
struct ImageForm {
    title: Option<String>,
    description: Option<String>,
    gallery_id: Option<i32>,
    upload: Option<Upload>,
    resize: ResizeRequest,
}

impl ImageForm {
    async fn read(mut multipart: Multipart) -> Result<Self, GalleryError> {
        let mut form = ImageForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "image" => {
                    let content_type = field.content_type().map(str::to_string);
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    let bytes = field.bytes().await?;
                    debug!("Received upload {:?} ({} bytes)", file_name, bytes.len());
                    form.upload = Some(Upload {
                        field_name: name.clone(),
                        content_type,
                        file_name,
                        bytes: bytes.to_vec(),
                    });
                }
                "title" => form.title = Some(field.text().await?),
                "description" => form.description = Some(field.text().await?),
                "idGallery" => {
                    let value = field.text().await?;
                    let value = value.trim();
                    if !value.is_empty() {
                        form.gallery_id = Some(value.parse().map_err(|_| {
                            GalleryError::InvalidInput(format!("idGallery is not a number: {}", value))
                        })?);
                    }
                }
                // A non-numeric width means "no width", like an absent one
                "image_width" => form.resize.width = field.text().await?.trim().parse().ok(),
                "image_croppable" => form.resize.croppable = field.text().await? == "on",
                other => debug!("Ignoring form field {:?}", other),
            }
        }

        Ok(form)
    }
}
