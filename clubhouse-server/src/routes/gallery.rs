//! Photo gallery albums and photos.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
};
use serde::Deserialize;
use uuid::Uuid;

use clubhouse_core::error::ClubError;
use clubhouse_core::gallery::{GalleryAlbum, GalleryPhoto, PhotoDraft};

use crate::routes::{
    AppError,
    auth::{CurrentUser, RequireAdmin},
};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/gallery/albums", get(list_albums).post(create_album))
        .route("/gallery/albums/{id}", delete(remove_album))
        .route(
            "/gallery/albums/{id}/photos",
            get(list_photos).post(add_photo),
        )
        .route("/gallery/photos/{id}", delete(remove_photo))
}

async fn list_albums(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<GalleryAlbum>>, AppError> {
    Ok(Json(state.gallery.albums().await?))
}

#[derive(Deserialize)]
struct NewAlbum {
    name: String,
}

async fn create_album(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Json(body): Json<NewAlbum>,
) -> Result<(StatusCode, Json<GalleryAlbum>), AppError> {
    if body.name.trim().is_empty() {
        return Err(ClubError::Validation("album name must not be empty".to_string()).into());
    }
    let album = state.gallery.create_album(body.name.trim()).await?;
    Ok((StatusCode::CREATED, Json(album)))
}

async fn remove_album(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .gallery
        .album(id)
        .await?
        .ok_or_else(|| ClubError::AlbumNotFound(id.to_string()))?;
    state.gallery.delete_album(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_photos(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<GalleryPhoto>>, AppError> {
    state
        .gallery
        .album(id)
        .await?
        .ok_or_else(|| ClubError::AlbumNotFound(id.to_string()))?;
    Ok(Json(state.gallery.photos(id).await?))
}

async fn add_photo(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(mut draft): Json<PhotoDraft>,
) -> Result<(StatusCode, Json<GalleryPhoto>), AppError> {
    if draft.url.trim().is_empty() {
        return Err(ClubError::Validation("photo url must not be empty".to_string()).into());
    }
    // Uploads are attributed to the requester, whatever the body claims.
    draft.uploaded_by = Some(user.0);
    let photo = state.gallery.add_photo(id, &draft).await?;
    Ok((StatusCode::CREATED, Json(photo)))
}

async fn remove_photo(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.gallery.delete_photo(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
