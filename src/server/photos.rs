use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::header,
    response::Response,
};
use bytes::Bytes;
use tokio_util::io::ReaderStream;
use tracing::error;

use super::dto::{DeleteResponse, ListPhotosParams, PhotoItem, PhotoListResponse, UploadResponse};
use super::response::ApiError;
use super::router::AppState;
use crate::error::Error;
use crate::hub::media;
use crate::types::PhotoOrder;

const CACHE_CONTROL: &str = "public, max-age=86400";
const DEFAULT_UPLOAD_FILENAME: &str = "upload.jpg";

pub async fn list_photos(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListPhotosParams>,
) -> Result<Json<PhotoListResponse>, ApiError> {
    let order = if params.random {
        PhotoOrder::Random
    } else {
        PhotoOrder::Newest
    };

    let photos = state
        .hub
        .list_photos(params.source.clone(), params.limit, params.offset, order)
        .await?;
    let total = state.hub.count_photos(params.source).await?;

    Ok(Json(PhotoListResponse {
        photos: photos.into_iter().map(PhotoItem::from_photo).collect(),
        total,
        limit: params.limit,
        offset: params.offset,
    }))
}

pub async fn get_photo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PhotoItem>, ApiError> {
    let photo = state
        .hub
        .get_photo(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Photo not found"))?;

    Ok(Json(PhotoItem::detail(photo)))
}

pub async fn delete_photo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    if !state.hub.delete_photo(id).await? {
        return Err(ApiError::not_found("Photo not found"));
    }
    Ok(Json(DeleteResponse { success: true }))
}

/// Streams the original bytes from disk. Any failure to locate the file,
/// including a stored path escaping the photo root, is a plain 404.
pub async fn serve_image(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let path = state.hub.photo_path(id).await.map_err(|e| match e {
        Error::NotFound => ApiError::not_found("Photo not found"),
        e => ApiError::from(e),
    })?;

    let content_type = media::content_type_for(&path.to_string_lossy());
    stream_file(&path, content_type).await
}

pub async fn serve_thumbnail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let path = state.hub.thumbnail_path(id).await.map_err(|e| match e {
        Error::NotFound => ApiError::not_found("Thumbnail not found"),
        e => ApiError::from(e),
    })?;

    stream_file(&path, "image/jpeg").await
}

async fn stream_file(path: &std::path::Path, content_type: &str) -> Result<Response, ApiError> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|_| ApiError::not_found("Photo not found"))?;
    let size = file
        .metadata()
        .await
        .map_err(|_| ApiError::not_found("Photo not found"))?
        .len();

    let body = Body::from_stream(ReaderStream::new(file));
    Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, size)
        .header(header::CACHE_CONTROL, CACHE_CONTROL)
        .body(body)
        .map_err(|e| ApiError::internal(format!("Failed to build response: {e}")))
}

pub async fn upload_photo(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let (data, filename) = read_file_field(&mut multipart).await?;

    let id = state
        .hub
        .add_photo(data.to_vec(), filename.clone(), "imported".to_string(), None)
        .await
        .map_err(|e| match e {
            Error::UnsupportedFormat(_) => ApiError::from(e),
            e => {
                error!("Upload failed: {e}");
                ApiError::internal("Failed to save photo")
            }
        })?;

    Ok(Json(UploadResponse { id, filename }))
}

/// Pulls the `file` field out of a multipart body. A missing filename
/// falls back to a JPEG default; a missing or empty field is a 400.
pub(super) async fn read_file_field(
    multipart: &mut Multipart,
) -> Result<(Bytes, String), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read multipart: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(ToString::to_string)
            .unwrap_or_else(|| DEFAULT_UPLOAD_FILENAME.to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read file: {e}")))?;
        if data.is_empty() {
            return Err(ApiError::bad_request("Empty file"));
        }
        return Ok((data, filename));
    }

    Err(ApiError::bad_request("File field is required"))
}
