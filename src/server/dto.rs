use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Photo, SourceWithCount};

#[derive(Debug, Deserialize)]
pub struct ListPhotosParams {
    pub source: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    #[serde(default)]
    pub random: bool,
}

fn default_limit() -> i64 {
    100
}

/// One photo as served over the API. Media is always addressed through
/// the `/photos/{id}/...` routes, never by filesystem location.
#[derive(Debug, Serialize)]
pub struct PhotoItem {
    pub id: String,
    pub filename: String,
    pub url: String,
    pub thumb_url: String,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub taken_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub source_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl PhotoItem {
    #[must_use]
    pub fn from_photo(photo: Photo) -> Self {
        Self {
            url: format!("/photos/{}/image", photo.id),
            thumb_url: format!("/photos/{}/thumbnail", photo.id),
            id: photo.id,
            filename: photo.filename,
            width: photo.width,
            height: photo.height,
            taken_at: photo.taken_at,
            created_at: photo.created_at,
            source_id: photo.source_id,
            metadata: None,
        }
    }

    /// Detail view adds the stored metadata blob.
    #[must_use]
    pub fn detail(photo: Photo) -> Self {
        let metadata = photo
            .metadata
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok());
        let mut item = Self::from_photo(photo);
        item.metadata = metadata;
        item
    }
}

#[derive(Debug, Serialize)]
pub struct PhotoListResponse {
    pub photos: Vec<PhotoItem>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub id: String,
    pub filename: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct SourcesResponse {
    pub sources: Vec<SourceWithCount>,
}

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub version: &'static str,
    pub total_photos: i64,
    pub sources: usize,
    pub features: Features,
}

#[derive(Debug, Serialize)]
pub struct Features {
    pub streaming: bool,
    pub import_zip: bool,
    pub thumbnails: bool,
}
