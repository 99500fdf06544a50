use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, State},
};

use super::photos::read_file_field;
use super::response::ApiError;
use super::router::AppState;
use crate::hub::ImportSummary;

/// Bulk import from an uploaded ZIP archive. Entry-level failures are
/// reported inside the summary; only an unreadable archive is an error.
pub async fn import_zip(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ImportSummary>, ApiError> {
    let (data, _filename) = read_file_field(&mut multipart).await?;
    let summary = state.hub.import_zip(data.to_vec()).await?;
    Ok(Json(summary))
}
