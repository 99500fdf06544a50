use std::sync::Arc;

use axum::{Json, extract::State};

use super::dto::{ConfigResponse, Features, SourcesResponse};
use super::response::ApiError;
use super::router::AppState;

pub async fn list_sources(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SourcesResponse>, ApiError> {
    let sources = state.hub.list_sources().await?;
    Ok(Json(SourcesResponse { sources }))
}

pub async fn get_config(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ConfigResponse>, ApiError> {
    let total_photos = state.hub.count_photos(None).await?;
    let sources = state.hub.list_sources().await?;

    Ok(Json(ConfigResponse {
        version: env!("CARGO_PKG_VERSION"),
        total_photos,
        sources: sources.len(),
        features: Features {
            streaming: true,
            import_zip: true,
            thumbnails: true,
        },
    }))
}
