use std::sync::Arc;
use std::time::Instant;

use axum::extract::{DefaultBodyLimit, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{
    Router,
    routing::{get, post},
};

use super::{imports, photos, sources};
use crate::hub::PhotoHub;

/// Uploads and ZIP imports arrive in one body; 500 MB covers a large
/// camera-roll archive.
const MAX_BODY_BYTES: usize = 500 * 1024 * 1024;

pub struct AppState {
    pub hub: Arc<PhotoHub>,
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/photos", get(photos::list_photos))
        .route("/photos/upload", post(photos::upload_photo))
        .route(
            "/photos/{id}",
            get(photos::get_photo).delete(photos::delete_photo),
        )
        .route("/photos/{id}/image", get(photos::serve_image))
        .route("/photos/{id}/thumbnail", get(photos::serve_thumbnail))
        .route("/import-zip", post(imports::import_zip))
        .route("/sources", get(sources::list_sources))
        .route("/config", get(sources::get_config))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
