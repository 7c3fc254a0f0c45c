use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::Response,
};
use imagestore_core::constants::IMMUTABLE_CACHE_CONTROL;
use imagestore_core::AppError;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::HttpAppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    #[serde(default)]
    thumbnail: bool,
}

/// Serve the stored original (with its declared content type) or the WebP thumbnail.
#[tracing::instrument(skip(state), fields(image_id = %id, thumbnail = query.thumbnail))]
pub async fn download_image(
    Path(id): Path<Uuid>,
    Query(query): Query<DownloadQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, HttpAppError> {
    let served = state.images.serve(id, query.thumbnail).await?;

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, served.content_type)
        .header(header::CONTENT_LENGTH, served.bytes.len())
        .header(header::CACHE_CONTROL, IMMUTABLE_CACHE_CONTROL)
        .body(Body::from(served.bytes))
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to build response");
            AppError::Internal(e.to_string())
        })?;

    Ok(response)
}
