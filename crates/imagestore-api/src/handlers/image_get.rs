use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use imagestore_core::{ImageView, OwnerId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::HttpAppError;
use crate::services::ImagePage;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    user_id: String,
    #[serde(default)]
    page_size: i64,
    page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UrlQuery {
    #[serde(default)]
    thumbnail: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UrlResponse {
    pub url: String,
}

#[tracing::instrument(skip(state), fields(image_id = %id, operation = "get_image"))]
pub async fn get_image(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ImageView>, HttpAppError> {
    let view = state.catalog.get_metadata(id).await?;
    Ok(Json(view))
}

#[tracing::instrument(skip(state), fields(operation = "list_images"))]
pub async fn list_images(
    Query(query): Query<ListQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ImagePage>, HttpAppError> {
    let owner = OwnerId::parse(query.user_id).map_err(imagestore_core::AppError::from)?;
    let page = state
        .catalog
        .list(&owner, query.page_size, query.page_token.as_deref())
        .await?;
    Ok(Json(page))
}

#[tracing::instrument(skip(state), fields(image_id = %id, operation = "get_image_url"))]
pub async fn get_image_url(
    Path(id): Path<Uuid>,
    Query(query): Query<UrlQuery>,
    State(state): State<Arc<AppState>>,
) -> Json<UrlResponse> {
    Json(UrlResponse {
        url: state.catalog.image_url(id, query.thumbnail),
    })
}
