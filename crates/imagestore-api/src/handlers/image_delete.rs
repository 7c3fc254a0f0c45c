use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use imagestore_core::{AppError, OwnerId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::HttpAppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    user_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
}

/// Delete an image. Only the owning user may delete it (403 otherwise).
#[tracing::instrument(skip(state), fields(image_id = %id, operation = "delete_image"))]
pub async fn delete_image(
    Path(id): Path<Uuid>,
    Query(query): Query<DeleteQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<DeleteResponse>, HttpAppError> {
    let owner = OwnerId::parse(query.user_id).map_err(AppError::from)?;
    state.catalog.delete(id, &owner).await?;
    Ok(Json(DeleteResponse { success: true }))
}
