use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::owner::OwnerId;

/// Durable metadata for one stored image. Never mutated after ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: Uuid,
    pub owner: OwnerId,
    pub filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub width: i32,
    pub height: i32,
    pub uploaded_at: DateTime<Utc>,
    pub original_relpath: String,
    pub thumbnail_relpath: String,
}

/// Public URL of an image (or its thumbnail) below the transport's base URL.
pub fn image_url(base_url: &str, id: Uuid, thumbnail: bool) -> String {
    let base = base_url.trim_end_matches('/');
    if thumbnail {
        format!("{}/images/{}?thumbnail=true", base, id)
    } else {
        format!("{}/images/{}", base, id)
    }
}

/// Client-facing view of an image record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageView {
    pub image_id: Uuid,
    pub user_id: String,
    pub filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub width: i32,
    pub height: i32,
    pub uploaded_at: DateTime<Utc>,
    pub url: String,
    pub thumbnail_url: String,
}

impl ImageView {
    pub fn from_record(record: ImageRecord, base_url: &str) -> Self {
        ImageView {
            url: image_url(base_url, record.id, false),
            thumbnail_url: image_url(base_url, record.id, true),
            image_id: record.id,
            user_id: record.owner.into(),
            filename: record.filename,
            content_type: record.content_type,
            size_bytes: record.size_bytes,
            width: record.width,
            height: record.height,
            uploaded_at: record.uploaded_at,
        }
    }
}
