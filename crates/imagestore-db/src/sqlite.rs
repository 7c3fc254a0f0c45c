//! SQLite image index: CRUD for the images table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use imagestore_core::{ImageRecord, OwnerId};
use sqlx::migrate::Migrator;
use sqlx::{Sqlite, SqlitePool};
use uuid::Uuid;

use crate::error::{IndexError, IndexResult};
use crate::index::ImageIndex;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const SELECT_COLUMNS: &str = "SELECT id, user_id, filename, content_type, size_bytes, width, \
     height, uploaded_at, original_path, thumbnail_path FROM images";

/// Row type for the images table (for FromRow).
#[derive(Debug, sqlx::FromRow)]
struct ImageRow {
    id: String,
    user_id: String,
    filename: String,
    content_type: String,
    size_bytes: i64,
    width: i32,
    height: i32,
    uploaded_at: i64,
    original_path: String,
    thumbnail_path: String,
}

impl ImageRow {
    fn into_record(self) -> IndexResult<ImageRecord> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| IndexError::Database(format!("invalid id {:?}: {}", self.id, e)))?;
        let owner = OwnerId::parse(self.user_id)
            .map_err(|e| IndexError::Database(format!("invalid owner for image {}: {}", id, e)))?;
        let uploaded_at = DateTime::<Utc>::from_timestamp_micros(self.uploaded_at).ok_or_else(
            || IndexError::Database(format!("invalid upload time for image {}", id)),
        )?;

        Ok(ImageRecord {
            id,
            owner,
            filename: self.filename,
            content_type: self.content_type,
            size_bytes: self.size_bytes,
            width: self.width,
            height: self.height,
            uploaded_at,
            original_relpath: self.original_path,
            thumbnail_relpath: self.thumbnail_path,
        })
    }
}

#[derive(Clone)]
pub struct SqliteImageIndex {
    pool: SqlitePool,
}

impl SqliteImageIndex {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Apply pending schema migrations.
    pub async fn migrate(&self) -> IndexResult<()> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| IndexError::Database(format!("migration failed: {}", e)))?;
        tracing::info!("Image index migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ImageIndex for SqliteImageIndex {
    #[tracing::instrument(
        skip(self, record),
        fields(db.table = "images", db.operation = "insert", db.record_id = %record.id, owner = %record.owner)
    )]
    async fn put(&self, record: &ImageRecord) -> IndexResult<()> {
        let result = sqlx::query::<Sqlite>(
            r#"
            INSERT INTO images (id, user_id, filename, content_type, size_bytes, width, height,
                                uploaded_at, original_path, thumbnail_path)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.owner.as_str())
        .bind(&record.filename)
        .bind(&record.content_type)
        .bind(record.size_bytes)
        .bind(record.width)
        .bind(record.height)
        .bind(record.uploaded_at.timestamp_micros())
        .bind(&record.original_relpath)
        .bind(&record.thumbnail_relpath)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(IndexError::Conflict(record.id))
            }
            Err(e) => Err(e.into()),
        }
    }

    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "select", db.record_id = %id))]
    async fn get(&self, id: Uuid) -> IndexResult<ImageRecord> {
        let row: Option<ImageRow> =
            sqlx::query_as::<Sqlite, ImageRow>(&format!("{} WHERE id = ?", SELECT_COLUMNS))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.ok_or(IndexError::NotFound(id))?.into_record()
    }

    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "select", owner = %owner))]
    async fn list(
        &self,
        owner: &OwnerId,
        limit: i64,
        offset: i64,
    ) -> IndexResult<Vec<ImageRecord>> {
        let rows: Vec<ImageRow> = sqlx::query_as::<Sqlite, ImageRow>(&format!(
            "{} WHERE user_id = ? ORDER BY uploaded_at DESC, id DESC LIMIT ? OFFSET ?",
            SELECT_COLUMNS
        ))
        .bind(owner.as_str())
        .bind(limit.max(0))
        .bind(offset.max(0))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ImageRow::into_record).collect()
    }

    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "count", owner = %owner))]
    async fn count(&self, owner: &OwnerId) -> IndexResult<i64> {
        let count: i64 = sqlx::query_scalar::<Sqlite, i64>(
            "SELECT COUNT(*) FROM images WHERE user_id = ?",
        )
        .bind(owner.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "delete", db.record_id = %id))]
    async fn delete(&self, id: Uuid) -> IndexResult<()> {
        let result = sqlx::query::<Sqlite>("DELETE FROM images WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(IndexError::NotFound(id));
        }
        Ok(())
    }
}
