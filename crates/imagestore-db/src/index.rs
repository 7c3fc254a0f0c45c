//! Index abstraction trait

use async_trait::async_trait;
use imagestore_core::{ImageRecord, OwnerId};
use uuid::Uuid;

use crate::error::IndexResult;

/// Record store keyed by image id and partitioned by owner.
///
/// Records are insert-only: there is no update, and `put` of an existing id fails with
/// `IndexError::Conflict`.
#[async_trait]
pub trait ImageIndex: Send + Sync {
    async fn put(&self, record: &ImageRecord) -> IndexResult<()>;

    async fn get(&self, id: Uuid) -> IndexResult<ImageRecord>;

    /// One page of an owner's records, newest first. Equal timestamps are ordered by id
    /// descending so that offsets are stable.
    async fn list(&self, owner: &OwnerId, limit: i64, offset: i64)
        -> IndexResult<Vec<ImageRecord>>;

    async fn count(&self, owner: &OwnerId) -> IndexResult<i64>;

    async fn delete(&self, id: Uuid) -> IndexResult<()>;
}
