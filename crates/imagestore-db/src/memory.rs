//! In-process image index.

use std::cmp::Reverse;
use std::collections::HashMap;

use async_trait::async_trait;
use imagestore_core::{ImageRecord, OwnerId};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{IndexError, IndexResult};
use crate::index::ImageIndex;

/// Index kept in memory. Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryImageIndex {
    records: RwLock<HashMap<Uuid, ImageRecord>>,
}

impl MemoryImageIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ImageIndex for MemoryImageIndex {
    async fn put(&self, record: &ImageRecord) -> IndexResult<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(IndexError::Conflict(record.id));
        }
        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> IndexResult<ImageRecord> {
        self.records
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(IndexError::NotFound(id))
    }

    async fn list(
        &self,
        owner: &OwnerId,
        limit: i64,
        offset: i64,
    ) -> IndexResult<Vec<ImageRecord>> {
        let records = self.records.read().await;
        let mut owned: Vec<&ImageRecord> = records.values().filter(|r| &r.owner == owner).collect();
        owned.sort_by_key(|r| Reverse((r.uploaded_at, r.id)));

        let offset = usize::try_from(offset.max(0)).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        Ok(owned
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count(&self, owner: &OwnerId) -> IndexResult<i64> {
        let records = self.records.read().await;
        Ok(records.values().filter(|r| &r.owner == owner).count() as i64)
    }

    async fn delete(&self, id: Uuid) -> IndexResult<()> {
        self.records
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(IndexError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn record(owner: &str, age_secs: i64) -> ImageRecord {
        let id = Uuid::new_v4();
        ImageRecord {
            id,
            owner: OwnerId::parse(owner).unwrap(),
            filename: "a.gif".to_string(),
            content_type: "image/gif".to_string(),
            size_bytes: 10,
            width: 1,
            height: 1,
            uploaded_at: Utc::now() - Duration::seconds(age_secs),
            original_relpath: format!("originals/{}/{}.gif", owner, id),
            thumbnail_relpath: format!("thumbnails/{}/{}_thumb.webp", owner, id),
        }
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let index = MemoryImageIndex::new();
        let rec = record("user-1", 0);

        index.put(&rec).await.unwrap();
        assert!(matches!(index.put(&rec).await, Err(IndexError::Conflict(_))));
        assert_eq!(index.get(rec.id).await.unwrap(), rec);

        index.delete(rec.id).await.unwrap();
        assert!(matches!(index.get(rec.id).await, Err(IndexError::NotFound(_))));
        assert!(matches!(
            index.delete(rec.id).await,
            Err(IndexError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_orders_and_pages() {
        let index = MemoryImageIndex::new();
        let oldest = record("user-1", 30);
        let middle = record("user-1", 20);
        let newest = record("user-1", 10);
        for rec in [&oldest, &newest, &middle, &record("user-2", 0)] {
            index.put(rec).await.unwrap();
        }

        let owner = OwnerId::parse("user-1").unwrap();
        let first = index.list(&owner, 2, 0).await.unwrap();
        let second = index.list(&owner, 2, 2).await.unwrap();
        assert_eq!(
            first.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![newest.id, middle.id]
        );
        assert_eq!(second.iter().map(|r| r.id).collect::<Vec<_>>(), vec![oldest.id]);
        assert_eq!(index.count(&owner).await.unwrap(), 3);
        assert!(index.list(&owner, 0, 0).await.unwrap().is_empty());
    }
}
