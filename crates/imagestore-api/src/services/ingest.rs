//! Ingestion orchestrator
//!
//! Turns one upload (a metadata header plus byte chunks, in any interleaving) into two
//! stored artifacts and one index record. Files are written first and the record second;
//! when the record cannot be written the files are removed again.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Instant;

use bytes::{Bytes, BytesMut};
use chrono::Utc;
use futures::{Stream, StreamExt};
use imagestore_core::{image_url, AppError, ImageRecord, InvalidOwnerId, OwnerId};
use imagestore_db::{ImageIndex, IndexError};
use imagestore_storage::{ImageStore, StorageError};
use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

/// Upload header sent once per upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadMetadata {
    pub user_id: String,
    pub filename: String,
    pub content_type: String,
}

#[derive(Debug, Clone)]
pub enum IngestMessage {
    Metadata(UploadMetadata),
    Chunk(Bytes),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReceipt {
    pub image_id: Uuid,
    pub url: String,
    pub thumbnail_url: String,
    pub size_bytes: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("metadata not provided")]
    MissingMetadata,

    #[error("metadata sent more than once")]
    DuplicateMetadata,

    #[error("upload exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: usize },

    #[error(transparent)]
    InvalidOwner(#[from] InvalidOwnerId),

    #[error("upload stream failed: {0}")]
    Transport(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("indexing task failed: {0}")]
    Task(String),
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::MissingMetadata => AppError::MissingMetadata(err.to_string()),
            IngestError::DuplicateMetadata => AppError::BadRequest(err.to_string()),
            IngestError::PayloadTooLarge { .. } => AppError::PayloadTooLarge(err.to_string()),
            IngestError::InvalidOwner(e) => e.into(),
            IngestError::Transport(msg) => AppError::BadRequest(msg),
            IngestError::Storage(e) => e.into(),
            IngestError::Index(e) => e.into(),
            IngestError::Task(msg) => AppError::Internal(msg),
        }
    }
}

/// Progress of one ingestion call, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IngestState {
    AwaitingMetadata,
    AccumulatingChunks,
    Storing,
    Indexing,
    Done,
    RolledBack,
}

#[derive(Clone)]
pub struct IngestService {
    store: ImageStore,
    index: Arc<dyn ImageIndex>,
    base_url: String,
    max_upload_bytes: usize,
}

impl IngestService {
    pub fn new(
        store: ImageStore,
        index: Arc<dyn ImageIndex>,
        base_url: impl Into<String>,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            store,
            index,
            base_url: base_url.into(),
            max_upload_bytes,
        }
    }

    /// Consume one upload stream and persist it.
    ///
    /// Nothing is persisted unless the stream ends cleanly with exactly one metadata
    /// header. Errors are returned as-is; there is no retry.
    #[tracing::instrument(
        skip(self, messages),
        fields(owner = tracing::field::Empty, image_id = tracing::field::Empty)
    )]
    pub async fn ingest<S, E>(&self, messages: S) -> Result<IngestReceipt, IngestError>
    where
        S: Stream<Item = Result<IngestMessage, E>>,
        E: Display,
    {
        let start = Instant::now();
        let mut messages = std::pin::pin!(messages);
        let mut state = IngestState::AwaitingMetadata;
        let mut header: Option<(OwnerId, UploadMetadata)> = None;
        let mut buffer = BytesMut::new();

        while let Some(message) = messages.next().await {
            match message.map_err(|e| IngestError::Transport(e.to_string()))? {
                IngestMessage::Metadata(metadata) => {
                    if header.is_some() {
                        return Err(IngestError::DuplicateMetadata);
                    }
                    let owner = OwnerId::parse(metadata.user_id.as_str())?;
                    tracing::Span::current().record("owner", tracing::field::display(&owner));
                    header = Some((owner, metadata));
                    state = transition(state, IngestState::AccumulatingChunks);
                }
                IngestMessage::Chunk(chunk) => {
                    if buffer.len() + chunk.len() > self.max_upload_bytes {
                        return Err(IngestError::PayloadTooLarge {
                            limit: self.max_upload_bytes,
                        });
                    }
                    buffer.extend_from_slice(&chunk);
                }
            }
        }

        let (owner, metadata) = header.ok_or(IngestError::MissingMetadata)?;

        state = transition(state, IngestState::Storing);
        let staged = self
            .store
            .store(
                &owner,
                &metadata.filename,
                &metadata.content_type,
                buffer.freeze(),
            )
            .await?;
        tracing::Span::current().record("image_id", tracing::field::display(staged.id));

        state = transition(state, IngestState::Indexing);
        let record = ImageRecord {
            id: staged.id,
            owner,
            filename: metadata.filename,
            content_type: metadata.content_type,
            size_bytes: i64::try_from(staged.size_bytes).map_err(|_| {
                IngestError::PayloadTooLarge {
                    limit: self.max_upload_bytes,
                }
            })?,
            width: staged.width,
            height: staged.height,
            uploaded_at: Utc::now(),
            original_relpath: staged.paths.original.clone(),
            thumbnail_relpath: staged.paths.thumbnail.clone(),
        };

        // The insert and the commit/rollback that follows it run on their own task, so a
        // dropped caller cannot remove files under a record that was already written.
        let index = self.index.clone();
        let indexed = tokio::spawn(
            async move {
                match index.put(&record).await {
                    Ok(()) => {
                        staged.commit();
                        Ok(record)
                    }
                    Err(e) => {
                        let original = staged.paths.original.clone();
                        if let Err(cleanup_err) = staged.rollback().await {
                            tracing::warn!(
                                error = %cleanup_err,
                                path = %original,
                                "Failed to cleanup stored files after index error"
                            );
                        }
                        Err(e)
                    }
                }
            }
            .in_current_span(),
        )
        .await
        .map_err(|e| IngestError::Task(e.to_string()))?;

        let record = match indexed {
            Ok(record) => {
                transition(state, IngestState::Done);
                record
            }
            Err(e) => {
                transition(state, IngestState::RolledBack);
                return Err(e.into());
            }
        };

        tracing::info!(
            size_bytes = record.size_bytes,
            width = record.width,
            height = record.height,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Image ingested"
        );

        Ok(IngestReceipt {
            image_id: record.id,
            url: image_url(&self.base_url, record.id, false),
            thumbnail_url: image_url(&self.base_url, record.id, true),
            size_bytes: record.size_bytes,
        })
    }
}

fn transition(from: IngestState, to: IngestState) -> IngestState {
    if from != to {
        tracing::debug!(from = ?from, to = ?to, "Ingest state transition");
    }
    to
}

#[cfg(test)]
mod tests {
    use super::*;
    use imagestore_core::ErrorMetadata;

    #[test]
    fn test_metadata_errors_have_distinct_codes() {
        let missing: AppError = IngestError::MissingMetadata.into();
        let duplicate: AppError = IngestError::DuplicateMetadata.into();

        assert_eq!(missing.error_code(), "MISSING_METADATA");
        assert_eq!(duplicate.error_code(), "BAD_REQUEST");
        assert_eq!(duplicate.http_status_code(), 400);
    }

    #[test]
    fn test_size_and_task_failures() {
        let too_large: AppError = IngestError::PayloadTooLarge { limit: 10 }.into();
        assert_eq!(too_large.http_status_code(), 413);

        let task: AppError = IngestError::Task("panicked".to_string()).into();
        assert_eq!(task.http_status_code(), 500);
    }
}
