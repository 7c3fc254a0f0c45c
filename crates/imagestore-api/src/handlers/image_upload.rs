use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use futures::channel::mpsc;
use futures::SinkExt;

use crate::constants::{INGEST_CHANNEL_CAPACITY, METADATA_FIELD, PAYLOAD_FIELDS};
use crate::error::HttpAppError;
use crate::services::{IngestMessage, IngestReceipt, UploadMetadata};
use crate::state::AppState;

#[derive(Debug, thiserror::Error)]
enum UploadFormError {
    #[error("malformed multipart body: {0}")]
    Multipart(#[from] MultipartError),

    #[error("invalid metadata part: {0}")]
    Metadata(#[from] serde_json::Error),
}

type FormMessage = Result<IngestMessage, UploadFormError>;

/// Upload image handler
///
/// Expects a multipart body with a `metadata` part (JSON `{user_id, filename,
/// content_type}`) and one or more `file`/`chunk` parts. Payload bytes are handed to the
/// ingestion pipeline chunk by chunk as they are read off the wire.
///
/// # Returns
/// `IngestReceipt` on success (HTTP 201 Created)
///
/// # Errors
/// - `AppError::MissingMetadata` - no (or more than one) metadata part
/// - `AppError::PayloadTooLarge` - payload exceeds the configured limit
/// - `AppError::ImageProcessing` - payload is not a supported image
/// - `AppError::Storage` / `AppError::Database` - persistence failure
#[tracing::instrument(skip(state, multipart), fields(operation = "upload_image"))]
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<IngestReceipt>), HttpAppError> {
    let (tx, rx) = mpsc::channel::<FormMessage>(INGEST_CHANNEL_CAPACITY);

    let (_, result) = tokio::join!(forward_multipart(multipart, tx), state.ingest.ingest(rx));
    let receipt = result?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Read multipart fields in order and forward them as ingest messages. Stops early when
/// the receiving side has already given up.
async fn forward_multipart(mut multipart: Multipart, mut tx: mpsc::Sender<FormMessage>) {
    loop {
        let mut field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return,
            Err(e) => {
                let _ = tx.send(Err(e.into())).await;
                return;
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        if name == METADATA_FIELD {
            let message = match field.bytes().await {
                Ok(raw) => serde_json::from_slice::<UploadMetadata>(&raw)
                    .map(IngestMessage::Metadata)
                    .map_err(UploadFormError::from),
                Err(e) => Err(e.into()),
            };
            let failed = message.is_err();
            if tx.send(message).await.is_err() || failed {
                return;
            }
        } else if PAYLOAD_FIELDS.contains(&name.as_str()) {
            loop {
                match field.chunk().await {
                    Ok(Some(chunk)) => {
                        if tx.send(Ok(IngestMessage::Chunk(chunk))).await.is_err() {
                            return;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        let _ = tx.send(Err(e.into())).await;
                        return;
                    }
                }
            }
        } else {
            tracing::debug!(field = %name, "Ignoring unknown multipart field");
        }
    }
}
