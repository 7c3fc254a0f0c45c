//! Storage errors

use imagestore_core::AppError;
use imagestore_processing::DecodeError;
use thiserror::Error;

/// Rejections produced while mapping a relative path onto the storage root.
#[derive(Debug, Error)]
pub enum PathError {
    #[error("path must not be empty")]
    Empty,

    #[error("path must be relative to the storage root: {0}")]
    NotRelative(String),

    #[error("path escapes the storage root: {0}")]
    EscapesRoot(String),

    #[error("failed to resolve {path}: {message}")]
    Resolve { path: String, message: String },
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Decode failed: {0}")]
    DecodeFailed(#[from] DecodeError),

    #[error("Image dimensions out of range: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Thumbnail failed: {0}")]
    ThumbnailFailed(String),

    #[error("Invalid path: {0}")]
    Path(#[from] PathError),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<PathError> for AppError {
    fn from(err: PathError) -> Self {
        match err {
            PathError::Resolve { .. } => AppError::Storage(err.to_string()),
            other => AppError::InvalidPath(other.to_string()),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::DecodeFailed(e) => AppError::ImageProcessing(e.to_string()),
            StorageError::InvalidDimensions { width, height } => AppError::InvalidDimensions {
                width: u64::from(width),
                height: u64::from(height),
            },
            StorageError::ThumbnailFailed(msg) => AppError::ThumbnailFailed(msg),
            StorageError::Path(e) => e.into(),
            StorageError::NotFound(msg) => AppError::NotFound(msg),
            StorageError::Task(msg) => AppError::Internal(msg),
            e @ (StorageError::WriteFailed(_)
            | StorageError::ReadFailed(_)
            | StorageError::DeleteFailed(_)
            | StorageError::ConfigError(_)) => AppError::Storage(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imagestore_core::ErrorMetadata;

    #[test]
    fn test_path_errors_are_client_faults() {
        let err: AppError = StorageError::Path(PathError::EscapesRoot("../x".into())).into();
        assert_eq!(err.http_status_code(), 400);

        let err: AppError = PathError::NotRelative("/etc/passwd".into()).into();
        assert_eq!(err.error_code(), "INVALID_PATH");
    }

    #[test]
    fn test_decode_and_dimension_failures_are_client_faults() {
        let err: AppError = StorageError::DecodeFailed(DecodeError::Unsupported).into();
        assert_eq!(err.http_status_code(), 400);

        let err: AppError = StorageError::InvalidDimensions {
            width: u32::MAX,
            height: 1,
        }
        .into();
        assert_eq!(err.error_code(), "INVALID_DIMENSIONS");
    }

    #[test]
    fn test_io_failures_are_internal() {
        for err in [
            StorageError::WriteFailed("disk full".into()),
            StorageError::ReadFailed("eio".into()),
            StorageError::DeleteFailed("eperm".into()),
            StorageError::ThumbnailFailed("encoder".into()),
        ] {
            let app: AppError = err.into();
            assert_eq!(app.http_status_code(), 500);
        }
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let err: AppError = StorageError::NotFound("originals/u/x.png".into()).into();
        assert_eq!(err.http_status_code(), 404);
    }
}
