use imagestore_core::AppError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Image {0} is already indexed")]
    Conflict(Uuid),

    #[error("Image {0} not found")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(String),
}

pub type IndexResult<T> = Result<T, IndexError>;

impl From<sqlx::Error> for IndexError {
    fn from(err: sqlx::Error) -> Self {
        IndexError::Database(err.to_string())
    }
}

impl From<IndexError> for AppError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::NotFound(_) => AppError::NotFound("Image not found".to_string()),
            IndexError::Conflict(id) => AppError::Conflict(format!("duplicate image id {}", id)),
            IndexError::Database(msg) => AppError::Database(msg),
        }
    }
}
