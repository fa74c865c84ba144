use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("integrity error: {0}")]
    Integrity(String),
}

/// Rule violated by a request. Nothing has been written when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("malformed request: {0}")]
    Malformed(String),
    #[error("can't have duplicate ids: {0}")]
    DuplicateId(String),
    #[error("parent id can't be the same as id: {0}")]
    SelfParent(String),
    #[error("folder can't have url or size: {0}")]
    FolderWithUrlOrSize(String),
    #[error("file must have url and positive size: {0}")]
    FileWithoutUrlOrSize(String),
    #[error("parent must exist and be a folder: {0}")]
    ParentNotFolder(String),
    #[error("can't change type: {0}")]
    KindChange(String),
    #[error("nothing to update: {0}")]
    NothingToUpdate(String),
    #[error("folder total would overflow when applying {0}")]
    SizeOverflow(String),
    #[error("parent chain of {0} would contain itself")]
    ParentCycle(String),
    #[error("tree below {0} exceeds {1} levels")]
    TreeTooDeep(String, usize),
    #[error("date range start is after its end")]
    InvalidRange,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Integrity(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = match self {
            AppError::Validation(_) => "Validation Failed".to_string(),
            AppError::NotFound(_) => "Item not found".to_string(),
            other => other.to_string(),
        };
        HttpResponse::build(status).json(serde_json::json!({
            "code": status.as_u16(),
            "message": message
        }))
    }
}
