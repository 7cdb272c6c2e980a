use thiserror::Error;

/// Application-level errors (HTTP layer)
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    ServiceError(#[from] mingle_service::error::ServiceError),

    #[error(transparent)]
    DatabaseError(#[from] mingle_db::error::DbError),

    #[error(transparent)]
    CoreError(#[from] mingle_core::error::CoreError),
}

pub type AppResult<T> = std::result::Result<T, AppError>;
