pub mod access;
pub mod account_service;
pub mod board_service;

pub use account_service::{AccountService, Session};
pub use board_service::{BoardDetail, BoardService, BoardUpdate, CardDraft, CardUpdate, ListDetail};

use thiserror::Error;

use crate::auth::JwtError;
use crate::database::StoreError;

/// Outcome kinds of every board and account operation. The HTTP layer maps
/// each kind to a status code.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Password hashing failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),

    #[error("Token error: {0}")]
    Token(#[from] JwtError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ServiceError::Forbidden(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Trimmed, non-empty display name
pub(crate) fn require_name(kind: &str, name: &str) -> ServiceResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::validation(format!("{} name is required", kind)));
    }
    if name.chars().count() > 200 {
        return Err(ServiceError::validation(format!(
            "{} name must be at most 200 characters",
            kind
        )));
    }
    Ok(name.to_string())
}
