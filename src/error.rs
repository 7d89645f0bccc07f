//! Store-level error type

use aspire_types::ValidationError;
use thiserror::Error;

use crate::api::BackendError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("graph store used before initialize()")]
    NotInitialized,

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("backend call failed: {0}")]
    Backend(#[from] BackendError),

    /// Local state could not be restored after a failed backend call
    #[error("store consistency lost: {0}")]
    Consistency(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_session_expired(&self) -> bool {
        matches!(self, StoreError::Backend(BackendError::SessionExpired { .. }))
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
