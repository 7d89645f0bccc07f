//! DomainBackend trait: the sole boundary between the graph store and the
//! tool's REST backend. The store depends on this trait, never on reqwest.

pub mod http;
pub mod session;

use async_trait::async_trait;
use aspire_types::{
    ChangeRequest, ChangeRequestId, CollectionId, Junction, NewCollection, ValidationStatus,
};
use thiserror::Error;

pub use http::HttpBackend;
pub use session::{
    send_with_session, Credentials, RefreshingSession, SessionProvider, SessionTokens, StaticSession,
};

#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// Still expired after one refresh and one retry
    #[error("session expired: {message}")]
    SessionExpired { message: String },

    #[error("session refresh failed: {0}")]
    Session(String),

    #[error("backend unreachable: {0}")]
    Network(String),

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else {
            BackendError::Network(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, BackendError>;

#[async_trait]
pub trait DomainBackend: Send + Sync {
    /// `POST /domain/changes`
    async fn create_change_request(&self, request: &ChangeRequest) -> Result<ChangeRequestId>;

    /// `PUT /domain/changes/status?change_request_id&status`
    async fn update_change_request_status(
        &self,
        id: ChangeRequestId,
        status: ValidationStatus,
    ) -> Result<()>;

    /// `DELETE /domain/changes/draft?change_request_id`
    async fn delete_change_request_draft(&self, id: ChangeRequestId) -> Result<()>;

    // ── Collections ──────────────────────────────────────────────

    /// `POST /course/collection`
    async fn create_collection(&self, collection: &NewCollection) -> Result<CollectionId>;

    /// `POST /course/collection/concept`
    async fn add_junctions(&self, junctions: &[Junction]) -> Result<()>;

    /// `DELETE /course/collection`
    async fn remove_junctions(&self, junctions: &[Junction]) -> Result<()>;

    /// `PUT /domain` with a caller-supplied payload
    async fn save_domain(&self, payload: &serde_json::Value) -> Result<()>;
}
