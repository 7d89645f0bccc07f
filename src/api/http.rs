//! reqwest implementation of [`DomainBackend`]

use std::sync::Arc;

use async_trait::async_trait;
use aspire_types::{
    ChangeRequest, ChangeRequestId, CollectionId, CreatedResponse, ErrorResponse, Junction,
    NewCollection, ValidationStatus,
};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;

use super::session::{send_with_session, SessionProvider};
use super::{BackendError, DomainBackend, Result};
use crate::config::DomainConfig;

/// Error bodies are truncated to this many characters
const MAX_ERROR_BODY: usize = 200;

pub struct HttpBackend {
    config: DomainConfig,
    client: Client,
    session: Arc<dyn SessionProvider>,
}

impl HttpBackend {
    pub fn new(config: DomainConfig, session: Arc<dyn SessionProvider>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| BackendError::Network(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            client,
            session,
        })
    }

    pub fn config(&self) -> &DomainConfig {
        &self.config
    }

    /// Shared client, e.g. for building a [`super::RefreshingSession`]
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Send an authenticated request and return the raw response body
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> Result<String> {
        let url = self.config.endpoint(path);
        tracing::debug!(%method, %url, "backend request");

        send_with_session(self.session.as_ref(), |credentials| {
            let mut request = self.client.request(method.clone(), &url).query(query);
            if let Some(body) = &body {
                request = request.json(body);
            }
            let request = credentials.apply(request);
            async move {
                let response = request.send().await?;
                read_body(response).await
            }
        })
        .await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T> {
        let raw = self.send(method, path, &[], Some(body)).await?;
        serde_json::from_str(&raw).map_err(|e| BackendError::Decode(format!("{}: {}", path, e)))
    }
}

/// Map non-2xx responses onto [`BackendError`]
async fn read_body(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    let body = response.text().await?;

    if status.is_success() {
        return Ok(body);
    }

    if status == StatusCode::UNAUTHORIZED {
        if let Ok(error) = serde_json::from_str::<ErrorResponse>(&body) {
            if error.is_session_expired() {
                return Err(BackendError::SessionExpired {
                    message: error.message.unwrap_or_else(|| "session expired".to_string()),
                });
            }
        }
    }

    Err(BackendError::Status {
        status: status.as_u16(),
        body: body.chars().take(MAX_ERROR_BODY).collect(),
    })
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| BackendError::Decode(e.to_string()))
}

#[async_trait]
impl DomainBackend for HttpBackend {
    async fn create_change_request(&self, request: &ChangeRequest) -> Result<ChangeRequestId> {
        let created: CreatedResponse = self
            .send_json(Method::POST, "/domain/changes", to_value(request)?)
            .await?;
        Ok(created.id)
    }

    async fn update_change_request_status(
        &self,
        id: ChangeRequestId,
        status: ValidationStatus,
    ) -> Result<()> {
        self.send(
            Method::PUT,
            "/domain/changes/status",
            &[
                ("change_request_id", id.to_string()),
                ("status", status.as_str().to_string()),
            ],
            None,
        )
        .await?;
        Ok(())
    }

    async fn delete_change_request_draft(&self, id: ChangeRequestId) -> Result<()> {
        self.send(
            Method::DELETE,
            "/domain/changes/draft",
            &[("change_request_id", id.to_string())],
            None,
        )
        .await?;
        Ok(())
    }

    async fn create_collection(&self, collection: &NewCollection) -> Result<CollectionId> {
        let created: CreatedResponse = self
            .send_json(Method::POST, "/course/collection", to_value(collection)?)
            .await?;
        Ok(created.id)
    }

    async fn add_junctions(&self, junctions: &[Junction]) -> Result<()> {
        self.send(
            Method::POST,
            "/course/collection/concept",
            &[],
            Some(to_value(&junctions)?),
        )
        .await?;
        Ok(())
    }

    async fn remove_junctions(&self, junctions: &[Junction]) -> Result<()> {
        self.send(Method::DELETE, "/course/collection", &[], Some(to_value(&junctions)?))
            .await?;
        Ok(())
    }

    async fn save_domain(&self, payload: &serde_json::Value) -> Result<()> {
        self.send(Method::PUT, "/domain", &[], Some(payload.clone()))
            .await?;
        Ok(())
    }
}
