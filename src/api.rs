//! Request/response client for the session backend.
//!
//! Used by the polling transport and the remote start path. The backend is
//! optional; callers treat failures here as transient and fall back to
//! local tracking (see [`crate::backend`]).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ApiError, ConfigError};
use crate::model::ExecutionArrayState;

/// Envelope for execution state responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionStateResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ExecutionArrayState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StartExecutionRequest {
    pub auto_approve: bool,
}

/// Request/response surface consumed by the polling transport and the
/// remote action path.
#[async_trait]
pub trait SessionApi: Send + Sync {
    /// `GET /session/{session_id}/execution/{execution_id}`
    async fn fetch_execution(
        &self,
        session_id: &str,
        execution_id: &str,
    ) -> std::result::Result<ExecutionStateResponse, ApiError>;

    /// `POST /session/{session_id}/execution/{execution_id}/start`
    async fn start_execution(
        &self,
        session_id: &str,
        execution_id: &str,
        auto_approve: bool,
    ) -> std::result::Result<ExecutionStateResponse, ApiError>;

    /// `GET /health` backend probe.
    async fn health(&self) -> std::result::Result<bool, ApiError>;
}

/// Production `reqwest`-backed client.
pub struct HttpSessionApi {
    client: Client,
    base_url: Url,
    token: Option<SecretString>,
}

impl HttpSessionApi {
    pub fn new(base_url: &str) -> std::result::Result<Self, ConfigError> {
        let base_url = Url::parse(base_url)?;
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url,
            token: None,
        })
    }

    /// Attach a bearer token for authenticated gateways.
    pub fn with_token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    fn endpoint(&self, path: &str) -> std::result::Result<Url, ApiError> {
        self.base_url.join(path).map_err(|e| ApiError::Rejected {
            message: format!("invalid endpoint path {path:?}: {e}"),
        })
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token.expose_secret()),
            None => req,
        }
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> std::result::Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl SessionApi for HttpSessionApi {
    async fn fetch_execution(
        &self,
        session_id: &str,
        execution_id: &str,
    ) -> std::result::Result<ExecutionStateResponse, ApiError> {
        let url = self.endpoint(&format!("session/{session_id}/execution/{execution_id}"))?;
        let response = self.authorize(self.client.get(url)).send().await?;
        Self::decode(response).await
    }

    async fn start_execution(
        &self,
        session_id: &str,
        execution_id: &str,
        auto_approve: bool,
    ) -> std::result::Result<ExecutionStateResponse, ApiError> {
        let url = self.endpoint(&format!(
            "session/{session_id}/execution/{execution_id}/start"
        ))?;
        let response = self
            .authorize(self.client.post(url))
            .json(&StartExecutionRequest { auto_approve })
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn health(&self) -> std::result::Result<bool, ApiError> {
        let url = self.endpoint("health")?;
        let response = self.authorize(self.client.get(url)).send().await?;
        Ok(response.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_response_decodes_without_state() {
        let decoded: ExecutionStateResponse =
            serde_json::from_str(r#"{"success": false, "error": "unknown execution"}"#).unwrap();
        assert!(!decoded.success);
        assert!(decoded.state.is_none());
        assert_eq!(decoded.error.as_deref(), Some("unknown execution"));
    }

    #[test]
    fn endpoint_joins_relative_to_base() {
        let api = HttpSessionApi::new("http://127.0.0.1:9000/api/").unwrap();
        let url = api.endpoint("session/s1/execution/e1").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/api/session/s1/execution/e1");
    }

    #[test]
    fn rejects_malformed_base_url() {
        assert!(HttpSessionApi::new("not a url").is_err());
    }
}
