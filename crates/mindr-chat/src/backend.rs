//! Wire types and client for the assistant backend.
//!
//! Two endpoints: `POST /api/toolcall` (one conversation turn) and
//! `GET /get_all_user_chats` (all threads for a user), both authenticated
//! with a bearer identity token.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use mindr_core::config::BackendConfig;
use mindr_core::{MindrError, Result};

/// Request body for one conversation turn.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallRequest {
    pub prompt: String,
    /// Omitted on the first send of a new thread; the backend creates the
    /// thread and returns its id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    /// Calendar access token, when one is connected. Optional: its absence
    /// never fails a send.
    #[serde(rename = "accessToken", skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

/// Successful tool-call response.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallReply {
    pub response: String,
    #[serde(default)]
    pub chat_id: Option<String>,
    /// Present when the backend needs the user to authorize calendar access.
    #[serde(default)]
    pub authorization_url: Option<String>,
}

/// Error body the backend attaches to non-2xx responses.
#[derive(Debug, Default, Deserialize)]
struct BackendErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// One message of a historical thread as the backend returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct ThreadMessage {
    pub role: String,
    pub content: String,
}

/// Seam to the assistant backend service.
#[async_trait]
pub trait AssistantBackend: Send + Sync {
    /// Dispatch one conversation turn.
    async fn tool_call(
        &self,
        identity_token: &str,
        request: &ToolCallRequest,
    ) -> Result<ToolCallReply>;

    /// Fetch all threads for the given user, keyed by thread id.
    async fn list_threads(
        &self,
        identity_token: &str,
        user_id: &str,
    ) -> Result<HashMap<String, Vec<ThreadMessage>>>;
}

/// HTTP implementation over reqwest.
pub struct HttpAssistantBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAssistantBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| MindrError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Map a non-2xx response to `MindrError::Backend`, preferring the
    /// server-reported message over a status-derived fallback.
    async fn backend_error(response: reqwest::Response) -> MindrError {
        let status = response.status();
        let body: BackendErrorBody = response.json().await.unwrap_or_default();
        let message = body.error.unwrap_or_else(|| {
            format!(
                "{} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("unknown status")
            )
        });
        MindrError::Backend {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl AssistantBackend for HttpAssistantBackend {
    async fn tool_call(
        &self,
        identity_token: &str,
        request: &ToolCallRequest,
    ) -> Result<ToolCallReply> {
        let url = format!("{}/api/toolcall", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(identity_token)
            .json(request)
            .send()
            .await
            .map_err(|e| MindrError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::backend_error(response).await);
        }

        response
            .json::<ToolCallReply>()
            .await
            .map_err(|e| MindrError::Serialization(e.to_string()))
    }

    async fn list_threads(
        &self,
        identity_token: &str,
        user_id: &str,
    ) -> Result<HashMap<String, Vec<ThreadMessage>>> {
        let url = format!("{}/get_all_user_chats", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("user_id", user_id)])
            .bearer_auth(identity_token)
            .send()
            .await
            .map_err(|e| MindrError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::backend_error(response).await);
        }

        response
            .json::<HashMap<String, Vec<ThreadMessage>>>()
            .await
            .map_err(|e| MindrError::Serialization(e.to_string()))
    }
}

// =============================================================================
// Tests
// =============================================================================
