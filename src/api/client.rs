//! Backend API Client - HTTP communication with the sync backend
//!
//! Handles all REST calls the dashboard makes:
//! - Sync status and history
//! - Manual sync trigger
//! - Credential load/save
//! - FreeAgent OAuth authorize/disconnect

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::Url;

use super::models::{
    AuthorizeResponse, CredentialsForm, HealthResponse, ManualSyncResponse, StoredCredentials,
    SyncLogEntry, SyncStatus,
};

/// Operations the views need from the backend.
///
/// Implemented over HTTP by [`HttpBackendClient`]; tests substitute an
/// in-process fake.
#[async_trait]
pub trait BackendClient: Send + Sync {
    async fn sync_status(&self) -> Result<SyncStatus, ApiError>;

    /// Most recent entries first, at most `limit`
    async fn sync_logs(&self, limit: u32) -> Result<Vec<SyncLogEntry>, ApiError>;

    async fn trigger_manual_sync(&self) -> Result<ManualSyncResponse, ApiError>;

    /// `None` when nothing has been stored yet
    async fn credentials(&self) -> Result<Option<StoredCredentials>, ApiError>;

    async fn save_credentials(&self, form: &CredentialsForm) -> Result<(), ApiError>;

    /// URL of the provider's consent page
    async fn authorize_url(&self) -> Result<String, ApiError>;

    async fn disconnect(&self) -> Result<(), ApiError>;

    async fn health(&self) -> Result<HealthResponse, ApiError>;
}

/// reqwest-backed client rooted at `{backend_url}/api`
pub struct HttpBackendClient {
    client: Client,
    api_base: String,
}

impl HttpBackendClient {
    pub fn new(backend_url: &Url) -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent(concat!("whmcs-sync-dashboard/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_base: format!("{}/api", backend_url.as_str().trim_end_matches('/')),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }
}

#[async_trait]
impl BackendClient for HttpBackendClient {
    async fn sync_status(&self) -> Result<SyncStatus, ApiError> {
        let response = self.client
            .get(self.endpoint("sync/status"))
            .send()
            .await?;

        handle_response(response).await
    }

    async fn sync_logs(&self, limit: u32) -> Result<Vec<SyncLogEntry>, ApiError> {
        let response = self.client
            .get(self.endpoint("sync/logs"))
            .query(&[("limit", limit)])
            .send()
            .await?;

        handle_response(response).await
    }

    async fn trigger_manual_sync(&self) -> Result<ManualSyncResponse, ApiError> {
        let response = self.client
            .post(self.endpoint("sync/manual"))
            .send()
            .await?;

        handle_response(response).await
    }

    async fn credentials(&self) -> Result<Option<StoredCredentials>, ApiError> {
        let response = self.client
            .get(self.endpoint("settings/credentials"))
            .send()
            .await?;

        handle_response(response).await
    }

    async fn save_credentials(&self, form: &CredentialsForm) -> Result<(), ApiError> {
        let response = self.client
            .post(self.endpoint("settings/credentials"))
            .json(form)
            .send()
            .await?;

        handle_empty(response).await
    }

    async fn authorize_url(&self) -> Result<String, ApiError> {
        let response = self.client
            .get(self.endpoint("oauth/freeagent/authorize"))
            .send()
            .await?;

        let body: AuthorizeResponse = handle_response(response).await?;
        Ok(body.authorization_url)
    }

    async fn disconnect(&self) -> Result<(), ApiError> {
        let response = self.client
            .post(self.endpoint("oauth/freeagent/disconnect"))
            .send()
            .await?;

        handle_empty(response).await
    }

    async fn health(&self) -> Result<HealthResponse, ApiError> {
        let response = self.client
            .get(self.endpoint("health"))
            .send()
            .await?;

        handle_response(response).await
    }
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Backend returned {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Backend {
        status: StatusCode,
        detail: Option<String>,
    },

    #[error("Invalid response from backend")]
    InvalidResponse,
}

impl ApiError {
    /// Backend-provided detail when there is one, otherwise `fallback`
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Backend { detail: Some(detail), .. } if !detail.is_empty() => detail.clone(),
            _ => fallback.to_string(),
        }
    }
}

/// Handle successful JSON response
async fn handle_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ApiError> {
    let status = response.status();

    if status.is_success() {
        response.json::<T>().await.map_err(|e| {
            log::warn!("Undecodable {} response body: {}", status, e);
            ApiError::InvalidResponse
        })
    } else {
        Err(handle_error(response).await)
    }
}

/// Success check for endpoints whose body the dashboard ignores
async fn handle_empty(response: reqwest::Response) -> Result<(), ApiError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(handle_error(response).await)
    }
}

/// Convert error response to ApiError
async fn handle_error(response: reqwest::Response) -> ApiError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    ApiError::Backend {
        status,
        detail: extract_detail(&body),
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

/// `detail` is a string for `HTTPException`, and a list of
/// `{loc, msg, type}` objects for request validation failures.
fn extract_detail(body: &str) -> Option<String> {
    let parsed: ErrorResponse = serde_json::from_str(body).ok()?;

    match parsed.detail? {
        serde_json::Value::String(detail) => Some(detail),
        serde_json::Value::Array(items) => {
            let messages: Vec<String> = items
                .iter()
                .map(|item| match item.get("msg").and_then(|m| m.as_str()) {
                    Some(msg) => {
                        let location = item
                            .get("loc")
                            .and_then(|loc| loc.as_array())
                            .map(|parts| {
                                parts
                                    .iter()
                                    .map(|p| match p {
                                        serde_json::Value::String(s) => s.clone(),
                                        other => other.to_string(),
                                    })
                                    .collect::<Vec<_>>()
                                    .join(".")
                            })
                            .unwrap_or_default();
                        if location.is_empty() {
                            msg.to_string()
                        } else {
                            format!("{}: {}", location, msg)
                        }
                    }
                    None => item.to_string(),
                })
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{CredentialField, LogStatus};
    use mockito::{Matcher, Server};

    fn client_for(server: &Server) -> HttpBackendClient {
        let url = Url::parse(&server.url()).unwrap();
        HttpBackendClient::new(&url).unwrap()
    }

    #[test]
    fn test_endpoint_joins_api_prefix() {
        let url = Url::parse("http://localhost:8001/").unwrap();
        let client = HttpBackendClient::new(&url).unwrap();
        assert_eq!(client.endpoint("sync/status"), "http://localhost:8001/api/sync/status");

        let url = Url::parse("https://sync.example.com/backend").unwrap();
        let client = HttpBackendClient::new(&url).unwrap();
        assert_eq!(
            client.endpoint("health"),
            "https://sync.example.com/backend/api/health"
        );
    }

    #[test]
    fn test_extract_detail_variants() {
        assert_eq!(
            extract_detail(r#"{"detail": "Sync is already running"}"#).as_deref(),
            Some("Sync is already running")
        );
        assert_eq!(
            extract_detail(
                r#"{"detail": [{"loc": ["body", "whmcs_url"], "msg": "field required", "type": "value_error.missing"}]}"#
            )
            .as_deref(),
            Some("body.whmcs_url: field required")
        );
        assert_eq!(extract_detail(r#"{"detail": null}"#), None);
        assert_eq!(extract_detail("Internal Server Error"), None);
        assert_eq!(extract_detail(r#"{"error": "nope"}"#), None);
    }

    #[test]
    fn test_user_message_fallback() {
        let with_detail = ApiError::Backend {
            status: StatusCode::BAD_REQUEST,
            detail: Some("FreeAgent not connected".to_string()),
        };
        assert_eq!(with_detail.user_message("Sync failed"), "FreeAgent not connected");

        let without = ApiError::Backend {
            status: StatusCode::BAD_GATEWAY,
            detail: None,
        };
        assert_eq!(without.user_message("Sync failed"), "Sync failed");
        assert_eq!(ApiError::InvalidResponse.user_message("Sync failed"), "Sync failed");
    }

    #[tokio::test]
    async fn test_sync_status_request() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/sync/status")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"is_running": true, "last_sync": null, "last_sync_status": null, "next_sync": "Every hour at :00"}"#,
            )
            .create_async()
            .await;

        let status = client_for(&server).sync_status().await.unwrap();
        assert!(status.is_running);
        assert_eq!(status.next_sync.as_deref(), Some("Every hour at :00"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_sync_logs_sends_limit() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/sync/logs")
            .match_query(Matcher::UrlEncoded("limit".into(), "5".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[
                    {"id": "2", "sync_type": "manual", "status": "error", "timestamp": "2024-03-02T09:00:00",
                     "message": "Sync failed: boom", "errors": ["boom"]},
                    {"id": "1", "sync_type": "automatic", "status": "success", "timestamp": "2024-03-01T09:00:00",
                     "invoices_processed": 4, "invoices_created": 2, "clients_created": 1, "payments_synced": 0,
                     "errors": [], "message": "Successfully synced 2 invoices"}
                ]"#,
            )
            .create_async()
            .await;

        let logs = client_for(&server).sync_logs(5).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].id, "2");
        assert_eq!(logs[0].status, LogStatus::Error);
        assert_eq!(logs[0].errors, vec!["boom".to_string()]);
        assert_eq!(logs[1].invoices_created, 2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_manual_sync_error_detail() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/sync/manual")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"detail": "Sync is already running"}"#)
            .create_async()
            .await;

        let err = client_for(&server).trigger_manual_sync().await.unwrap_err();
        match &err {
            ApiError::Backend { status, detail } => {
                assert_eq!(*status, StatusCode::BAD_REQUEST);
                assert_eq!(detail.as_deref(), Some("Sync is already running"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(err.user_message("Failed to trigger sync"), "Sync is already running");
    }

    #[tokio::test]
    async fn test_manual_sync_success_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/sync/manual")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"status": "success", "result": {"invoices_processed": 3, "invoices_created": 1,
                    "clients_created": 0, "errors": [], "message": "Successfully synced 1 invoices and created 0 new contacts"}}"#,
            )
            .create_async()
            .await;

        let response = client_for(&server).trigger_manual_sync().await.unwrap();
        assert_eq!(
            response.result.message,
            "Successfully synced 1 invoices and created 0 new contacts"
        );
        assert_eq!(response.result.invoices_processed, 3);
    }

    #[tokio::test]
    async fn test_credentials_null_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/settings/credentials")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("null")
            .create_async()
            .await;

        let creds = client_for(&server).credentials().await.unwrap();
        assert!(creds.is_none());
    }

    #[tokio::test]
    async fn test_save_credentials_posts_form() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/settings/credentials")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "whmcs_url": "https://billing.example.com",
                "whmcs_secret": "s3cret"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status": "success", "message": "Credentials saved successfully"}"#)
            .create_async()
            .await;

        let mut form = CredentialsForm::default();
        form.set(CredentialField::WhmcsUrl, "https://billing.example.com".into());
        form.set(CredentialField::WhmcsSecret, "s3cret".into());

        client_for(&server).save_credentials(&form).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_authorize_url() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/oauth/freeagent/authorize")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"authorization_url": "https://api.freeagent.com/v2/approve_app?client_id=abc"}"#)
            .create_async()
            .await;

        let url = client_for(&server).authorize_url().await.unwrap();
        assert_eq!(url, "https://api.freeagent.com/v2/approve_app?client_id=abc");
    }

    #[tokio::test]
    async fn test_disconnect_server_error_without_detail() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/oauth/freeagent/disconnect")
            .with_status(500)
            .with_body("Internal Server Error")
            .create_async()
            .await;

        let err = client_for(&server).disconnect().await.unwrap_err();
        assert!(matches!(err, ApiError::Backend { detail: None, .. }));
        assert_eq!(err.user_message("Failed to disconnect"), "Failed to disconnect");
    }

    #[tokio::test]
    async fn test_invalid_success_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/sync/status")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("<html>proxy page</html>")
            .create_async()
            .await;

        let err = client_for(&server).sync_status().await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse));
    }
}
