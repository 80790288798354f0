//! Credential backend HTTP client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::provider::{CredentialError, CredentialProvider};
use super::types::{Credentials, ErrorBody};

/// Path of the authenticate operation, relative to the base URL
const AUTHENTICATE_PATH: &str = "/authenticate";

/// Default connection timeout
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Default request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Successful response of the authenticate operation
#[derive(Debug, Deserialize)]
struct AuthenticateResponse {
    #[serde(default)]
    token: String,
    #[serde(default)]
    endpoint: String,
}

/// Client for the backend that exchanges the caller's identity for widget credentials
#[derive(Debug, Clone)]
pub struct AuthClient {
    http: Client,
    base_url: String,
    session_token: Option<String>,
    timeout: Duration,
}

impl AuthClient {
    /// Create a client for the backend at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: build_http(REQUEST_TIMEOUT),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session_token: None,
            timeout: REQUEST_TIMEOUT,
        }
    }

    /// Set the ambient session token sent as a bearer credential
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    /// Override the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = build_http(timeout);
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, AUTHENTICATE_PATH);
        let mut req = self.http.post(&url);

        if let Some(token) = &self.session_token {
            req = req.bearer_auth(token);
        }

        req
    }

    /// Exchange the ambient identity for a fresh credential pair
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    pub async fn authenticate(&self) -> Result<Credentials, CredentialError> {
        debug!("Requesting widget credentials");

        let resp = self.request().send().await.map_err(|e| {
            if e.is_timeout() {
                warn!("Credential request timed out after {:?}", self.timeout);
            } else {
                warn!("Credential request failed: {:?}", e);
            }
            CredentialError::generic()
        })?;

        let status = resp.status();
        debug!("Response status: {}", status);

        let bytes = resp.bytes().await.map_err(|e| {
            warn!("Failed to read credential response: {:?}", e);
            CredentialError::generic()
        })?;

        if !status.is_success() {
            let body = serde_json::from_slice::<ErrorBody>(&bytes).ok();
            let err = CredentialError::from_body(body.as_ref());
            warn!("Backend rejected credential request (HTTP {}): {}", status.as_u16(), err);
            return Err(err);
        }

        let parsed: AuthenticateResponse = serde_json::from_slice(&bytes).map_err(|e| {
            warn!("Malformed credential response: {}", e);
            CredentialError::generic()
        })?;

        if parsed.token.is_empty() || parsed.endpoint.is_empty() {
            warn!("Credential response is missing token or endpoint");
            return Err(CredentialError::generic());
        }

        Ok(Credentials::new(parsed.token, parsed.endpoint))
    }
}

#[async_trait]
impl CredentialProvider for AuthClient {
    async fn fetch(&self) -> Result<Credentials, CredentialError> {
        self.authenticate().await
    }
}

fn build_http(timeout: Duration) -> Client {
    Client::builder()
        .connect_timeout(CONNECTION_TIMEOUT)
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            warn!("Falling back to default HTTP client: {}", e);
            Client::new()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    async fn spawn_backend(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn backend(status: StatusCode, body: Value) -> Router {
        Router::new().route(
            "/authenticate",
            post(move || {
                let body = body.clone();
                async move { (status, Json(body)) }
            }),
        )
    }

    #[test]
    fn test_client_creation() {
        let client = AuthClient::new("https://auth.example.com/");
        assert_eq!(client.base_url(), "https://auth.example.com");
        assert!(client.session_token.is_none());

        let client = client.with_session_token("sid-1");
        assert_eq!(client.session_token.as_deref(), Some("sid-1"));
    }

    #[tokio::test]
    async fn test_authenticate_success_sends_bearer() {
        let router = Router::new().route(
            "/authenticate",
            post(|headers: HeaderMap| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                if auth == "Bearer sid-1" {
                    (StatusCode::OK, Json(json!({"token": "t1", "endpoint": "https://e1"})))
                } else {
                    (StatusCode::UNAUTHORIZED, Json(json!({"message": "no session"})))
                }
            }),
        );
        let base = spawn_backend(router).await;

        let creds = AuthClient::new(&base)
            .with_session_token("sid-1")
            .fetch()
            .await
            .unwrap();
        assert_eq!(creds, Credentials::new("t1", "https://e1"));

        let err = AuthClient::new(&base).fetch().await.unwrap_err();
        assert_eq!(err.message(), "no session");
    }

    #[tokio::test]
    async fn test_authenticate_structured_error_messages() {
        let base = spawn_backend(backend(
            StatusCode::BAD_REQUEST,
            json!({"body": {"message": "expired session"}}),
        ))
        .await;
        let err = AuthClient::new(&base).fetch().await.unwrap_err();
        assert_eq!(err.message(), "expired session");

        let base = spawn_backend(backend(StatusCode::INTERNAL_SERVER_ERROR, json!({"status": 500}))).await;
        let err = AuthClient::new(&base).fetch().await.unwrap_err();
        assert_eq!(err.message(), "Load failed");
    }

    #[tokio::test]
    async fn test_authenticate_rejects_incomplete_credentials() {
        let base = spawn_backend(backend(StatusCode::OK, json!({"token": "t1"}))).await;
        let err = AuthClient::new(&base).fetch().await.unwrap_err();
        assert_eq!(err.message(), "Load failed");
    }

    #[tokio::test]
    async fn test_authenticate_malformed_response() {
        let router = Router::new().route("/authenticate", post(|| async { "<html>maintenance</html>" }));
        let base = spawn_backend(router).await;

        let err = AuthClient::new(&base).fetch().await.unwrap_err();
        assert_eq!(err, CredentialError::generic());
    }

    #[tokio::test]
    async fn test_authenticate_unreachable_backend() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = AuthClient::new(format!("http://{}", addr))
            .with_timeout(Duration::from_secs(1))
            .fetch()
            .await
            .unwrap_err();
        assert_eq!(err, CredentialError::generic());
    }
}
