//! Backend HTTP client for token issuance and recording status.
//!
//! # Endpoints
//!
//! - `POST {base}/token` with `{identity, room}` returns `{token}`
//! - `GET {base}/recordings/{room_sid}` returns `{ready, url?}`
//!
//! # Security
//!
//! - The issued token is parsed straight into a `SecretString`
//! - Token values never appear in logs or error messages
//! - Timeouts prevent hanging connections

use crate::config::Config;
use crate::errors::{ClientError, CredentialError};
use crate::models::{RecordingStatus, TokenRequest, TokenResponse};

use async_trait::async_trait;
use common::secret::{ExposeSecret, SecretString};
use common::types::RoomSid;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

/// Connection timeout for backend requests.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Backend operations the session depends on (enables mocking).
#[async_trait]
pub trait BackendApi: Send + Sync {
    /// Request a short-lived room access token.
    async fn request_token(&self, identity: &str, room: &str)
        -> Result<SecretString, ClientError>;

    /// Query the recording status of a room.
    async fn recording_status(&self, room_sid: &RoomSid) -> Result<RecordingStatus, ClientError>;
}

/// HTTP client for the backend collaborator.
#[derive(Clone, Debug)]
pub struct BackendClient {
    /// HTTP client with configured timeouts.
    client: Client,

    /// Base URL without trailing slash.
    base_url: String,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Internal` if the HTTP client cannot be built.
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| {
                error!(target: "room.backend", error = %e, "Failed to build HTTP client");
                ClientError::Internal(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self { client, base_url })
    }

    /// Create a client from the room client configuration.
    pub fn from_config(config: &Config) -> Result<Self, ClientError> {
        Self::new(config.api_base_url.clone(), config.http_timeout)
    }

    /// Base URL requests are made against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl BackendApi for BackendClient {
    #[instrument(skip_all, fields(identity = %identity, room = %room))]
    async fn request_token(
        &self,
        identity: &str,
        room: &str,
    ) -> Result<SecretString, ClientError> {
        let url = format!("{}/token", self.base_url);

        debug!(target: "room.backend", url = %url, "Requesting room token");

        let request = TokenRequest {
            identity: identity.to_string(),
            room: room.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(target: "room.backend", error = %e, "Token request failed");
                CredentialError::Unavailable(e.to_string())
            })?;

        let status = response.status();

        if status.is_server_error() {
            warn!(target: "room.backend", status = %status, "Token service returned server error");
            return Err(CredentialError::Unavailable(format!("server error: {status}")).into());
        }

        if !status.is_success() {
            warn!(target: "room.backend", status = %status, "Token request rejected");
            return Err(CredentialError::Rejected {
                status: status.as_u16(),
            }
            .into());
        }

        let body: TokenResponse = response.json().await.map_err(|e| {
            warn!(target: "room.backend", error = %e, "Failed to parse token response");
            CredentialError::InvalidResponse(e.to_string())
        })?;

        match body.token {
            Some(token) if !token.expose_secret().is_empty() => {
                debug!(target: "room.backend", "Room token acquired");
                Ok(token)
            }
            _ => {
                warn!(target: "room.backend", "Token response carried no token");
                Err(CredentialError::MissingToken.into())
            }
        }
    }

    #[instrument(skip_all, fields(room_sid = %room_sid))]
    async fn recording_status(&self, room_sid: &RoomSid) -> Result<RecordingStatus, ClientError> {
        let url = format!("{}/recordings/{}", self.base_url, room_sid);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ClientError::Poll(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Poll(format!("unexpected status: {status}")));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Poll(format!("invalid response: {e}")))
    }
}

/// Mock backend module for testing.
///
/// This module provides a scripted `BackendApi` implementation for use in tests.
pub mod mock {

    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex, PoisonError};
    use tokio::sync::Notify;

    /// Scripted token outcome.
    #[derive(Debug, Clone)]
    pub enum TokenScript {
        Issue(String),
        Missing,
        Unavailable,
    }

    /// Mock backend for unit and integration tests.
    #[derive(Debug)]
    pub struct MockBackend {
        token: TokenScript,
        /// When set, token responses wait for `release_token`.
        token_gate: Option<Arc<Notify>>,
        /// Statuses returned in order; the last one repeats.
        statuses: Mutex<VecDeque<Result<RecordingStatus, String>>>,
        token_calls: AtomicUsize,
        status_calls: AtomicUsize,
    }

    impl MockBackend {
        /// Backend that issues `token` and reports recordings as not ready.
        pub fn issuing(token: &str) -> Self {
            Self {
                token: TokenScript::Issue(token.to_string()),
                token_gate: None,
                statuses: Mutex::new(VecDeque::new()),
                token_calls: AtomicUsize::new(0),
                status_calls: AtomicUsize::new(0),
            }
        }

        /// Backend whose token responses carry no token.
        pub fn without_token() -> Self {
            Self {
                token: TokenScript::Missing,
                ..Self::issuing("")
            }
        }

        /// Backend whose token endpoint is down.
        pub fn unavailable() -> Self {
            Self {
                token: TokenScript::Unavailable,
                ..Self::issuing("")
            }
        }

        /// Hold token responses until [`MockBackend::release_token`].
        #[must_use]
        pub fn with_token_gate(mut self) -> Self {
            self.token_gate = Some(Arc::new(Notify::new()));
            self
        }

        /// Queue recording statuses; `Err` entries simulate request failures.
        #[must_use]
        pub fn with_statuses(self, statuses: Vec<Result<RecordingStatus, String>>) -> Self {
            *self
                .statuses
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = statuses.into();
            self
        }

        /// Let one held token response through.
        pub fn release_token(&self) {
            if let Some(gate) = &self.token_gate {
                gate.notify_one();
            }
        }

        /// Number of token requests received.
        pub fn token_calls(&self) -> usize {
            self.token_calls.load(Ordering::SeqCst)
        }

        /// Number of recording status requests received.
        pub fn status_calls(&self) -> usize {
            self.status_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BackendApi for MockBackend {
        async fn request_token(
            &self,
            _identity: &str,
            _room: &str,
        ) -> Result<SecretString, ClientError> {
            self.token_calls.fetch_add(1, Ordering::SeqCst);

            if let Some(gate) = &self.token_gate {
                gate.notified().await;
            }

            match &self.token {
                TokenScript::Issue(token) => Ok(SecretString::from(token.as_str())),
                TokenScript::Missing => Err(CredentialError::MissingToken.into()),
                TokenScript::Unavailable => Err(CredentialError::Unavailable(
                    "mock token service down".to_string(),
                )
                .into()),
            }
        }

        async fn recording_status(
            &self,
            _room_sid: &RoomSid,
        ) -> Result<RecordingStatus, ClientError> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);

            let mut statuses = self
                .statuses
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let next = if statuses.len() > 1 {
                statuses.pop_front()
            } else {
                statuses.front().cloned()
            };

            match next {
                Some(Ok(status)) => Ok(status),
                Some(Err(reason)) => Err(ClientError::Poll(reason)),
                None => Ok(RecordingStatus {
                    ready: false,
                    url: None,
                }),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> BackendClient {
        BackendClient::new(server.uri(), Duration::from_secs(2)).unwrap()
    }

    // =========================================================================
    // Token Tests
    // =========================================================================

    #[tokio::test]
    async fn test_request_token_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_json(serde_json::json!({"identity": "alice", "room": "standup"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"token": "tok-1"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let token = client(&server)
            .request_token("alice", "standup")
            .await
            .unwrap();
        assert_eq!(token.expose_secret(), "tok-1");
    }

    #[tokio::test]
    async fn test_request_token_missing_token() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"error": "no"})),
            )
            .mount(&server)
            .await;

        let result = client(&server).request_token("alice", "standup").await;
        assert!(matches!(
            result,
            Err(ClientError::Credential(CredentialError::MissingToken))
        ));
    }

    #[tokio::test]
    async fn test_request_token_empty_token_is_missing() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"token": ""})),
            )
            .mount(&server)
            .await;

        let result = client(&server).request_token("alice", "standup").await;
        assert!(matches!(
            result,
            Err(ClientError::Credential(CredentialError::MissingToken))
        ));
    }

    #[tokio::test]
    async fn test_request_token_server_error_is_unavailable() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = client(&server).request_token("alice", "standup").await;
        assert!(matches!(
            result,
            Err(ClientError::Credential(CredentialError::Unavailable(_)))
        ));
    }

    #[tokio::test]
    async fn test_request_token_client_error_is_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let result = client(&server).request_token("alice", "standup").await;
        assert!(matches!(
            result,
            Err(ClientError::Credential(CredentialError::Rejected { status: 403 }))
        ));
    }

    #[tokio::test]
    async fn test_request_token_invalid_json() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let result = client(&server).request_token("alice", "standup").await;
        assert!(matches!(
            result,
            Err(ClientError::Credential(CredentialError::InvalidResponse(_)))
        ));
    }

    #[tokio::test]
    async fn test_request_token_unreachable() {
        // Nothing listens on port 9 of localhost
        let client = BackendClient::new(
            "http://127.0.0.1:9".to_string(),
            Duration::from_millis(500),
        )
        .unwrap();

        let result = client.request_token("alice", "standup").await;
        assert!(matches!(
            result,
            Err(ClientError::Credential(CredentialError::Unavailable(_)))
        ));
    }

    // =========================================================================
    // Recording Status Tests
    // =========================================================================

    #[tokio::test]
    async fn test_recording_status_ready() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/recordings/RM123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ready": true,
                "url": "/recordings-files/RM123.mp4"
            })))
            .mount(&server)
            .await;

        let status = client(&server)
            .recording_status(&RoomSid::from("RM123"))
            .await
            .unwrap();
        assert!(status.ready);
        assert_eq!(status.url.as_deref(), Some("/recordings-files/RM123.mp4"));
    }

    #[tokio::test]
    async fn test_recording_status_not_found_is_poll_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/recordings/RM404"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = client(&server)
            .recording_status(&RoomSid::from("RM404"))
            .await;
        assert!(matches!(result, Err(ClientError::Poll(_))));
    }

    // =========================================================================
    // Mock Backend Tests
    // =========================================================================

    #[tokio::test]
    async fn test_mock_statuses_repeat_last() {
        let backend = mock::MockBackend::issuing("t").with_statuses(vec![
            Err("boom".to_string()),
            Ok(RecordingStatus {
                ready: true,
                url: None,
            }),
        ]);
        let sid = RoomSid::from("RM1");

        assert!(backend.recording_status(&sid).await.is_err());
        assert!(backend.recording_status(&sid).await.unwrap().ready);
        assert!(backend.recording_status(&sid).await.unwrap().ready);
        assert_eq!(backend.status_calls(), 3);
    }
}
