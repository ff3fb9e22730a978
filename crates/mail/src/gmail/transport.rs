//! Authenticated HTTP transport with retry
//!
//! Every call to the provider goes through [`Transport::request`]. The
//! network itself sits behind the [`HttpBackend`] trait so the retry and
//! token rules can be exercised without a live server. The production
//! backend uses synchronous HTTP (ureq) to stay executor-agnostic.

use log::{debug, warn};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use super::api::ErrorResponse;
use crate::error::MailError;
use crate::models::AccessToken;

/// Retries after the first attempt for non-401 failures
pub const MAX_RETRIES: u32 = 3;

/// Fixed wait between attempts
pub const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// HTTP methods used by the Gmail API surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// A single authenticated request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub token: AccessToken,
    /// JSON body, sent with `Content-Type: application/json`
    pub body: Option<serde_json::Value>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>, token: &AccessToken) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            token: token.clone(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, token: &AccessToken, body: serde_json::Value) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            token: token.clone(),
            body: Some(body),
        }
    }

    /// Value of the Authorization header
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.token.secret())
    }
}

/// Status and body of a completed HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, MailError> {
        serde_json::from_str(&self.body).map_err(|e| MailError::Decode {
            message: e.to_string(),
        })
    }

    /// Human-readable failure reason, preferring the provider's own message
    fn error_message(&self) -> String {
        serde_json::from_str::<ErrorResponse>(&self.body)
            .ok()
            .map(|e| e.error.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("Request failed with status {}", self.status))
    }
}

/// Connection-level failure (DNS, TLS, refused, timed out)
#[derive(Debug, Clone, thiserror::Error)]
#[error("Network error: {0}")]
pub struct NetworkError(pub String);

/// Sends one HTTP request; never retries on its own
///
/// Any HTTP status, including errors, is an `Ok` response. `Err` is
/// reserved for failures where no status was received.
pub trait HttpBackend: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, NetworkError>;
}

/// Production backend over a shared ureq agent
pub struct UreqBackend {
    agent: ureq::Agent,
}

impl UreqBackend {
    /// Per-request ceiling so a stalled connection still consumes a retry
    const TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new() -> Self {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(Self::TIMEOUT))
            .build();

        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl Default for UreqBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpBackend for UreqBackend {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, NetworkError> {
        let authorization = request.authorization();

        let result = match (request.method, &request.body) {
            (HttpMethod::Get, _) => self
                .agent
                .get(&request.url)
                .header("Authorization", &authorization)
                .call(),
            (HttpMethod::Post, Some(body)) => self
                .agent
                .post(&request.url)
                .header("Authorization", &authorization)
                .send_json(body),
            (HttpMethod::Post, None) => self
                .agent
                .post(&request.url)
                .header("Authorization", &authorization)
                .send_empty(),
        };

        let mut response = result.map_err(|e| NetworkError(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| NetworkError(e.to_string()))?;

        Ok(HttpResponse { status, body })
    }
}

/// Resilience layer wrapping every authenticated call
///
/// Holds no mutable state, so one transport can serve concurrent requests.
#[derive(Clone)]
pub struct Transport {
    backend: Arc<dyn HttpBackend>,
    max_retries: u32,
    backoff: Duration,
}

impl Transport {
    pub fn new(backend: Arc<dyn HttpBackend>) -> Self {
        Self {
            backend,
            max_retries: MAX_RETRIES,
            backoff: RETRY_BACKOFF,
        }
    }

    /// Transport over the real network
    pub fn ureq() -> Self {
        Self::new(Arc::new(UreqBackend::new()))
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Send a request, retrying transient failures up to the configured limit
    pub fn request(&self, request: &HttpRequest) -> Result<HttpResponse, MailError> {
        self.request_with_retries(request, self.max_retries)
    }

    /// Send a request exactly once
    pub fn request_once(&self, request: &HttpRequest) -> Result<HttpResponse, MailError> {
        self.request_with_retries(request, 0)
    }

    /// Send a request with an explicit retry budget
    ///
    /// - An empty token fails with `Unauthenticated` before any network call.
    /// - A 401 fails immediately with `SessionExpired`.
    /// - Other non-success statuses and network errors consume one retry
    ///   after waiting the backoff interval.
    /// - With no retries left the last failure is returned as
    ///   `ApiRequestFailed`.
    pub fn request_with_retries(
        &self,
        request: &HttpRequest,
        mut retries_left: u32,
    ) -> Result<HttpResponse, MailError> {
        if request.token.is_empty() {
            return Err(MailError::Unauthenticated);
        }

        loop {
            debug!("{:?} {}", request.method, request.url);

            let (status, message) = match self.backend.execute(request) {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(response) if response.status == 401 => {
                    warn!("Token rejected by {} (401)", request.url);
                    return Err(MailError::SessionExpired);
                }
                Ok(response) => (Some(response.status), response.error_message()),
                Err(e) => (None, e.to_string()),
            };

            if retries_left == 0 {
                return Err(MailError::ApiRequestFailed { status, message });
            }

            warn!(
                "Request to {} failed ({}), retrying in {:?} ({} retries left)",
                request.url, message, self.backoff, retries_left
            );
            std::thread::sleep(self.backoff);
            retries_left -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays a fixed sequence of outcomes and counts calls
    struct ScriptedBackend {
        outcomes: Mutex<VecDeque<Result<HttpResponse, NetworkError>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedBackend {
        fn new(outcomes: Vec<Result<HttpResponse, NetworkError>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    impl HttpBackend for ScriptedBackend {
        fn execute(&self, _request: &HttpRequest) -> Result<HttpResponse, NetworkError> {
            *self.calls.lock().unwrap() += 1;
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(HttpResponse::new(500, "")))
        }
    }

    fn transport(backend: Arc<ScriptedBackend>) -> Transport {
        Transport::new(backend).with_backoff(Duration::ZERO)
    }

    fn request() -> HttpRequest {
        HttpRequest::get("https://example.com/messages", &AccessToken::new("token"))
    }

    #[test]
    fn test_success_on_first_attempt() {
        let backend = ScriptedBackend::new(vec![Ok(HttpResponse::new(200, "{}"))]);
        let response = transport(backend.clone()).request(&request()).unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(backend.calls(), 1);
    }

    #[test]
    fn test_empty_token_makes_no_call() {
        let backend = ScriptedBackend::new(vec![]);
        let req = HttpRequest::get("https://example.com", &AccessToken::new(""));
        let err = transport(backend.clone()).request(&req).unwrap_err();
        assert_eq!(err, MailError::Unauthenticated);
        assert_eq!(backend.calls(), 0);
    }

    #[test]
    fn test_unauthorized_is_never_retried() {
        let backend = ScriptedBackend::new(vec![Ok(HttpResponse::new(401, ""))]);
        let err = transport(backend.clone()).request(&request()).unwrap_err();
        assert_eq!(err, MailError::SessionExpired);
        assert_eq!(backend.calls(), 1);
    }

    #[test]
    fn test_server_errors_exhaust_retries() {
        let backend = ScriptedBackend::new(vec![]);
        let err = transport(backend.clone()).request(&request()).unwrap_err();
        assert_eq!(backend.calls(), 1 + MAX_RETRIES);
        assert_eq!(err.status(), Some(500));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_network_errors_exhaust_retries() {
        let backend = ScriptedBackend::new(
            (0..=MAX_RETRIES)
                .map(|_| Err(NetworkError("connection refused".to_string())))
                .collect(),
        );
        let err = transport(backend.clone()).request(&request()).unwrap_err();
        assert_eq!(backend.calls(), 1 + MAX_RETRIES);
        match err {
            MailError::ApiRequestFailed { status, message } => {
                assert_eq!(status, None);
                assert!(message.contains("connection refused"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_recovers_after_transient_failure() {
        let backend = ScriptedBackend::new(vec![
            Ok(HttpResponse::new(503, "")),
            Err(NetworkError("reset".to_string())),
            Ok(HttpResponse::new(200, "ok")),
        ]);
        let response = transport(backend.clone()).request(&request()).unwrap();
        assert_eq!(response.body, "ok");
        assert_eq!(backend.calls(), 3);
    }

    #[test]
    fn test_unauthorized_after_retry_stops() {
        let backend = ScriptedBackend::new(vec![
            Ok(HttpResponse::new(500, "")),
            Ok(HttpResponse::new(401, "")),
        ]);
        let err = transport(backend.clone()).request(&request()).unwrap_err();
        assert_eq!(err, MailError::SessionExpired);
        assert_eq!(backend.calls(), 2);
    }

    #[test]
    fn test_request_once() {
        let backend = ScriptedBackend::new(vec![]);
        let err = transport(backend.clone()).request_once(&request()).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(backend.calls(), 1);
    }

    #[test]
    fn test_provider_error_message_is_used() {
        let body = r#"{"error": {"code": 404, "message": "Requested entity was not found."}}"#;
        let backend = ScriptedBackend::new(vec![Ok(HttpResponse::new(404, body))]);
        let err = transport(backend.clone())
            .with_max_retries(0)
            .request(&request())
            .unwrap_err();
        assert_eq!(err.to_string(), "Requested entity was not found.");
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_authorization_header() {
        assert_eq!(request().authorization(), "Bearer token");
    }
}
