//! Gmail OAuth2 authentication
//!
//! Implements the OAuth2 implicit grant. The authorization page runs in a
//! popup (the system browser), which is treated as a separate actor: it
//! lands on a callback URL carrying the token in its fragment, validates
//! the token against the identity endpoint and hands the resulting session
//! back to the window that started the login through a same-origin message
//! correlated by the OAuth `state` value.
//!
//! ```text
//! Idle -> AwaitingPopup -> ValidatingToken -> Authenticated
//!   \          \                 \
//!    `----------`-----------------`--> Failed
//! ```

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::api::UserInfo;
use super::transport::{HttpRequest, Transport};
use crate::config::OAuthConfig;
use crate::error::MailError;
use crate::models::{AccessToken, Session};
use crate::session::SessionProvider;

/// Provider authorization endpoint
pub const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Identity endpoint used to validate a fresh token
pub const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Read-only mail plus basic profile
pub const DEFAULT_SCOPES: &str = "https://www.googleapis.com/auth/gmail.readonly profile email";

/// `type` of the cross-window handoff message
pub const AUTH_RESULT_TYPE: &str = "auth_result";

/// How long a started login waits for the popup before failing
pub const LOGIN_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Delay between showing a failure and returning to the login entry point
pub const FAILURE_REDIRECT_DELAY: Duration = Duration::from_secs(3);

const REQUEST_ID_LEN: usize = 32;

/// Size of the authorization popup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopupFeatures {
    pub width: u32,
    pub height: u32,
}

impl Default for PopupFeatures {
    fn default() -> Self {
        Self {
            width: 500,
            height: 600,
        }
    }
}

/// Opens the authorization page
pub trait PopupOpener {
    fn open_popup(&self, url: &str, features: PopupFeatures) -> Result<(), String>;
}

/// Opens the authorization page in the system browser
///
/// The browser decides the window size; `features` is advisory only.
pub struct BrowserOpener;

impl PopupOpener for BrowserOpener {
    fn open_popup(&self, url: &str, features: PopupFeatures) -> Result<(), String> {
        debug!(
            "Opening authorization page ({}x{})",
            features.width, features.height
        );
        open::that(url).map_err(|e| e.to_string())
    }
}

/// A message delivered between windows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowMessage {
    /// Origin of the sending window
    pub origin: String,
    pub data: serde_json::Value,
}

/// Handoff of a validated session from the popup to its opener
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResultMessage {
    #[serde(rename = "type")]
    pub kind: String,
    /// Correlation id of the login request this answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub user: Session,
}

impl AuthResultMessage {
    pub fn new(state: Option<String>, user: Session) -> Self {
        Self {
            kind: AUTH_RESULT_TYPE.to_string(),
            state,
            user,
        }
    }
}

/// The window that opened the popup
pub trait OpenerChannel {
    /// Deliver `message` to the opener if its origin is `target_origin`
    fn post_message(&self, message: WindowMessage, target_origin: &str);
}

/// A started login waiting for the popup to report back
#[derive(Debug, Clone, PartialEq)]
pub struct AuthRequest {
    /// Correlation id, sent to the provider as `state`
    pub request_id: String,
    /// Authorization URL opened in the popup
    pub url: String,
    pub features: PopupFeatures,
    /// After this instant the login fails with a timeout
    pub deadline: DateTime<Utc>,
}

/// Where a login attempt stands
#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    Idle,
    AwaitingPopup(AuthRequest),
    ValidatingToken,
    Authenticated(Session),
    Failed(String),
}

/// Values the provider placed in the callback URL fragment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub access_token: Option<String>,
    pub expires_in: Option<u64>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Read the callback parameters from the URL fragment
///
/// Only the fragment is consulted: the implicit grant never puts
/// credentials in the path or query. Accepts a full URL or a bare
/// `#access_token=...` fragment.
pub fn parse_callback(callback_url: &str) -> CallbackParams {
    let trimmed = callback_url.trim();
    let fragment = match Url::parse(trimmed) {
        Ok(url) => url.fragment().unwrap_or_default().to_string(),
        Err(_) => trimmed.strip_prefix('#').unwrap_or_default().to_string(),
    };

    let mut params = CallbackParams::default();
    for (key, value) in url::form_urlencoded::parse(fragment.as_bytes()) {
        match key.as_ref() {
            "access_token" if !value.is_empty() => params.access_token = Some(value.into_owned()),
            "expires_in" => params.expires_in = value.parse().ok(),
            "state" => params.state = Some(value.into_owned()),
            "error" => params.error = Some(value.into_owned()),
            _ => {}
        }
    }
    params
}

/// Validates tokens against the provider's identity endpoint
#[derive(Clone)]
pub struct IdentityClient {
    transport: Transport,
    userinfo_url: String,
}

impl IdentityClient {
    pub fn new(transport: Transport) -> Self {
        Self {
            transport,
            userinfo_url: USERINFO_URL.to_string(),
        }
    }

    pub fn with_userinfo_url(mut self, url: impl Into<String>) -> Self {
        self.userinfo_url = url.into();
        self
    }

    /// One authenticated identity call; never retried
    pub fn fetch_user(&self, token: &AccessToken) -> Result<UserInfo, MailError> {
        let response = self
            .transport
            .request_once(&HttpRequest::get(&self.userinfo_url, token))?;
        response.json()
    }

    /// Turn callback parameters into a session
    ///
    /// Fails without any network call when the fragment carries an error or
    /// no token.
    pub fn authenticate(&self, params: &CallbackParams) -> Result<Session, String> {
        if let Some(error) = &params.error {
            return Err(format!("Authorization denied: {}", error));
        }
        let Some(token) = params.access_token.as_deref() else {
            return Err("No access token received".to_string());
        };

        let token = AccessToken::new(token);
        let user = self
            .fetch_user(&token)
            .map_err(|e| format!("Token validation failed: {}", e))?;

        let now_ms = Utc::now().timestamp_millis();
        Ok(Session {
            id: user.id,
            display_name: user.name,
            email: user.email,
            picture_url: user.picture,
            access_token: token,
            expires_at: params
                .expires_in
                .map(|secs| now_ms.saturating_add((secs as i64).saturating_mul(1000))),
        })
    }
}

/// Result of handling the callback inside the popup
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackOutcome {
    /// Session handed to the opener window; the popup can close
    PostedToOpener,
    /// No opener: session stored directly; navigate to the main view
    Persisted(Session),
    /// Show `reason`, then return to login after `redirect_after`
    Failed {
        reason: String,
        redirect_after: Duration,
    },
}

/// The popup side of the login
pub struct AuthCallback {
    identity: IdentityClient,
    sessions: Arc<dyn SessionProvider>,
}

impl AuthCallback {
    pub fn new(identity: IdentityClient, sessions: Arc<dyn SessionProvider>) -> Self {
        Self { identity, sessions }
    }

    /// Validate the callback and hand the session to the opener
    ///
    /// The handoff targets the popup's own origin, which is the app origin
    /// since the callback route belongs to the app.
    pub fn process(&self, callback_url: &str, opener: Option<&dyn OpenerChannel>) -> CallbackOutcome {
        let params = parse_callback(callback_url);

        let session = match self.identity.authenticate(&params) {
            Ok(session) => session,
            Err(reason) => {
                warn!("Authentication callback failed: {}", reason);
                return CallbackOutcome::Failed {
                    reason,
                    redirect_after: FAILURE_REDIRECT_DELAY,
                };
            }
        };

        info!("Authenticated as {}", session.email);

        match opener {
            Some(opener) => {
                let origin = callback_origin(callback_url);
                let message = AuthResultMessage::new(params.state, session);
                match serde_json::to_value(&message) {
                    Ok(data) => {
                        opener.post_message(
                            WindowMessage {
                                origin: origin.clone(),
                                data,
                            },
                            &origin,
                        );
                        CallbackOutcome::PostedToOpener
                    }
                    Err(e) => CallbackOutcome::Failed {
                        reason: format!("Could not hand off session: {}", e),
                        redirect_after: FAILURE_REDIRECT_DELAY,
                    },
                }
            }
            None => {
                self.sessions.set(session.clone());
                CallbackOutcome::Persisted(session)
            }
        }
    }
}

fn callback_origin(callback_url: &str) -> String {
    Url::parse(callback_url.trim())
        .map(|u| u.origin().ascii_serialization())
        .unwrap_or_default()
}

/// The opener side of the login
pub struct AuthFlow {
    config: OAuthConfig,
    identity: IdentityClient,
    sessions: Arc<dyn SessionProvider>,
    state: AuthState,
}

impl AuthFlow {
    pub fn new(
        config: OAuthConfig,
        identity: IdentityClient,
        sessions: Arc<dyn SessionProvider>,
    ) -> Self {
        Self {
            config,
            identity,
            sessions,
            state: AuthState::Idle,
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// The current non-expired session, if any
    pub fn session(&self) -> Option<Session> {
        self.sessions.current()
    }

    /// Build the authorization URL for a request id
    pub fn authorization_url(&self, request_id: &str) -> Result<String, MailError> {
        let redirect_uri = self.config.redirect_uri();
        let url = Url::parse_with_params(
            AUTH_URL,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
                ("response_type", "token"),
                ("scope", self.config.scopes.as_str()),
                ("prompt", "select_account"),
                ("state", request_id),
            ],
        )
        .map_err(|e| MailError::Auth(format!("Invalid authorization URL: {}", e)))?;
        Ok(url.into())
    }

    /// Start a login by opening the authorization popup
    ///
    /// Any login already pending is abandoned; its late answer will not
    /// match the new request id.
    pub fn begin(&mut self, opener: &dyn PopupOpener) -> Result<AuthRequest, MailError> {
        let request_id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(REQUEST_ID_LEN)
            .map(char::from)
            .collect();

        let url = self.authorization_url(&request_id)?;
        let request = AuthRequest {
            request_id,
            url,
            features: PopupFeatures::default(),
            deadline: Utc::now()
                + chrono::Duration::from_std(LOGIN_TIMEOUT).unwrap_or(chrono::Duration::zero()),
        };

        if let Err(e) = opener.open_popup(&request.url, request.features) {
            warn!("Could not open authorization popup: {}", e);
            return Err(self.fail("Failed to open popup window for authentication"));
        }

        info!("Waiting for authorization (request {})", request.request_id);
        self.state = AuthState::AwaitingPopup(request.clone());
        Ok(request)
    }

    /// Complete the login from a callback URL handled in this window
    ///
    /// Used when the popup has no opener to post to: the session is
    /// persisted directly.
    pub fn handle_redirect(&mut self, callback_url: &str) -> &AuthState {
        let AuthState::AwaitingPopup(pending) = &self.state else {
            self.fail("No login in progress");
            return &self.state;
        };

        let params = parse_callback(callback_url);
        if params.error.is_none()
            && params.access_token.is_some()
            && params.state.as_deref() != Some(pending.request_id.as_str())
        {
            self.fail("Authentication response did not match the pending request");
            return &self.state;
        }

        if params.error.is_some() || params.access_token.is_none() {
            if let Err(reason) = self.identity.authenticate(&params) {
                self.fail(&reason);
            }
            return &self.state;
        }

        self.state = AuthState::ValidatingToken;
        match self.identity.authenticate(&params) {
            Ok(session) => self.complete(session),
            Err(reason) => {
                self.fail(&reason);
            }
        }
        &self.state
    }

    /// Accept the popup's handoff message
    ///
    /// Messages from another origin, of another type, or for another
    /// request are ignored. Returns whether the message was accepted.
    pub fn receive(&mut self, message: &WindowMessage) -> bool {
        let AuthState::AwaitingPopup(pending) = &self.state else {
            return false;
        };

        if message.origin != self.config.app_origin {
            debug!("Ignoring message from foreign origin {}", message.origin);
            return false;
        }

        let Ok(result) = serde_json::from_value::<AuthResultMessage>(message.data.clone()) else {
            return false;
        };
        if result.kind != AUTH_RESULT_TYPE
            || result.state.as_deref() != Some(pending.request_id.as_str())
        {
            debug!("Ignoring message for another request");
            return false;
        }

        self.complete(result.user);
        true
    }

    /// Fail a pending login whose deadline has passed
    pub fn check_timeout(&mut self, now: DateTime<Utc>) -> bool {
        match &self.state {
            AuthState::AwaitingPopup(pending) if now >= pending.deadline => {
                self.fail("Authentication timed out");
                true
            }
            _ => false,
        }
    }

    /// Delay before returning to the login entry point after a failure
    pub fn redirect_after(&self) -> Option<Duration> {
        matches!(self.state, AuthState::Failed(_)).then_some(FAILURE_REDIRECT_DELAY)
    }

    /// Return to the login entry point after a failure
    pub fn reset(&mut self) {
        if matches!(self.state, AuthState::Failed(_)) {
            self.state = AuthState::Idle;
        }
    }

    /// Sign out locally; the token is not revoked
    pub fn logout(&mut self) {
        self.sessions.clear();
        self.state = AuthState::Idle;
        info!("Logged out");
    }

    fn complete(&mut self, session: Session) {
        info!("Welcome, {}", session.display_name);
        self.sessions.set(session.clone());
        self.state = AuthState::Authenticated(session);
    }

    fn fail(&mut self, reason: &str) -> MailError {
        warn!("Authentication failed: {}", reason);
        self.state = AuthState::Failed(reason.to_string());
        MailError::Auth(reason.to_string())
    }
}
