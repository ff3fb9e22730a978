//! Error taxonomy for the mail integration layer

use serde::Serialize;

/// Errors surfaced by the transport, the mail client and the auth flow
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MailError {
    /// No access token was available; no request was made
    #[error("Authentication required")]
    Unauthenticated,

    /// The provider rejected the token (HTTP 401); never retried
    #[error("Session expired")]
    SessionExpired,

    /// Non-401 HTTP failure or network failure after all retries
    #[error("{message}")]
    ApiRequestFailed {
        status: Option<u16>,
        message: String,
    },

    /// The provider answered with a body we could not parse
    #[error("Malformed response: {message}")]
    Decode { message: String },

    /// An outgoing message is missing required fields
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// The login attempt failed
    #[error("{0}")]
    Auth(String),
}

/// Severity of a user-facing notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Destructive,
}

/// Title and description for a toast shown by the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub kind: NotificationKind,
}

impl Notification {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            kind: NotificationKind::Info,
        }
    }

    pub fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            kind: NotificationKind::Destructive,
        }
    }
}

impl MailError {
    /// HTTP status observed on the last attempt, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            MailError::SessionExpired => Some(401),
            MailError::ApiRequestFailed { status, .. } => *status,
            _ => None,
        }
    }

    /// Whether trying the same operation again later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, MailError::ApiRequestFailed { .. })
    }

    /// Whether the caller must send the user back through login
    pub fn requires_login(&self) -> bool {
        matches!(self, MailError::Unauthenticated | MailError::SessionExpired)
    }

    /// User-facing rendering of this error
    pub fn notification(&self) -> Notification {
        match self {
            MailError::Unauthenticated => Notification::destructive(
                "Authentication error",
                "You need to be logged in to continue",
            ),
            MailError::SessionExpired => Notification::destructive(
                "Session expired",
                "Please sign in again",
            ),
            MailError::ApiRequestFailed { .. } | MailError::Decode { .. } => {
                Notification::destructive("Request failed", self.to_string())
            }
            MailError::InvalidMessage(reason) => {
                Notification::destructive("Missing information", reason.clone())
            }
            MailError::Auth(reason) => {
                Notification::destructive("Authentication failed", reason.clone())
            }
        }
    }
}
