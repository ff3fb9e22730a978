//! Signed-in session record

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// OAuth bearer token
///
/// `Debug` and `Display` only ever show a short prefix, so a token can be
/// passed to log macros without leaking it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    /// Number of leading characters shown when the token is printed
    const VISIBLE_PREFIX: usize = 6;

    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for building the Authorization header only
    pub fn secret(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    fn redacted(&self) -> String {
        let prefix: String = self.0.chars().take(Self::VISIBLE_PREFIX).collect();
        format!("{}…", prefix)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessToken({})", self.redacted())
    }
}

impl fmt::Display for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

/// The signed-in user together with their access token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Provider account ID
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub picture_url: String,
    pub access_token: AccessToken,
    /// Expiry as epoch milliseconds, when the provider reported a lifetime
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl Session {
    /// Whether the session is stale at `now_ms` (epoch milliseconds)
    ///
    /// Sessions without an expiry never go stale on their own.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now_ms)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp_millis())
    }

    /// Sender mailbox used for outgoing messages
    pub fn sender(&self) -> super::EmailAddress {
        if self.display_name.is_empty() {
            super::EmailAddress::new(&self.email)
        } else {
            super::EmailAddress::with_name(&self.display_name, &self.email)
        }
    }
}
