//! In-memory session provider

use log::info;
use std::sync::{PoisonError, RwLock};

use super::SessionProvider;
use crate::models::Session;

/// Session held for the lifetime of the process
#[derive(Default)]
pub struct MemorySessionProvider {
    session: RwLock<Option<Session>>,
}

impl MemorySessionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session: RwLock::new(Some(session)),
        }
    }

    /// Current session and whether an expired one was just discarded
    pub(crate) fn current_or_discard(&self) -> (Option<Session>, bool) {
        let session = self
            .session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        match session {
            Some(s) if s.is_expired() => {
                info!("Session for {} expired, signing out", s.email);
                self.clear();
                (None, true)
            }
            other => (other, false),
        }
    }
}

impl SessionProvider for MemorySessionProvider {
    fn current(&self) -> Option<Session> {
        self.current_or_discard().0
    }

    fn set(&self, session: Session) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(session);
    }

    fn clear(&self) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AccessToken;
    use chrono::Utc;

    fn make_session(expires_at: Option<i64>) -> Session {
        Session {
            id: "42".to_string(),
            display_name: "Grace Hopper".to_string(),
            email: "grace@example.com".to_string(),
            picture_url: String::new(),
            access_token: AccessToken::new("token"),
            expires_at,
        }
    }

    #[test]
    fn test_set_and_clear() {
        let provider = MemorySessionProvider::new();
        assert!(provider.current().is_none());

        provider.set(make_session(None));
        assert_eq!(provider.current().unwrap().email, "grace@example.com");

        provider.clear();
        assert!(provider.current().is_none());
    }

    #[test]
    fn test_expired_session_is_discarded() {
        let past = Utc::now().timestamp_millis() - 1_000;
        let provider = MemorySessionProvider::with_session(make_session(Some(past)));

        assert!(provider.current().is_none());
        // Stays gone
        assert!(provider.current().is_none());
    }

    #[test]
    fn test_unexpired_session_is_kept() {
        let future = Utc::now().timestamp_millis() + 3_600_000;
        let provider = MemorySessionProvider::with_session(make_session(Some(future)));
        assert!(provider.current().is_some());
    }
}
