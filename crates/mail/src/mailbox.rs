//! Session-aware entry point for the presentation layer
//!
//! Wraps [`GmailClient`] so callers never handle tokens: each call reads the
//! current session, and a rejected token signs the user out before the
//! error is returned.

use log::info;
use std::sync::Arc;

use crate::error::MailError;
use crate::gmail::{GmailClient, OutgoingMessage};
use crate::models::{Folder, MessageDetail, MessageId, MessageSummary, Session};
use crate::session::SessionProvider;

/// Mail operations on behalf of the signed-in user
#[derive(Clone)]
pub struct Mailbox {
    client: GmailClient,
    sessions: Arc<dyn SessionProvider>,
}

impl Mailbox {
    pub fn new(client: GmailClient, sessions: Arc<dyn SessionProvider>) -> Self {
        Self { client, sessions }
    }

    pub fn sessions(&self) -> &Arc<dyn SessionProvider> {
        &self.sessions
    }

    pub fn session(&self) -> Option<Session> {
        self.sessions.current()
    }

    pub fn list_messages(
        &self,
        folder: Folder,
        limit: usize,
    ) -> Result<Vec<MessageSummary>, MailError> {
        let session = self.require_session()?;
        self.guard(self.client.list_messages(&session.access_token, folder, limit))
    }

    pub fn get_message(&self, id: &MessageId) -> Result<Option<MessageDetail>, MailError> {
        let session = self.require_session()?;
        self.guard(self.client.get_message(&session.access_token, id))
    }

    /// Signed out means "not marked" rather than an error
    pub fn mark_read(&self, id: &MessageId) -> Result<bool, MailError> {
        let Some(session) = self.sessions.current() else {
            return Ok(false);
        };
        self.guard(self.client.mark_read(&session.access_token, id))
    }

    /// Send from the signed-in account
    pub fn send_message(&self, message: &OutgoingMessage) -> Result<MessageId, MailError> {
        let session = self.require_session()?;
        self.guard(
            self.client
                .send_message(&session.access_token, &session.sender(), message),
        )
    }

    fn require_session(&self) -> Result<Session, MailError> {
        self.sessions.current().ok_or(MailError::Unauthenticated)
    }

    fn guard<T>(&self, result: Result<T, MailError>) -> Result<T, MailError> {
        if let Err(MailError::SessionExpired) = &result {
            info!("Provider rejected the session, signing out");
            self.sessions.clear();
        }
        result
    }
}
