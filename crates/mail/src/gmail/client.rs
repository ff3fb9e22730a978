//! Gmail API HTTP client
//!
//! Provides the mail operations consumed by the presentation layer:
//! list a folder, open a message, mark it read and send a new one.
//! Every call goes through the retrying [`Transport`].

use log::{debug, info, warn};
use rayon::prelude::*;

use super::api::{
    GmailMessage, ListMessagesResponse, MessageRef, ModifyMessageRequest, SendMessageRequest,
};
use super::compose::OutgoingMessage;
use super::normalize::{UNREAD_LABEL, to_detail, to_summary};
use super::transport::{HttpRequest, Transport};
use crate::error::MailError;
use crate::models::{AccessToken, EmailAddress, Folder, MessageDetail, MessageId, MessageSummary};

/// Gmail API client for the signed-in user's mailbox
#[derive(Clone)]
pub struct GmailClient {
    transport: Transport,
    base_url: String,
}

impl GmailClient {
    /// Gmail API base URL for the authenticated user
    const BASE_URL: &'static str = "https://gmail.googleapis.com/gmail/v1/users/me";

    /// Page size used when the caller does not pick one
    pub const DEFAULT_PAGE_SIZE: usize = 10;

    /// Upper bound the API accepts for `maxResults`
    const MAX_PAGE_SIZE: usize = 500;

    /// Create a new Gmail client
    pub fn new(transport: Transport) -> Self {
        Self {
            transport,
            base_url: Self::BASE_URL.to_string(),
        }
    }

    /// Point the client at a different API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// List message IDs in a folder
    pub fn list_message_refs(
        &self,
        token: &AccessToken,
        folder: Folder,
        limit: usize,
    ) -> Result<Vec<MessageRef>, MailError> {
        let url = format!(
            "{}/messages?maxResults={}&q={}",
            self.base_url,
            limit.clamp(1, Self::MAX_PAGE_SIZE),
            urlencoding::encode(folder.query())
        );

        let response = self.transport.request(&HttpRequest::get(url, token))?;
        let list: ListMessagesResponse = response.json()?;
        Ok(list.messages.unwrap_or_default())
    }

    /// Get a raw message by ID
    pub fn get_raw_message(
        &self,
        token: &AccessToken,
        id: &MessageId,
    ) -> Result<GmailMessage, MailError> {
        let url = format!(
            "{}/messages/{}",
            self.base_url,
            urlencoding::encode(id.as_str())
        );

        let response = self.transport.request(&HttpRequest::get(url, token))?;
        response.json()
    }

    /// List the newest messages in a folder
    ///
    /// Issues one list call, then fetches every message concurrently, one
    /// request in flight per message. A message whose fetch fails is
    /// logged and left out so the rest of the folder still renders. An
    /// expired session fails the whole listing.
    pub fn list_messages(
        &self,
        token: &AccessToken,
        folder: Folder,
        limit: usize,
    ) -> Result<Vec<MessageSummary>, MailError> {
        info!("Fetching {} messages for folder {}", limit, folder);

        let refs = self.list_message_refs(token, folder, limit)?;
        if refs.is_empty() {
            debug!("No messages found in {}", folder);
            return Ok(Vec::new());
        }

        let results = self.fetch_summaries(token, &refs);

        let mut summaries = Vec::with_capacity(results.len());
        for (msg_ref, result) in refs.iter().zip(results) {
            match result {
                Ok(summary) => summaries.push(summary),
                Err(MailError::SessionExpired) => return Err(MailError::SessionExpired),
                Err(e) => warn!("Dropping message {} from listing: {}", msg_ref.id, e),
            }
        }

        info!(
            "Loaded {}/{} messages for folder {}",
            summaries.len(),
            refs.len(),
            folder
        );
        Ok(summaries)
    }

    /// Fetch and convert each referenced message, preserving order
    fn fetch_summaries(
        &self,
        token: &AccessToken,
        refs: &[MessageRef],
    ) -> Vec<Result<MessageSummary, MailError>> {
        let fetch = || {
            refs.par_iter()
                .map(|r| {
                    self.get_raw_message(token, &MessageId::new(&r.id))
                        .map(|raw| to_summary(&raw))
                })
                .collect::<Vec<_>>()
        };

        match rayon::ThreadPoolBuilder::new()
            .num_threads(refs.len())
            .build()
        {
            Ok(pool) => pool.install(fetch),
            Err(e) => {
                warn!("Falling back to the global pool for message fetches: {}", e);
                fetch()
            }
        }
    }

    /// Fetch one message's full detail
    ///
    /// Returns `Ok(None)` when the provider has no such message.
    pub fn get_message(
        &self,
        token: &AccessToken,
        id: &MessageId,
    ) -> Result<Option<MessageDetail>, MailError> {
        debug!("Fetching message details for {}", id);

        match self.get_raw_message(token, id) {
            Ok(raw) => Ok(Some(to_detail(&raw))),
            Err(MailError::ApiRequestFailed {
                status: Some(404), ..
            }) => {
                info!("Message {} not found", id);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Remove the unread marker from a message
    ///
    /// Best-effort: a missing token or a failed request is reported as
    /// `Ok(false)`. Only an expired session surfaces as an error.
    pub fn mark_read(&self, token: &AccessToken, id: &MessageId) -> Result<bool, MailError> {
        let url = format!(
            "{}/messages/{}/modify",
            self.base_url,
            urlencoding::encode(id.as_str())
        );
        let body = ModifyMessageRequest {
            remove_label_ids: vec![UNREAD_LABEL.to_string()],
            ..Default::default()
        };
        let request = HttpRequest::post(url, token, serde_json::to_value(&body).unwrap_or_default());

        match self.transport.request(&request) {
            Ok(_) => {
                debug!("Message {} marked as read", id);
                Ok(true)
            }
            Err(MailError::SessionExpired) => Err(MailError::SessionExpired),
            Err(e) => {
                warn!("Failed to mark message {} as read: {}", id, e);
                Ok(false)
            }
        }
    }

    /// Send a new HTML message from `from`
    ///
    /// Sent at most once: a failed send is reported, never replayed, so it
    /// cannot be delivered twice.
    pub fn send_message(
        &self,
        token: &AccessToken,
        from: &EmailAddress,
        message: &OutgoingMessage,
    ) -> Result<MessageId, MailError> {
        message.validate()?;

        let url = format!("{}/messages/send", self.base_url);
        let body = SendMessageRequest {
            raw: message.encode_raw(from),
        };
        let request = HttpRequest::post(url, token, serde_json::to_value(&body).unwrap_or_default());

        let response = self.transport.request_once(&request)?;
        let sent: MessageRef = response.json()?;
        info!("Sent message {} to {}", sent.id, message.to);
        Ok(MessageId::new(sent.id))
    }
}
