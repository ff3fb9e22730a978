//! Gmail API integration
//!
//! This module provides:
//! - Implicit-grant OAuth flow and token validation
//! - A retrying HTTP transport for every authenticated call
//! - Gmail API client for listing, reading, marking and sending messages
//! - Conversion of raw API messages into list and detail projections

pub mod auth;
mod client;
mod compose;
mod normalize;
pub mod transport;

pub use auth::{
    AuthCallback, AuthFlow, AuthRequest, AuthResultMessage, AuthState, BrowserOpener,
    CallbackOutcome, CallbackParams, IdentityClient, OpenerChannel, PopupFeatures, PopupOpener,
    WindowMessage, parse_callback,
};
pub use client::GmailClient;
pub use compose::OutgoingMessage;
pub use normalize::{to_detail, to_summary, to_summary_at};
pub use transport::{HttpBackend, HttpMethod, HttpRequest, HttpResponse, Transport, UreqBackend};

/// Gmail API wire types
pub mod api {
    use serde::{Deserialize, Serialize};

    /// Response from listing messages
    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ListMessagesResponse {
        pub messages: Option<Vec<MessageRef>>,
        pub next_page_token: Option<String>,
        pub result_size_estimate: Option<u32>,
    }

    /// Reference to a message (just ID and thread ID)
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessageRef {
        pub id: String,
        #[serde(default)]
        pub thread_id: Option<String>,
    }

    /// Full message from Gmail API, as received and never mutated
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GmailMessage {
        pub id: String,
        #[serde(default)]
        pub thread_id: String,
        pub label_ids: Option<Vec<String>>,
        #[serde(default)]
        pub snippet: String,
        /// Epoch milliseconds, as a decimal string
        #[serde(default)]
        pub internal_date: String,
        pub payload: Option<MessagePayload>,
    }

    impl GmailMessage {
        /// First header value with the given name, compared case-insensitively
        pub fn header(&self, name: &str) -> Option<&str> {
            self.payload.as_ref()?.header(name)
        }

        pub fn has_label(&self, label: &str) -> bool {
            self.label_ids
                .as_ref()
                .is_some_and(|labels| labels.iter().any(|l| l == label))
        }
    }

    /// Message payload containing headers and body
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessagePayload {
        pub headers: Option<Vec<Header>>,
        pub body: Option<MessageBody>,
        pub parts: Option<Vec<MessagePart>>,
        pub mime_type: Option<String>,
    }

    impl MessagePayload {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .as_ref()?
                .iter()
                .find(|h| h.name.eq_ignore_ascii_case(name))
                .map(|h| h.value.as_str())
        }
    }

    /// Email header (name-value pair)
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Header {
        pub name: String,
        pub value: String,
    }

    /// Message body (base64url encoded when inline)
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessageBody {
        pub size: Option<u32>,
        pub data: Option<String>,
        pub attachment_id: Option<String>,
    }

    /// Message part (for multipart messages)
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessagePart {
        pub part_id: Option<String>,
        pub mime_type: Option<String>,
        pub filename: Option<String>,
        pub headers: Option<Vec<Header>>,
        pub body: Option<MessageBody>,
        pub parts: Option<Vec<MessagePart>>,
    }

    impl MessagePart {
        pub fn is_mime(&self, mime_type: &str) -> bool {
            self.mime_type
                .as_deref()
                .is_some_and(|m| m.eq_ignore_ascii_case(mime_type))
        }

        /// Inline base64url body data, if the part carries any
        pub fn data(&self) -> Option<&str> {
            self.body.as_ref()?.data.as_deref()
        }
    }

    /// Body of `POST /messages/{id}/modify`
    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ModifyMessageRequest {
        #[serde(skip_serializing_if = "Vec::is_empty", default)]
        pub add_label_ids: Vec<String>,
        #[serde(skip_serializing_if = "Vec::is_empty", default)]
        pub remove_label_ids: Vec<String>,
    }

    /// Body of `POST /messages/send`
    #[derive(Debug, Serialize, Deserialize)]
    pub struct SendMessageRequest {
        /// Base64url encoded RFC 2822 message
        pub raw: String,
    }

    /// Identity endpoint response
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct UserInfo {
        pub id: String,
        #[serde(default)]
        pub name: String,
        #[serde(default)]
        pub email: String,
        #[serde(default)]
        pub picture: String,
    }

    /// Error envelope returned by Google APIs
    #[derive(Debug, Deserialize)]
    pub struct ErrorResponse {
        pub error: ErrorDetail,
    }

    #[derive(Debug, Deserialize)]
    pub struct ErrorDetail {
        #[serde(default)]
        pub code: u16,
        #[serde(default)]
        pub message: String,
    }
}
