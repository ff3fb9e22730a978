//! Message projections handed to the presentation layer

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a message (Gmail message ID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An email address with a display name
///
/// When a header carries no display name, `name` holds the address itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    /// Display name (e.g., "John Doe"), or the address when none was given
    pub name: String,
    /// Email address (e.g., "john@example.com")
    pub email: String,
}

impl EmailAddress {
    /// Create an address whose display name is the address itself
    pub fn new(email: impl Into<String>) -> Self {
        let email = email.into();
        Self {
            name: email.clone(),
            email,
        }
    }

    /// Create a new email address with a display name
    pub fn with_name(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// Parse an address header such as `"John Doe" <john@example.com>`
    ///
    /// See [`crate::format::parse_address`].
    pub fn parse(s: &str) -> Self {
        crate::format::parse_address(s)
    }

    /// Format the address as an RFC 2822 mailbox
    pub fn display(&self) -> String {
        if self.name.is_empty() || self.name == self.email {
            self.email.clone()
        } else {
            format!("{} <{}>", self.name, self.email)
        }
    }
}

/// Coarse category shown next to a message in the list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Important,
    Personal,
    Social,
    Updates,
    Promotions,
    Forums,
    Work,
    Primary,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Important => "important",
            Category::Personal => "personal",
            Category::Social => "social",
            Category::Updates => "updates",
            Category::Promotions => "promotions",
            Category::Forums => "forums",
            Category::Work => "work",
            Category::Primary => "primary",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// List-row projection of a provider message
///
/// Recomputed on every fetch and never cached across folder switches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSummary {
    pub id: MessageId,
    pub sender_name: String,
    pub sender_email: String,
    pub subject: String,
    /// Plain-text snippet supplied by the provider
    pub preview: String,
    /// Wall-clock time, or "Today" for messages received today
    pub relative_time: String,
    /// Human-relative date label ("Yesterday", "Monday", "Mar 4", ...)
    pub absolute_date_label: String,
    pub is_read: bool,
    pub category: Category,
}

/// Full projection of a single opened message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDetail {
    #[serde(flatten)]
    pub summary: MessageSummary,
    /// Address from the To header
    pub recipient: String,
    /// Renderable HTML body (plain text is wrapped in a pre-wrap container)
    pub body_html: String,
    /// Presence-based guess, not authoritative attachment metadata
    pub has_attachments: bool,
}
