//! Outbound message assembly

use crate::error::MailError;
use crate::format::encode_body;
use crate::models::{EmailAddress, MessageDetail};

const REPLY_PREFIX: &str = "Re: ";

/// A message typed into the compose dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub to: String,
    pub subject: String,
    /// HTML body
    pub body: String,
}

impl OutgoingMessage {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Reply to the sender of `original`
    ///
    /// The subject gets a single `Re: ` prefix; one already present is not
    /// repeated.
    pub fn reply_to(original: &MessageDetail, body: impl Into<String>) -> Self {
        let subject = &original.summary.subject;
        let subject = subject.strip_prefix(REPLY_PREFIX).unwrap_or(subject);
        Self::new(
            &original.summary.sender_email,
            format!("{}{}", REPLY_PREFIX, subject),
            body,
        )
    }

    /// All of recipient, subject and body are required
    pub fn validate(&self) -> Result<(), MailError> {
        if [&self.to, &self.subject, &self.body]
            .iter()
            .any(|field| field.trim().is_empty())
        {
            return Err(MailError::InvalidMessage(
                "Please fill all the fields".to_string(),
            ));
        }
        Ok(())
    }

    /// Render as an RFC 2822 document with CRLF line endings
    pub fn to_rfc2822(&self, from: &EmailAddress) -> String {
        [
            format!("From: {}", from.display()),
            format!("To: {}", single_line(&self.to)),
            format!("Subject: {}", single_line(&self.subject)),
            "MIME-Version: 1.0".to_string(),
            "Content-Type: text/html; charset=utf-8".to_string(),
            String::new(),
            self.body.clone(),
        ]
        .join("\r\n")
    }

    /// Base64url (unpadded) form expected by `messages/send`
    pub fn encode_raw(&self, from: &EmailAddress) -> String {
        encode_body(&self.to_rfc2822(from))
    }
}

/// Collapse line breaks so user input cannot inject extra headers
fn single_line(value: &str) -> String {
    value
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::decode_body;
    use crate::models::{Category, MessageId, MessageSummary};

    fn sender() -> EmailAddress {
        EmailAddress::with_name("Ada Lovelace", "ada@example.com")
    }

    #[test]
    fn test_rfc2822_layout() {
        let msg = OutgoingMessage::new("bob@example.com", "Hello", "<p>Hi Bob</p>");
        assert_eq!(
            msg.to_rfc2822(&sender()),
            "From: Ada Lovelace <ada@example.com>\r\n\
             To: bob@example.com\r\n\
             Subject: Hello\r\n\
             MIME-Version: 1.0\r\n\
             Content-Type: text/html; charset=utf-8\r\n\
             \r\n\
             <p>Hi Bob</p>"
        );
    }

    #[test]
    fn test_encode_raw_is_url_safe_and_unpadded() {
        let msg = OutgoingMessage::new("bob@example.com", "Prüfung ???", "<p>>>> ~~~</p>");
        let raw = msg.encode_raw(&sender());
        assert!(!raw.contains('+') && !raw.contains('/') && !raw.contains('='));
        assert_eq!(decode_body(&raw), msg.to_rfc2822(&sender()));
    }

    #[test]
    fn test_header_injection_is_flattened() {
        let msg = OutgoingMessage::new("bob@example.com\r\nBcc: eve@example.com", "Hi", "body");
        let rendered = msg.to_rfc2822(&sender());
        assert!(rendered.contains("To: bob@example.com Bcc: eve@example.com\r\n"));
        assert!(!rendered.contains("\r\nBcc:"));
    }

    fn opened(subject: &str) -> MessageDetail {
        MessageDetail {
            summary: MessageSummary {
                id: MessageId::new("m1"),
                sender_name: "Charles Babbage".to_string(),
                sender_email: "charles@example.com".to_string(),
                subject: subject.to_string(),
                preview: String::new(),
                relative_time: "Today".to_string(),
                absolute_date_label: "9:05 AM".to_string(),
                is_read: true,
                category: Category::Work,
            },
            recipient: "ada@example.com".to_string(),
            body_html: "<p>Engine plans</p>".to_string(),
            has_attachments: false,
        }
    }

    #[test]
    fn test_reply_prefills_recipient_and_subject() {
        let reply = OutgoingMessage::reply_to(&opened("Engine plans"), "<p>Thanks</p>");
        assert_eq!(
            reply,
            OutgoingMessage::new("charles@example.com", "Re: Engine plans", "<p>Thanks</p>")
        );
    }

    #[test]
    fn test_reply_does_not_stack_prefixes() {
        let reply = OutgoingMessage::reply_to(&opened("Re: Engine plans"), "ok");
        assert_eq!(reply.subject, "Re: Engine plans");
    }

    #[test]
    fn test_validate_requires_all_fields() {
        assert!(OutgoingMessage::new("a@b.com", "Hi", "body").validate().is_ok());
        for msg in [
            OutgoingMessage::new("", "Hi", "body"),
            OutgoingMessage::new("a@b.com", "  ", "body"),
            OutgoingMessage::new("a@b.com", "Hi", ""),
        ] {
            assert_eq!(
                msg.validate(),
                Err(MailError::InvalidMessage("Please fill all the fields".to_string()))
            );
        }
    }
}
