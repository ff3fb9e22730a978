//! Gmail API response normalization
//!
//! Converts raw Gmail API messages to the list and detail projections.
//! Conversion never fails: missing headers and undecodable bodies fall
//! back to placeholders.

use super::api::{GmailMessage, MessagePart};
use crate::format::{
    RelativeDate, categorize, decode_body, decode_html_entities, escape_html, parse_address,
    relative_date, relative_date_at,
};
use crate::models::{MessageDetail, MessageId, MessageSummary};

/// Subject shown when the message has none
pub const NO_SUBJECT: &str = "(No subject)";

/// Label the provider sets on unread messages
pub const UNREAD_LABEL: &str = "UNREAD";

/// Convert a raw message into its list-row projection
pub fn to_summary(raw: &GmailMessage) -> MessageSummary {
    build_summary(raw, relative_date(&raw.internal_date))
}

/// Convert a raw message into its full-detail projection
pub fn to_detail(raw: &GmailMessage) -> MessageDetail {
    build_detail(raw, to_summary(raw))
}

/// [`to_summary`] with an explicit "now" for the date labels
pub fn to_summary_at<Tz>(raw: &GmailMessage, now: &chrono::DateTime<Tz>) -> MessageSummary
where
    Tz: chrono::TimeZone,
    Tz::Offset: std::fmt::Display,
{
    build_summary(raw, relative_date_at(&raw.internal_date, now))
}

fn build_summary(raw: &GmailMessage, dates: RelativeDate) -> MessageSummary {
    let sender = parse_address(raw.header("From").unwrap_or_default());
    let subject = raw
        .header("Subject")
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(NO_SUBJECT)
        .to_string();

    MessageSummary {
        id: MessageId::new(&raw.id),
        sender_name: sender.name,
        sender_email: sender.email,
        subject,
        preview: decode_html_entities(&raw.snippet),
        relative_time: dates.time,
        absolute_date_label: dates.date,
        is_read: !raw.has_label(UNREAD_LABEL),
        category: categorize(raw),
    }
}

fn build_detail(raw: &GmailMessage, summary: MessageSummary) -> MessageDetail {
    let recipient = parse_address(raw.header("To").unwrap_or_default()).email;
    let parts = raw.payload.as_ref().and_then(|p| p.parts.as_deref());

    MessageDetail {
        summary,
        recipient,
        body_html: extract_body(raw),
        has_attachments: parts.is_some_and(has_attachments),
    }
}

/// Resolve renderable body content
///
/// Multipart messages use their HTML part, else their plain-text part
/// wrapped in a whitespace-preserving container. Single-part messages use
/// the top-level body.
fn extract_body(raw: &GmailMessage) -> String {
    let Some(payload) = &raw.payload else {
        return String::new();
    };

    if let Some(parts) = &payload.parts {
        let html = parts.iter().find(|p| p.is_mime("text/html"));
        let text = parts.iter().find(|p| p.is_mime("text/plain"));

        if let Some(data) = html.and_then(MessagePart::data) {
            return decode_body(data);
        }
        if let Some(data) = text.and_then(MessagePart::data) {
            return wrap_plain_text(&decode_body(data));
        }
        return String::new();
    }

    payload
        .body
        .as_ref()
        .and_then(|b| b.data.as_deref())
        .map(decode_body)
        .unwrap_or_default()
}

fn wrap_plain_text(text: &str) -> String {
    format!(
        "<div style=\"white-space: pre-wrap;\">{}</div>",
        escape_html(text)
    )
}

/// Presence-based attachment guess
///
/// A part counts when it is `image/*` or `application/*`, or when its body
/// carries no inline data (content referenced externally).
fn has_attachments(parts: &[MessagePart]) -> bool {
    parts.iter().any(|part| {
        let Some(body) = &part.body else {
            return false;
        };
        let mime = part.mime_type.as_deref().unwrap_or_default();
        body.data.is_none() || mime.starts_with("application/") || mime.starts_with("image/")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::encode_body;
    use crate::gmail::api::{Header, MessageBody, MessagePayload};
    use crate::models::Category;
    use chrono::{TimeZone, Utc};

    fn headers(pairs: &[(&str, &str)]) -> Option<Vec<Header>> {
        Some(
            pairs
                .iter()
                .map(|(n, v)| Header {
                    name: n.to_string(),
                    value: v.to_string(),
                })
                .collect(),
        )
    }

    fn part(mime: &str, data: Option<&str>) -> MessagePart {
        MessagePart {
            mime_type: Some(mime.to_string()),
            body: Some(MessageBody {
                size: None,
                data: data.map(encode_body),
                attachment_id: None,
            }),
            ..Default::default()
        }
    }

    fn make_message(labels: &[&str], payload: MessagePayload) -> GmailMessage {
        GmailMessage {
            id: "msg-1".to_string(),
            thread_id: "thread-1".to_string(),
            label_ids: Some(labels.iter().map(|l| l.to_string()).collect()),
            snippet: "Numbers &amp; totals".to_string(),
            internal_date: Utc
                .with_ymd_and_hms(2024, 5, 15, 9, 5, 0)
                .unwrap()
                .timestamp_millis()
                .to_string(),
            payload: Some(payload),
        }
    }

    #[test]
    fn test_summary_fields() {
        let raw = make_message(
            &["UNREAD", "IMPORTANT"],
            MessagePayload {
                headers: headers(&[
                    ("from", "\"Dana Scully\" <dana@fbi.gov>"),
                    ("SUBJECT", "Re: Budget"),
                ]),
                ..Default::default()
            },
        );
        let now = Utc.with_ymd_and_hms(2024, 5, 15, 14, 30, 0).unwrap();
        let summary = to_summary_at(&raw, &now);

        assert_eq!(summary.id.as_str(), "msg-1");
        assert_eq!(summary.sender_name, "Dana Scully");
        assert_eq!(summary.sender_email, "dana@fbi.gov");
        assert_eq!(summary.subject, "Re: Budget");
        assert_eq!(summary.preview, "Numbers & totals");
        assert_eq!(summary.relative_time, "Today");
        assert_eq!(summary.absolute_date_label, "9:05 AM");
        assert!(!summary.is_read);
        assert_eq!(summary.category, Category::Important);
    }

    #[test]
    fn test_summary_defaults() {
        let raw = GmailMessage {
            id: "bare".to_string(),
            thread_id: String::new(),
            label_ids: None,
            snippet: String::new(),
            internal_date: "garbage".to_string(),
            payload: None,
        };
        let summary = to_summary(&raw);

        assert_eq!(summary.subject, NO_SUBJECT);
        assert_eq!(summary.sender_email, "");
        assert!(summary.is_read);
        assert_eq!(summary.category, Category::Primary);
        assert_eq!(summary.absolute_date_label, "");
    }

    #[test]
    fn test_blank_subject_uses_placeholder() {
        for blank in ["", "   "] {
            let raw = make_message(
                &[],
                MessagePayload {
                    headers: headers(&[("From", "a@example.com"), ("Subject", blank)]),
                    ..Default::default()
                },
            );
            assert_eq!(to_summary(&raw).subject, NO_SUBJECT);
        }
    }

    #[test]
    fn test_detail_prefers_html_part() {
        let raw = make_message(
            &[],
            MessagePayload {
                headers: headers(&[("To", "Fox Mulder <fox@fbi.gov>")]),
                parts: Some(vec![
                    part("text/plain", Some("plain version")),
                    part("text/html", Some("<b>html version</b>")),
                ]),
                ..Default::default()
            },
        );
        let detail = to_detail(&raw);

        assert_eq!(detail.recipient, "fox@fbi.gov");
        assert_eq!(detail.body_html, "<b>html version</b>");
        assert!(!detail.has_attachments);
    }

    #[test]
    fn test_detail_wraps_plain_text() {
        let raw = make_message(
            &[],
            MessagePayload {
                parts: Some(vec![part("text/plain", Some("line one\n  a < b"))]),
                ..Default::default()
            },
        );
        let detail = to_detail(&raw);
        assert_eq!(
            detail.body_html,
            "<div style=\"white-space: pre-wrap;\">line one\n  a &lt; b</div>"
        );
    }

    #[test]
    fn test_detail_uses_top_level_body() {
        let raw = make_message(
            &[],
            MessagePayload {
                body: Some(MessageBody {
                    size: None,
                    data: Some(encode_body("<p>single part</p>")),
                    attachment_id: None,
                }),
                mime_type: Some("text/html".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(to_detail(&raw).body_html, "<p>single part</p>");
    }

    #[test]
    fn test_detail_with_undecodable_body_is_empty() {
        let mut html = part("text/html", None);
        html.body = Some(MessageBody {
            size: None,
            data: Some("%%%".to_string()),
            attachment_id: None,
        });
        let raw = make_message(
            &[],
            MessagePayload {
                parts: Some(vec![html]),
                ..Default::default()
            },
        );
        assert_eq!(to_detail(&raw).body_html, "");
    }

    #[test]
    fn test_attachment_heuristic() {
        let with_pdf = make_message(
            &[],
            MessagePayload {
                parts: Some(vec![
                    part("text/html", Some("<p>see attached</p>")),
                    part("application/pdf", Some("%PDF")),
                ]),
                ..Default::default()
            },
        );
        assert!(to_detail(&with_pdf).has_attachments);

        let with_external = make_message(
            &[],
            MessagePayload {
                parts: Some(vec![
                    part("text/plain", Some("hello")),
                    part("text/calendar", None),
                ]),
                ..Default::default()
            },
        );
        assert!(to_detail(&with_external).has_attachments);

        let without_body = make_message(
            &[],
            MessagePayload {
                parts: Some(vec![MessagePart {
                    mime_type: Some("image/png".to_string()),
                    body: None,
                    ..Default::default()
                }]),
                ..Default::default()
            },
        );
        assert!(!to_detail(&without_body).has_attachments);
    }

    #[test]
    fn test_conversion_does_not_mutate_raw() {
        let raw = make_message(
            &["UNREAD"],
            MessagePayload {
                headers: headers(&[("Subject", "Hello")]),
                ..Default::default()
            },
        );
        let before = serde_json::to_value(&raw).unwrap();
        let _ = to_detail(&raw);
        assert_eq!(serde_json::to_value(&raw).unwrap(), before);
    }
}
