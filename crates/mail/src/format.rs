//! Formatters for wire-level strings
//!
//! Every function here is pure and infallible: malformed input degrades to
//! a safe default instead of an error, so one bad message can never break
//! a whole folder view.

use base64::alphabet;
use base64::engine::{GeneralPurpose, GeneralPurposeConfig};
use base64::prelude::*;
use chrono::{DateTime, Datelike, Local, TimeZone};
use log::debug;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

use crate::gmail::api::GmailMessage;
use crate::models::{Category, EmailAddress, Folder};

/// Optional (quoted or unquoted) display name followed by a `local@domain` token
static ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:"?([^"]*)"?\s)?(?:<)?([^>@\s]+@[^>@\s]+)(?:>)?"#)
        .expect("address pattern is valid")
});

static UPDATES_SUBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)newsletter|update|news").expect("pattern is valid"));

static WORK_SUBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)meeting|project|work").expect("pattern is valid"));

/// Provider labels checked in priority order; the first match wins
const LABEL_CATEGORIES: [(&str, Category); 6] = [
    ("IMPORTANT", Category::Important),
    ("CATEGORY_PERSONAL", Category::Personal),
    ("CATEGORY_SOCIAL", Category::Social),
    ("CATEGORY_UPDATES", Category::Updates),
    ("CATEGORY_PROMOTIONS", Category::Promotions),
    ("CATEGORY_FORUMS", Category::Forums),
];

/// Standard alphabet that, like browsers' `atob`, ignores stray trailing bits
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

const WEEK_MILLIS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Parse an RFC 2822 style address header
///
/// Accepts `"Display Name" <addr@host>`, `Display Name <addr@host>` or a
/// bare address. Without a display name the address doubles as the name.
/// Input with no address-shaped token is returned verbatim as both fields.
pub fn parse_address(header: &str) -> EmailAddress {
    let Some(caps) = ADDRESS_RE.captures(header) else {
        return EmailAddress::with_name(header, header);
    };

    let email = caps.get(2).map(|m| m.as_str()).unwrap_or(header);
    let name = caps
        .get(1)
        .map(|m| m.as_str().trim())
        .filter(|name| !name.is_empty())
        .unwrap_or(email);

    EmailAddress::with_name(name, email)
}

/// Time and date labels for a message row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelativeDate {
    /// Wall-clock time, or "Today" when `date` already carries it
    pub time: String,
    pub date: String,
}

/// Bucket a provider timestamp (epoch milliseconds as a string) against now
pub fn relative_date(epoch_ms: &str) -> RelativeDate {
    relative_date_at(epoch_ms, &Local::now())
}

/// Bucket a provider timestamp against an explicit "now"
///
/// Buckets, in priority order: same calendar day, previous calendar day,
/// less than seven days ago, same calendar year, anything older. An
/// unparsable timestamp yields empty labels.
pub fn relative_date_at<Tz>(epoch_ms: &str, now: &DateTime<Tz>) -> RelativeDate
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let parsed = epoch_ms
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(|ms| now.timezone().timestamp_millis_opt(ms).single());

    let Some(received) = parsed else {
        debug!("Unparsable internal date: {:?}", epoch_ms);
        return RelativeDate::default();
    };

    let wall_clock = received.format("%-I:%M %p").to_string();
    let today = now.date_naive();
    let day = received.date_naive();

    if day == today {
        return RelativeDate {
            time: "Today".to_string(),
            date: wall_clock,
        };
    }

    let date = if today.pred_opt() == Some(day) {
        "Yesterday".to_string()
    } else if now.timestamp_millis() - received.timestamp_millis() < WEEK_MILLIS {
        received.format("%A").to_string()
    } else if received.year() == now.year() {
        received.format("%b %-d").to_string()
    } else {
        received.format("%b %-d, %Y").to_string()
    };

    RelativeDate {
        time: wall_clock,
        date,
    }
}

/// Decode URL-safe base64 body data to UTF-8 text
///
/// Returns an empty string for malformed base64 or non-UTF-8 content.
pub fn decode_body(data: &str) -> String {
    let mut standard: String = data
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    let padding = (4 - standard.len() % 4) % 4;
    standard.extend(std::iter::repeat_n('=', padding));

    match LENIENT_BASE64.decode(standard.as_bytes()) {
        Ok(bytes) => String::from_utf8(bytes).unwrap_or_else(|e| {
            debug!("Body is not valid UTF-8: {}", e);
            String::new()
        }),
        Err(e) => {
            debug!("Error decoding base64 body: {}", e);
            String::new()
        }
    }
}

/// Encode text as unpadded URL-safe base64, the provider's `raw` format
pub fn encode_body(text: &str) -> String {
    BASE64_URL_SAFE_NO_PAD.encode(text.as_bytes())
}

/// Classify a message, preferring provider labels over subject keywords
pub fn categorize(message: &GmailMessage) -> Category {
    let labels = message.label_ids.as_deref().unwrap_or_default();

    if let Some((_, category)) = LABEL_CATEGORIES
        .iter()
        .find(|(label, _)| labels.iter().any(|l| l == label))
    {
        return *category;
    }

    let subject = message.header("Subject").unwrap_or_default();
    if UPDATES_SUBJECT_RE.is_match(subject) {
        Category::Updates
    } else if WORK_SUBJECT_RE.is_match(subject) {
        Category::Work
    } else {
        Category::Primary
    }
}

/// Map a folder name to its provider query; unknown names select the inbox
pub fn folder_filter(folder_name: &str) -> &'static str {
    Folder::from_name(folder_name).query()
}

/// Decode the HTML entities the provider embeds in snippets
pub fn decode_html_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Escape text for embedding inside an HTML container
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
