//! Mail crate - Gmail integration layer
//!
//! This crate provides the data layer behind a web-style mail client:
//! - Domain models (MessageSummary, MessageDetail, Folder, Session)
//! - Formatters for addresses, dates, bodies and categories
//! - Gmail API client over a retrying HTTP transport
//! - Implicit-grant OAuth flow with popup handoff
//! - Session providers (in-memory and persisted)
//! - Periodic refresh with out-of-order result protection
//!
//! This crate has zero UI dependencies; presentation layers consume
//! typed results and [`Notification`]s.

pub mod config;
pub mod error;
pub mod format;
pub mod gmail;
pub mod mailbox;
pub mod models;
pub mod refresh;
pub mod session;

pub use config::OAuthConfig;
pub use error::{MailError, Notification, NotificationKind};
pub use format::{RelativeDate, categorize, decode_body, folder_filter, parse_address, relative_date};
pub use gmail::{
    AuthCallback, AuthFlow, AuthState, BrowserOpener, CallbackOutcome, GmailClient, IdentityClient,
    OutgoingMessage, Transport, to_detail, to_summary, to_summary_at,
};
pub use mailbox::Mailbox;
pub use models::{
    AccessToken, Category, EmailAddress, Folder, MessageDetail, MessageId, MessageSummary, Session,
};
pub use refresh::{ListingBoard, ListingTicket, PeriodicRefresh, REFRESH_INTERVAL};
pub use session::{MemorySessionProvider, PersistentSessionProvider, SessionProvider};
