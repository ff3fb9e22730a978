//! Domain models for mail entities

mod folder;
mod message;
mod session;

pub use folder::Folder;
pub use message::{Category, EmailAddress, MessageDetail, MessageId, MessageSummary};
pub use session::{AccessToken, Session};
