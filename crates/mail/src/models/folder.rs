//! Logical mailbox folders and their provider query filters

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A logical mailbox view
///
/// Not a stored entity: a folder only selects the provider search filter
/// used when listing messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Folder {
    #[default]
    Inbox,
    Sent,
    Draft,
    Trash,
    Archive,
}

impl Folder {
    /// All folders in sidebar order
    pub const ALL: [Folder; 5] = [
        Folder::Inbox,
        Folder::Sent,
        Folder::Draft,
        Folder::Trash,
        Folder::Archive,
    ];

    /// Resolve a folder name, falling back to the inbox for unknown names
    pub fn from_name(name: &str) -> Self {
        name.parse().unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Folder::Inbox => "inbox",
            Folder::Sent => "sent",
            Folder::Draft => "draft",
            Folder::Trash => "trash",
            Folder::Archive => "archive",
        }
    }

    /// Gmail search query selecting this folder's messages
    pub fn query(&self) -> &'static str {
        match self {
            Folder::Inbox => "in:inbox",
            Folder::Sent => "in:sent",
            Folder::Draft => "in:draft",
            Folder::Trash => "in:trash",
            Folder::Archive => "-in:inbox -in:trash -in:spam",
        }
    }
}

impl FromStr for Folder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Folder::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown folder: {}", s))
    }
}

impl fmt::Display for Folder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_folders() {
        assert_eq!("sent".parse::<Folder>().unwrap(), Folder::Sent);
        assert_eq!("Trash".parse::<Folder>().unwrap(), Folder::Trash);
        assert!("spam".parse::<Folder>().is_err());
    }

    #[test]
    fn test_unknown_name_falls_back_to_inbox() {
        assert_eq!(Folder::from_name("spam"), Folder::Inbox);
        assert_eq!(Folder::from_name(""), Folder::Inbox);
    }

    #[test]
    fn test_archive_query_excludes_inbox_trash_and_spam() {
        assert_eq!(Folder::Archive.query(), "-in:inbox -in:trash -in:spam");
    }
}
