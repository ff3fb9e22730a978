//! Command line definition

use clap::builder::TypedValueParser;
use clap::{Args, Parser, Subcommand};
use mail::{Folder, GmailClient, MessageId, REFRESH_INTERVAL};

/// A terminal Gmail client
#[derive(Debug, Parser)]
#[command(name = "postbox", version, about)]
pub struct Cli {
    /// Log at debug level (RUST_LOG still wins)
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Sign in with Google in the browser
    Login,
    /// Forget the stored session
    Logout,
    /// Show the signed-in account
    #[command(name = "whoami")]
    WhoAmI,
    /// List the newest messages in a folder
    List(ListingArgs),
    /// Show one message and mark it read
    Show {
        id: MessageId,
    },
    /// Mark a message as read
    Read {
        id: MessageId,
    },
    /// Send an HTML message
    Send {
        to: String,
        subject: String,
        body: String,
    },
    /// Reply to the sender of a message
    Reply {
        id: MessageId,
        body: String,
    },
    /// List a folder and keep refreshing it
    Watch {
        #[command(flatten)]
        listing: ListingArgs,

        /// Seconds between refreshes
        #[arg(
            long,
            value_name = "SECS",
            default_value_t = REFRESH_INTERVAL.as_secs(),
            value_parser = clap::value_parser!(u64).range(1..)
        )]
        interval: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Args)]
pub struct ListingArgs {
    /// inbox, sent, draft, trash or archive
    #[arg(default_value_t = Folder::Inbox, value_parser = folder)]
    pub folder: Folder,

    /// How many messages to fetch
    #[arg(
        default_value_t = GmailClient::DEFAULT_PAGE_SIZE,
        value_parser = clap::value_parser!(u16).range(1..=500).map(usize::from)
    )]
    pub limit: usize,
}

fn folder(name: &str) -> Result<Folder, String> {
    name.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("postbox").chain(args.iter().copied()))
    }

    #[test]
    fn test_list_defaults() {
        assert_eq!(
            parse(&["list"]).unwrap().command,
            Command::List(ListingArgs {
                folder: Folder::Inbox,
                limit: GmailClient::DEFAULT_PAGE_SIZE
            })
        );
    }

    #[test]
    fn test_list_with_folder_and_limit() {
        assert_eq!(
            parse(&["list", "Trash", "25"]).unwrap().command,
            Command::List(ListingArgs {
                folder: Folder::Trash,
                limit: 25
            })
        );
        assert!(parse(&["list", "inbox", "many"]).is_err());
        assert!(parse(&["list", "inbox", "0"]).is_err());
    }

    #[test]
    fn test_unknown_folder_is_rejected() {
        assert!(parse(&["list", "spam"]).is_err());
    }

    #[test]
    fn test_send_requires_three_fields() {
        assert_eq!(
            parse(&["send", "a@example.com", "Hi", "<p>Body</p>"])
                .unwrap()
                .command,
            Command::Send {
                to: "a@example.com".to_string(),
                subject: "Hi".to_string(),
                body: "<p>Body</p>".to_string(),
            }
        );
        assert!(parse(&["send", "a@example.com"]).is_err());
    }

    #[test]
    fn test_watch_interval() {
        assert_eq!(
            parse(&["watch", "sent", "--interval", "30"]).unwrap().command,
            Command::Watch {
                listing: ListingArgs {
                    folder: Folder::Sent,
                    limit: GmailClient::DEFAULT_PAGE_SIZE
                },
                interval: 30
            }
        );
        assert_eq!(
            parse(&["watch"]).unwrap().command,
            Command::Watch {
                listing: ListingArgs {
                    folder: Folder::Inbox,
                    limit: GmailClient::DEFAULT_PAGE_SIZE
                },
                interval: REFRESH_INTERVAL.as_secs()
            }
        );
        assert!(parse(&["watch", "--interval", "0"]).is_err());
    }

    #[test]
    fn test_id_commands() {
        assert_eq!(
            parse(&["show", "18f2a"]).unwrap().command,
            Command::Show {
                id: MessageId::new("18f2a")
            }
        );
        assert_eq!(
            parse(&["reply", "18f2a", "<p>Thanks</p>"]).unwrap().command,
            Command::Reply {
                id: MessageId::new("18f2a"),
                body: "<p>Thanks</p>".to_string()
            }
        );
        assert!(parse(&["read"]).is_err());
        assert!(parse(&["frobnicate"]).is_err());
    }

    #[test]
    fn test_debug_flag_is_global() {
        assert!(parse(&["--debug", "whoami"]).unwrap().debug);
        assert!(parse(&["whoami", "--debug"]).unwrap().debug);
        assert!(!parse(&["whoami"]).unwrap().debug);
        assert_eq!(parse(&["whoami"]).unwrap().command, Command::WhoAmI);
    }

    #[test]
    fn test_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
