//! Command execution

use anyhow::{Context as _, Result, bail};
use chrono::Utc;
use log::{info, warn};
use mail::gmail::{AuthFlow, AuthState, BrowserOpener, IdentityClient};
use mail::{
    Folder, GmailClient, ListingBoard, Mailbox, MessageDetail, MessageSummary, OAuthConfig,
    OutgoingMessage, PeriodicRefresh, PersistentSessionProvider, SessionProvider, Transport,
};
use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::{Command, ListingArgs};

impl Command {
    pub fn execute(&self, ctx: &Context) -> Result<()> {
        match self {
            Command::Login => login(ctx),
            Command::Logout => {
                // Signing out is local, so it works without an OAuth client
                match ctx.auth_flow() {
                    Ok(mut flow) => flow.logout(),
                    Err(_) => ctx.sessions.clear(),
                }
                println!("Signed out.");
                Ok(())
            }
            Command::WhoAmI => {
                match ctx.sessions.current() {
                    Some(session) => println!("{}", session.sender().display()),
                    None => println!("Not signed in."),
                }
                Ok(())
            }
            Command::List(ListingArgs { folder, limit }) => {
                let summaries = ctx.mailbox.list_messages(*folder, *limit)?;
                print_listing(*folder, &summaries);
                Ok(())
            }
            Command::Show { id } => {
                let Some(detail) = ctx.mailbox.get_message(id)? else {
                    bail!("Message {} not found", id);
                };
                print_detail(&detail);
                if !detail.summary.is_read && !ctx.mailbox.mark_read(id)? {
                    warn!("Could not mark {} as read", id);
                }
                Ok(())
            }
            Command::Read { id } => {
                if ctx.mailbox.mark_read(id)? {
                    println!("Marked {} as read.", id);
                } else {
                    println!("Could not mark {} as read.", id);
                }
                Ok(())
            }
            Command::Send { to, subject, body } => {
                let id = ctx
                    .mailbox
                    .send_message(&OutgoingMessage::new(to, subject, body))?;
                println!("Sent message {}.", id);
                Ok(())
            }
            Command::Reply { id, body } => {
                let Some(original) = ctx.mailbox.get_message(id)? else {
                    bail!("Message {} not found", id);
                };
                let reply = OutgoingMessage::reply_to(&original, body.as_str());
                let sent = ctx.mailbox.send_message(&reply)?;
                println!("Replied to {} as {}.", reply.to, sent);
                Ok(())
            }
            Command::Watch { listing, interval } => watch(
                ctx,
                listing.folder,
                listing.limit,
                Duration::from_secs(*interval),
            ),
        }
    }
}

/// Shared services for one invocation
pub struct Context {
    pub sessions: Arc<dyn SessionProvider>,
    pub transport: Transport,
    pub mailbox: Mailbox,
}

impl Context {
    pub fn open() -> Result<Self> {
        let sessions: Arc<dyn SessionProvider> = Arc::new(PersistentSessionProvider::open_default()?);
        let transport = Transport::ureq();
        let mailbox = Mailbox::new(GmailClient::new(transport.clone()), sessions.clone());
        Ok(Self {
            sessions,
            transport,
            mailbox,
        })
    }

    fn auth_flow(&self) -> Result<AuthFlow> {
        let config = OAuthConfig::load().map_err(|e| {
            if let Some(path) = OAuthConfig::default_credentials_path() {
                warn!(
                    "To configure Gmail access, either:\n\
                     1. Place your Google OAuth client at: {}\n\
                     2. Or set environment variables: GMAIL_CLIENT_ID and POSTBOX_APP_ORIGIN",
                    path.display()
                );
            }
            e
        })?;
        Ok(AuthFlow::new(
            config,
            IdentityClient::new(self.transport.clone()),
            self.sessions.clone(),
        ))
    }
}

fn login(ctx: &Context) -> Result<()> {
    let mut flow = ctx.auth_flow()?;
    let request = flow.begin(&BrowserOpener)?;

    println!("Approve access in your browser. If it did not open, visit:\n\n  {}\n", request.url);
    println!("Then paste the full address the browser was sent to:");

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read callback address")?;

    if flow.check_timeout(Utc::now()) {
        bail!(mail::MailError::Auth("Authentication timed out".to_string()));
    }

    match flow.handle_redirect(line.trim()) {
        AuthState::Authenticated(session) => {
            println!("Signed in as {}.", session.sender().display());
            Ok(())
        }
        AuthState::Failed(reason) => Err(mail::MailError::Auth(reason.clone()).into()),
        other => bail!("Login did not complete ({:?})", other),
    }
}

fn watch(ctx: &Context, folder: Folder, limit: usize, interval: Duration) -> Result<()> {
    let board: Arc<ListingBoard<Vec<MessageSummary>>> = Arc::new(ListingBoard::new());

    let refresh_once = {
        let mailbox = ctx.mailbox.clone();
        let board = board.clone();
        move || {
            let ticket = board.ticket();
            match mailbox.list_messages(folder, limit) {
                Ok(summaries) => {
                    if board.publish(ticket, summaries.clone()) {
                        print_listing(folder, &summaries);
                    }
                }
                Err(e) => {
                    let notification = e.notification();
                    eprintln!("{}: {}", notification.title, notification.description);
                }
            }
        }
    };

    // The first listing is shown right away; a signed-out user stops here
    ctx.mailbox.list_messages(folder, limit).map(|summaries| {
        let ticket = board.ticket();
        board.publish(ticket, summaries.clone());
        print_listing(folder, &summaries);
    })?;

    info!("Refreshing {} every {:?}", folder, interval);
    println!("Watching {}. Press Enter to stop.", folder);
    let mut refresh = PeriodicRefresh::spawn(interval, refresh_once);

    let mut line = String::new();
    let _ = std::io::stdin().lock().read_line(&mut line);
    refresh.stop();
    Ok(())
}

fn print_listing(folder: Folder, summaries: &[MessageSummary]) {
    println!("\n{} ({} messages)", folder, summaries.len());
    for summary in summaries {
        println!(
            "{} {:>9}  {:<24.24}  {:<40.40}  [{}]  {}",
            if summary.is_read { ' ' } else { '*' },
            summary.relative_time,
            summary.sender_name,
            summary.subject,
            summary.category,
            summary.id,
        );
    }
}

fn print_detail(detail: &MessageDetail) {
    let summary = &detail.summary;
    println!("From:    {} <{}>", summary.sender_name, summary.sender_email);
    println!("To:      {}", detail.recipient);
    println!("Date:    {} {}", summary.absolute_date_label, summary.relative_time);
    println!("Subject: {}", summary.subject);
    if detail.has_attachments {
        println!("         (has attachments)");
    }
    println!("\n{}", detail.body_html);
}
