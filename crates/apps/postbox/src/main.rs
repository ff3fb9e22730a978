//! Postbox - a terminal Gmail client
//!
//! This is the main entry point for the Postbox command line.

use anyhow::Result;
use clap::Parser;
use log::error;
use mail::MailError;

mod cli;
mod commands;

use cli::{Cli, Command};
use commands::Context;

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let default_filter = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();

    // Bootstrap config directory
    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    if let Err(e) = run(&cli.command) {
        report(&e);
        std::process::exit(1);
    }
}

fn run(command: &Command) -> Result<()> {
    let ctx = Context::open()?;
    command.execute(&ctx)
}

/// Print an error the way the presentation layer would toast it
fn report(e: &anyhow::Error) {
    match e.downcast_ref::<MailError>() {
        Some(mail_error) => {
            let notification = mail_error.notification();
            eprintln!("{}: {}", notification.title, notification.description);
            if mail_error.requires_login() {
                eprintln!("Run `postbox login` to sign in.");
            }
        }
        None => eprintln!("Error: {:#}", e),
    }
}
