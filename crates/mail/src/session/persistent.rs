//! Session provider backed by a JSON file in the config directory

use anyhow::{Context, Result};
use log::{error, info, warn};
use std::path::{Path, PathBuf};

use super::{MemorySessionProvider, SessionProvider};
use crate::models::Session;

/// File name of the persisted session record
pub const SESSION_FILE: &str = "session.json";

/// Session provider that survives restarts
///
/// The record is the crate's only durable state. A missing, unreadable or
/// expired record means "no session" and never a fatal error.
pub struct PersistentSessionProvider {
    memory: MemorySessionProvider,
    path: PathBuf,
}

impl PersistentSessionProvider {
    /// Open the provider at ~/.config/postbox/session.json
    pub fn open_default() -> Result<Self> {
        let path =
            config::config_path(SESSION_FILE).context("Could not determine config directory")?;
        Ok(Self::open(path))
    }

    /// Open the provider at an explicit path, restoring any stored session
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let memory = match Self::restore(&path) {
            Some(session) => MemorySessionProvider::with_session(session),
            None => MemorySessionProvider::new(),
        };
        Self { memory, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn restore(path: &Path) -> Option<Session> {
        if !path.exists() {
            return None;
        }

        match config::load_json_file::<Session>(path) {
            Ok(session) if session.is_expired() => {
                info!("Stored session for {} expired, discarding", session.email);
                Self::remove(path);
                None
            }
            Ok(session) => {
                info!("Restored session for {}", session.email);
                Some(session)
            }
            Err(e) => {
                warn!("Failed to parse stored session: {:#}", e);
                Self::remove(path);
                None
            }
        }
    }

    fn remove(path: &Path) {
        if let Err(e) = config::remove_file(path) {
            error!("Failed to remove stored session: {:#}", e);
        }
    }
}

impl SessionProvider for PersistentSessionProvider {
    fn current(&self) -> Option<Session> {
        let (session, discarded) = self.memory.current_or_discard();
        if discarded {
            Self::remove(&self.path);
        }
        session
    }

    fn set(&self, session: Session) {
        if let Err(e) = config::save_json_file(&self.path, &session) {
            error!("Failed to persist session: {:#}", e);
        }
        self.memory.set(session);
    }

    fn clear(&self) {
        self.memory.clear();
        Self::remove(&self.path);
    }
}
