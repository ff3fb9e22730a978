//! Session provider abstraction
//!
//! The signed-in session is the only shared mutable state in the crate.
//! It is passed around as an `Arc<dyn SessionProvider>` rather than held
//! in a global, and every read discards a session whose expiry has passed.

mod memory;
mod persistent;

pub use memory::MemorySessionProvider;
pub use persistent::{PersistentSessionProvider, SESSION_FILE};

use crate::models::Session;

/// Owner of the current session
pub trait SessionProvider: Send + Sync {
    /// The current session, or `None` when signed out or expired
    ///
    /// An expired session is discarded as a side effect.
    fn current(&self) -> Option<Session>;

    /// Replace the current session
    fn set(&self, session: Session);

    /// Sign out locally; no provider endpoint is called
    fn clear(&self);
}
