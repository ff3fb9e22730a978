//! Periodic folder refresh
//!
//! A detached worker re-runs a task on a fixed interval, and a
//! [`ListingBoard`] makes sure a slow, older listing can never overwrite
//! the result of a newer one.

use log::{debug, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

/// Interval between automatic re-fetches of the current folder
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Background worker that runs a task every `interval`
///
/// The first run happens one interval after spawning. The worker stops
/// when [`stop`](Self::stop) is called or the handle is dropped; a run in
/// progress is allowed to finish.
pub struct PeriodicRefresh {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicRefresh {
    pub fn spawn<F>(interval: Duration, mut task: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let handle = std::thread::Builder::new()
            .name("periodic-refresh".to_string())
            .spawn(move || {
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            debug!("Periodic refresh tick");
                            task();
                        }
                        // Stop requested or handle dropped
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            });

        let handle = match handle {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Could not start periodic refresh: {}", e);
                None
            }
        };

        Self {
            stop_tx: Some(stop_tx),
            handle,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the worker and wait for it to exit
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Periodic refresh worker panicked");
            }
        }
    }
}

impl Drop for PeriodicRefresh {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Ticket identifying one listing request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ListingTicket(u64);

/// Latest published listing, guarded against out-of-order completion
///
/// Every request takes a ticket before fetching. A result is published
/// only if no request with a newer ticket has published already.
pub struct ListingBoard<T> {
    next: AtomicU64,
    latest: Mutex<Option<(ListingTicket, T)>>,
}

impl<T: Clone> ListingBoard<T> {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
            latest: Mutex::new(None),
        }
    }

    /// Reserve a ticket for a request about to start
    pub fn ticket(&self) -> ListingTicket {
        ListingTicket(self.next.fetch_add(1, Ordering::SeqCst))
    }

    /// Publish the result of the request holding `ticket`
    ///
    /// Returns false when a newer request already published.
    pub fn publish(&self, ticket: ListingTicket, value: T) -> bool {
        let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        match latest.as_ref() {
            Some((current, _)) if *current > ticket => {
                debug!("Discarding stale listing {:?}", ticket);
                false
            }
            _ => {
                *latest = Some((ticket, value));
                true
            }
        }
    }

    pub fn latest(&self) -> Option<T> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|(_, value)| value.clone())
    }
}

impl<T: Clone> Default for ListingBoard<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    #[test]
    fn test_refresh_runs_repeatedly() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let mut refresh = PeriodicRefresh::spawn(Duration::from_millis(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let deadline = Instant::now() + Duration::from_secs(5);
        while count.load(Ordering::SeqCst) < 3 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(count.load(Ordering::SeqCst) >= 3);

        refresh.stop();
        assert!(!refresh.is_running());
        let after_stop = count.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(count.load(Ordering::SeqCst), after_stop);
    }

    #[test]
    fn test_drop_stops_before_first_tick() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let refresh = PeriodicRefresh::spawn(Duration::from_secs(60), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(refresh.is_running());

        // Returns promptly instead of waiting out the interval
        let started = Instant::now();
        drop(refresh);
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_stale_listing_is_discarded() {
        let board = ListingBoard::new();
        let slow = board.ticket();
        let fast = board.ticket();

        assert!(board.publish(fast, vec!["new"]));
        assert!(!board.publish(slow, vec!["old"]));
        assert_eq!(board.latest(), Some(vec!["new"]));
    }

    #[test]
    fn test_in_order_listings_replace() {
        let board = ListingBoard::new();
        assert_eq!(board.latest(), None::<u32>);

        let first = board.ticket();
        assert!(board.publish(first, 1));
        let second = board.ticket();
        assert!(board.publish(second, 2));
        assert_eq!(board.latest(), Some(2));
    }
}
