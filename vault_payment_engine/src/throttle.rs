//! Fixed-window request throttling.
//!
//! Each actor key gets a window that opens with its first call. Up to `limit` calls are admitted until the window
//! closes, after which the next call opens a fresh window. State is in-memory and process-local, and is lost on
//! restart.
use std::time::Duration;

use dashmap::DashMap;
use log::*;
use tokio::time::Instant;

/// Order creations admitted per actor per window.
pub const ORDER_CREATION_LIMIT: u32 = 10;
pub const THROTTLE_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
struct Window {
    opened_at: Instant,
    count: u32,
}

#[derive(Debug)]
pub struct ThrottleGuard {
    limit: u32,
    window: Duration,
    windows: DashMap<String, Window>,
}

impl Default for ThrottleGuard {
    fn default() -> Self {
        Self::new(ORDER_CREATION_LIMIT, THROTTLE_WINDOW)
    }
}

impl ThrottleGuard {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self { limit, window, windows: DashMap::new() }
    }

    /// Returns `true` if the call is admitted, and counts it.
    ///
    /// The entry guard holds the shard lock for the key, so the check and the increment happen together and two
    /// concurrent calls can never both take the last slot.
    pub fn allow(&self, actor_key: &str) -> bool {
        let now = Instant::now();
        let mut entry = self.windows.entry(actor_key.to_string()).or_insert(Window { opened_at: now, count: 0 });
        if now.duration_since(entry.opened_at) >= self.window {
            entry.opened_at = now;
            entry.count = 0;
        }
        if entry.count < self.limit {
            entry.count += 1;
            true
        } else {
            debug!("🚦️ {actor_key} is over the limit of {} calls per {:?}", self.limit, self.window);
            false
        }
    }

    /// Drops the windows that have already closed. Returns the number of keys removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows.retain(|_, w| now.duration_since(w.opened_at) < self.window);
        let removed = before.saturating_sub(self.windows.len());
        trace!("🚦️ Purged {removed} idle throttle windows");
        removed
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}
