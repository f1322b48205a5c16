//! # Visit limiter
//!
//! Per-(client, photo) fixed window kept in process memory. Expired entries
//! are replaced lazily the next time the same key is seen; nothing sweeps.

use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use domains::VisitLimiter;

pub const DEFAULT_VISIT_WINDOW: Duration = Duration::from_secs(60 * 60);

pub struct InMemoryVisitLimiter {
    window: Duration,
    /// `"<ip>:<photoId>"` → end of the current window.
    windows: DashMap<String, Instant>,
}

impl InMemoryVisitLimiter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            windows: DashMap::new(),
        }
    }

    /// Number of keys currently remembered, expired or not.
    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.windows.len()
    }

    fn should_count_at(&self, client_key: &str, photo_id: &str, now: Instant) -> bool {
        match self.windows.entry(format!("{client_key}:{photo_id}")) {
            Entry::Occupied(mut open) => {
                if now < *open.get() {
                    return false;
                }
                open.insert(now + self.window);
                true
            }
            Entry::Vacant(slot) => {
                slot.insert(now + self.window);
                true
            }
        }
    }
}

impl Default for InMemoryVisitLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_VISIT_WINDOW)
    }
}

impl VisitLimiter for InMemoryVisitLimiter {
    fn should_count(&self, client_key: &str, photo_id: &str) -> bool {
        self.should_count_at(client_key, photo_id, Instant::now())
    }
}
