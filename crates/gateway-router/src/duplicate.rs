//! Duplicate-transmission detection.
//!
//! POS terminals re-send on timeouts; an exact re-send of a (STAN, local
//! date) pair inside the window is answered with code 94 instead of being
//! processed twice. Entries are pruned lazily on insert.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// In-memory (STAN, local date) replay cache.
pub struct DuplicateCache {
    window: Duration,
    seen: Mutex<HashMap<(String, String), Instant>>,
}

impl DuplicateCache {
    /// Create a cache remembering pairs for `window`.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Record the pair; returns true when it was already seen inside the
    /// window.
    pub fn check_and_record(&self, stan: &str, local_date: &str) -> bool {
        let now = Instant::now();
        let mut seen = self.seen.lock();
        seen.retain(|_, stamp| now.duration_since(*stamp) < self.window);

        let key = (stan.to_string(), local_date.to_string());
        match seen.get(&key) {
            Some(_) => true,
            None => {
                seen.insert(key, now);
                false
            }
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.seen.lock().is_empty()
    }
}
