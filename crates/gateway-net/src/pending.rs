//! Pending-request store for bank correlation.
//!
//! Maps (STAN, local transaction date) to a waiting submitter. Flow:
//!
//! 1. `submit` registers the pair and keeps the receiver.
//! 2. The bank I/O task sends the request upstream.
//! 3. A response arriving with the same pair resolves the receiver.
//! 4. Entries past their deadline are swept and resolved with a timeout.
//!
//! Unmatched responses are logged and dropped.

use dashmap::DashMap;
use gateway_codec::IsoMessage;
use gateway_router::DispatchError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Correlation key: (STAN, local transaction date).
pub type CorrelationKey = (String, String);

struct PendingRequest {
    sender: oneshot::Sender<Result<IsoMessage, DispatchError>>,
    created_at: Instant,
    deadline: Duration,
}

/// Counters for operations visibility.
#[derive(Debug, Default)]
pub struct PendingStats {
    pub total_registered: AtomicU64,
    pub total_completed: AtomicU64,
    pub total_timeouts: AtomicU64,
    pub total_failed: AtomicU64,
}

/// In-flight bank request table.
pub struct PendingStore {
    pending: DashMap<CorrelationKey, PendingRequest>,
    default_deadline: Duration,
    stats: Arc<PendingStats>,
}

impl PendingStore {
    /// Create a store with the per-request deadline.
    pub fn new(default_deadline: Duration) -> Self {
        Self {
            pending: DashMap::new(),
            default_deadline,
            stats: Arc::new(PendingStats::default()),
        }
    }

    /// Register an in-flight request and get the response receiver.
    ///
    /// A second registration of the same key replaces the first; the older
    /// waiter resolves as failed.
    pub fn register(
        &self,
        key: CorrelationKey,
    ) -> oneshot::Receiver<Result<IsoMessage, DispatchError>> {
        let (tx, rx) = oneshot::channel();
        let request = PendingRequest {
            sender: tx,
            created_at: Instant::now(),
            deadline: self.default_deadline,
        };
        if let Some(previous) = self.pending.insert(key.clone(), request) {
            let _ = previous.sender.send(Err(DispatchError::Unavailable));
            warn!(stan = %key.0, date = %key.1, "replaced in-flight request with same key");
        }
        self.stats.total_registered.fetch_add(1, Ordering::Relaxed);
        debug!(stan = %key.0, date = %key.1, "registered in-flight request");
        rx
    }

    /// Resolve a pending request with the bank's response.
    ///
    /// Returns false when no matching request is in flight (late or alien
    /// response, which the caller drops).
    pub fn complete(&self, key: &CorrelationKey, response: IsoMessage) -> bool {
        match self.pending.remove(key) {
            Some((_, request)) => {
                let elapsed_ms = request.created_at.elapsed().as_millis();
                if request.sender.send(Ok(response)).is_ok() {
                    self.stats.total_completed.fetch_add(1, Ordering::Relaxed);
                    debug!(stan = %key.0, date = %key.1, elapsed_ms, "completed in-flight request");
                    true
                } else {
                    // Submitter gave up (its timeout fired first).
                    self.stats.total_timeouts.fetch_add(1, Ordering::Relaxed);
                    false
                }
            }
            None => {
                warn!(stan = %key.0, date = %key.1, "response for unknown correlation key, dropped");
                false
            }
        }
    }

    /// Resolve a pending request with a failure.
    pub fn fail(&self, key: &CorrelationKey, error: DispatchError) -> bool {
        match self.pending.remove(key) {
            Some((_, request)) => {
                self.stats.total_failed.fetch_add(1, Ordering::Relaxed);
                request.sender.send(Err(error)).is_ok()
            }
            None => false,
        }
    }

    /// Sweep entries past their deadline, resolving them as timeouts.
    pub fn remove_expired(&self) -> usize {
        let now = Instant::now();
        let mut expired = Vec::new();
        self.pending.retain(|key, request| {
            if now.duration_since(request.created_at) > request.deadline {
                expired.push(key.clone());
                false
            } else {
                true
            }
        });
        // retain drops the entries (and their senders) — the waiters see a
        // closed channel. Count them as timeouts.
        let removed = expired.len();
        for key in expired {
            warn!(stan = %key.0, date = %key.1, "in-flight request expired");
            self.stats.total_timeouts.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    /// Number of requests currently in flight.
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Whether a key is currently in flight.
    pub fn is_pending(&self, key: &CorrelationKey) -> bool {
        self.pending.contains_key(key)
    }

    /// Counter snapshot.
    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }
}

/// Background sweep resolving expired entries.
pub async fn expiry_sweep(store: Arc<PendingStore>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        let removed = store.remove_expired();
        if removed > 0 {
            debug!(removed, "swept expired in-flight requests");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(stan: &str) -> CorrelationKey {
        (stan.to_string(), "0802".to_string())
    }

    #[tokio::test]
    async fn test_register_and_complete() {
        let store = PendingStore::new(Duration::from_secs(30));
        let rx = store.register(key("000123"));
        assert!(store.is_pending(&key("000123")));
        assert_eq!(store.in_flight(), 1);

        let response = IsoMessage::new("0210").with(39, "00");
        assert!(store.complete(&key("000123"), response.clone()));

        let received = rx.await.unwrap().unwrap();
        assert_eq!(received.get(39), Some("00"));
        assert_eq!(store.in_flight(), 0);
        assert_eq!(store.stats().total_completed.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_unknown_key_dropped() {
        let store = PendingStore::new(Duration::from_secs(30));
        assert!(!store.complete(&key("999999"), IsoMessage::new("0210")));
    }

    #[tokio::test]
    async fn test_fail_resolves_waiter() {
        let store = PendingStore::new(Duration::from_secs(30));
        let rx = store.register(key("000123"));
        assert!(store.fail(&key("000123"), DispatchError::Connection("refused".into())));
        let result = rx.await.unwrap();
        assert!(matches!(result, Err(DispatchError::Connection(_))));
    }

    #[tokio::test]
    async fn test_expiry_sweep() {
        let store = PendingStore::new(Duration::from_millis(10));
        let rx1 = store.register(key("000123"));
        let rx2 = store.register(key("000124"));
        assert_eq!(store.in_flight(), 2);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.remove_expired(), 2);
        assert_eq!(store.in_flight(), 0);

        // Waiters observe the dropped sender.
        assert!(rx1.await.is_err());
        assert!(rx2.await.is_err());
        assert_eq!(store.stats().total_timeouts.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn test_duplicate_key_replaces() {
        let store = PendingStore::new(Duration::from_secs(30));
        let rx_old = store.register(key("000123"));
        let rx_new = store.register(key("000123"));
        assert_eq!(store.in_flight(), 1);

        assert!(matches!(
            rx_old.await.unwrap(),
            Err(DispatchError::Unavailable)
        ));
        store.complete(&key("000123"), IsoMessage::new("0210").with(39, "00"));
        assert!(rx_new.await.unwrap().is_ok());
    }
}
