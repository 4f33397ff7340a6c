//! Replay detection.
//!
//! The validator asks a [`ReplayGuard`] whether a signature has already been
//! accepted before it checks freshness, and records the signature only once
//! it has been verified. The default guard, [`NoReplayCheck`], accepts
//! everything. [`InMemoryReplayCache`] remembers accepted signatures for a
//! fixed time-to-live.

use std::collections::VecDeque;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use tracing::debug;

/// Seen-check and record capability for replay detection.
///
/// # Atomicity
///
/// `record` must check and insert as one operation. Two concurrent calls
/// with the same key must not both observe the key as unseen.
pub trait ReplayGuard: Send + Sync + std::fmt::Debug {
    /// Whether `key` has been recorded and has not expired at `now_millis`.
    fn is_seen(&self, key: &str, now_millis: i64) -> bool;

    /// Record `key` as accepted at `now_millis`.
    ///
    /// Returns `true` if the key was already recorded and has not expired,
    /// in which case the existing record is left untouched.
    fn record(&self, key: &str, now_millis: i64) -> bool;
}

/// A guard that never reports a replay.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReplayCheck;

impl ReplayGuard for NoReplayCheck {
    fn is_seen(&self, _key: &str, _now_millis: i64) -> bool {
        false
    }

    fn record(&self, _key: &str, _now_millis: i64) -> bool {
        false
    }
}

/// A bounded, TTL-evicting replay cache.
///
/// Each key maps to the epoch milliseconds at which it expires. Keys are also
/// queued in insertion order; with a fixed TTL that is expiry order, so
/// expired entries and, once the cache is over capacity, the oldest entries
/// are dropped from the front of the queue. Every queued key is popped at
/// most once, so eviction work per insert is amortized constant.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use g2o_auth::replay::{InMemoryReplayCache, ReplayGuard};
///
/// let cache = InMemoryReplayCache::new(Duration::from_secs(60), 1024);
/// assert!(!cache.record("sig", 0));
/// assert!(cache.is_seen("sig", 1_000));
/// assert!(cache.record("sig", 1_000));
/// assert!(!cache.is_seen("sig", 61_000));
/// ```
#[derive(Debug)]
pub struct InMemoryReplayCache {
    entries: DashMap<String, i64>,
    order: Mutex<VecDeque<(i64, String)>>,
    ttl_millis: i64,
    capacity: usize,
}

impl InMemoryReplayCache {
    /// Create a cache that remembers keys for `ttl` (at least 1 ms) and holds
    /// at most `capacity` entries (a capacity of 0 is treated as 1).
    #[must_use]
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
            ttl_millis: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX).max(1),
            capacity: capacity.max(1),
        }
    }

    /// Number of entries currently held, including expired ones not yet purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop entries from the front of the queue that have expired at `now_millis`.
    pub fn purge_expired(&self, now_millis: i64) {
        let mut order = self.order.lock();
        self.evict(&mut order, now_millis);
    }

    /// Pop queued keys while the front has expired or the cache is over
    /// capacity. A queued key whose map entry has since been renewed is
    /// discarded without touching the map.
    fn evict(&self, order: &mut VecDeque<(i64, String)>, now_millis: i64) {
        while let Some(&(expires_at, _)) = order.front() {
            if expires_at > now_millis && self.entries.len() <= self.capacity {
                break;
            }
            let Some((expires_at, key)) = order.pop_front() else {
                break;
            };
            if self
                .entries
                .remove_if(&key, |_, current| *current == expires_at)
                .is_some()
                && expires_at > now_millis
            {
                debug!("replay cache full, evicting oldest entry");
            }
        }
    }
}

impl ReplayGuard for InMemoryReplayCache {
    fn is_seen(&self, key: &str, now_millis: i64) -> bool {
        self.entries
            .get(key)
            .is_some_and(|expires_at| *expires_at > now_millis)
    }

    fn record(&self, key: &str, now_millis: i64) -> bool {
        let mut order = self.order.lock();
        let expires_at = now_millis.saturating_add(self.ttl_millis);

        // The map guard is released before eviction touches the same shard.
        let already_seen = match self.entries.entry(key.to_owned()) {
            Entry::Occupied(mut occupied) => {
                if *occupied.get() > now_millis {
                    true
                } else {
                    occupied.insert(expires_at);
                    false
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(expires_at);
                false
            }
        };
        if already_seen {
            return true;
        }

        order.push_back((expires_at, key.to_owned()));
        self.evict(&mut order, now_millis);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_never_report_replay_without_check() {
        let guard = NoReplayCheck;
        assert!(!guard.record("a", 0));
        assert!(!guard.record("a", 0));
        assert!(!guard.is_seen("a", 0));
    }

    #[test]
    fn test_should_detect_repeated_key_within_ttl() {
        let cache = InMemoryReplayCache::new(Duration::from_secs(30), 16);
        assert!(!cache.is_seen("a", 1_000));
        assert!(!cache.record("a", 1_000));
        assert!(cache.is_seen("a", 2_000));
        assert!(cache.record("a", 2_000));
        assert!(!cache.record("b", 2_000));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_should_not_record_on_seen_check() {
        let cache = InMemoryReplayCache::new(Duration::from_secs(30), 16);
        assert!(!cache.is_seen("a", 0));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_should_accept_key_again_after_expiry() {
        let cache = InMemoryReplayCache::new(Duration::from_secs(1), 16);
        assert!(!cache.record("a", 0));
        assert!(!cache.is_seen("a", 1_000));
        assert!(!cache.record("a", 1_000));
        assert!(cache.record("a", 1_500));
    }

    #[test]
    fn test_should_purge_expired_entries() {
        let cache = InMemoryReplayCache::new(Duration::from_secs(1), 16);
        cache.record("a", 0);
        cache.record("b", 500);
        cache.purge_expired(1_200);
        assert_eq!(cache.len(), 1);
        cache.purge_expired(10_000);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_should_detect_replay_of_oldest_key_when_full() {
        let cache = InMemoryReplayCache::new(Duration::from_secs(60), 2);
        assert!(!cache.record("a", 0));
        assert!(!cache.record("b", 10));

        assert!(cache.is_seen("a", 20));
        assert!(cache.record("a", 20));
        assert_eq!(cache.len(), 2);
        assert!(cache.is_seen("b", 20));
    }

    #[test]
    fn test_should_evict_in_insertion_order_when_over_capacity() {
        let cache = InMemoryReplayCache::new(Duration::from_secs(60), 2);
        cache.record("a", 0);
        cache.record("b", 10);
        cache.record("c", 20);
        assert_eq!(cache.len(), 2);
        assert!(!cache.is_seen("a", 20));
        assert!(cache.is_seen("b", 20));
        assert!(cache.is_seen("c", 20));

        cache.record("d", 30);
        assert!(!cache.is_seen("b", 30));
        assert!(cache.is_seen("c", 30));
        assert!(cache.is_seen("d", 30));
    }

    #[test]
    fn test_should_bound_queue_to_live_entries() {
        let cache = InMemoryReplayCache::new(Duration::from_secs(60), 8);
        for i in 0..1_000 {
            cache.record(&format!("key-{i}"), i);
        }
        assert_eq!(cache.len(), 8);
        assert_eq!(cache.order.lock().len(), 8);
    }

    #[test]
    fn test_should_drop_stale_queue_entry_for_renewed_key() {
        let cache = InMemoryReplayCache::new(Duration::from_secs(1), 4);
        cache.record("a", 0);
        // Renewed after expiry; the first queued copy is stale.
        assert!(!cache.record("a", 1_000));
        cache.purge_expired(1_500);
        assert!(cache.is_seen("a", 1_500));
        assert_eq!(cache.order.lock().len(), 1);
    }

    #[test]
    fn test_should_record_each_key_once_under_contention() {
        let cache = InMemoryReplayCache::new(Duration::from_secs(60), 1024);
        let first_sightings = std::sync::atomic::AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    if !cache.record("shared", 0) {
                        first_sightings.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                    }
                });
            }
        });

        assert_eq!(
            first_sightings.load(std::sync::atomic::Ordering::Relaxed),
            1
        );
    }
}
