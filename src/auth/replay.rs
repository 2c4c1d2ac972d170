// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bounded LRU set of seen request nonces.
//!
//! Entries are keyed by `"<timestamp>-<nonce>"`. Old entries are evicted
//! silently once capacity is reached; the signature timestamp window is far
//! shorter than the retention of a full cache, so eviction does not reopen a
//! replay window in practice.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

/// Default number of remembered nonces.
pub const DEFAULT_CAPACITY: usize = 100_000;

/// In-process replay cache shared by all request tasks.
pub struct ReplayGuard {
    seen: Mutex<LruCache<String, ()>>,
}

impl ReplayGuard {
    /// Create a guard remembering at most `capacity` nonces (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            seen: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
        }
    }

    /// Record a `(timestamp, nonce)` pair.
    ///
    /// Returns `false` if the pair was already seen. Lookup and insert happen
    /// under one lock acquisition.
    pub fn check_and_record(&self, timestamp: &str, nonce: &str) -> bool {
        let key = format!("{timestamp}-{nonce}");
        let Ok(mut seen) = self.seen.lock() else {
            tracing::error!("nonce cache lock poisoned, rejecting request");
            return false;
        };

        if seen.get(&key).is_some() {
            return false;
        }
        seen.put(key, ());
        true
    }

    /// Number of nonces currently remembered.
    pub fn len(&self) -> usize {
        self.seen.lock().map(|seen| seen.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ReplayGuard {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn first_sight_accepted_second_rejected() {
        let guard = ReplayGuard::new(10);
        assert!(guard.check_and_record("2026-01-01T00:00:00Z", "nonce-aaaaaaaaaaaaaaaa"));
        assert!(!guard.check_and_record("2026-01-01T00:00:00Z", "nonce-aaaaaaaaaaaaaaaa"));
        assert_eq!(guard.len(), 1);
    }

    #[test]
    fn same_nonce_different_timestamp_is_distinct() {
        let guard = ReplayGuard::new(10);
        assert!(guard.check_and_record("2026-01-01T00:00:00Z", "n"));
        assert!(guard.check_and_record("2026-01-01T00:00:01Z", "n"));
    }

    #[test]
    fn evicts_least_recently_used() {
        let guard = ReplayGuard::new(2);
        assert!(guard.check_and_record("t", "a"));
        assert!(guard.check_and_record("t", "b"));
        // Touch "a" so "b" becomes the eviction candidate.
        assert!(!guard.check_and_record("t", "a"));
        assert!(guard.check_and_record("t", "c"));

        assert_eq!(guard.len(), 2);
        assert!(!guard.check_and_record("t", "a"));
        // "b" was evicted and is accepted again.
        assert!(guard.check_and_record("t", "b"));
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let guard = ReplayGuard::new(0);
        assert!(guard.is_empty());
        assert!(guard.check_and_record("t", "a"));
        assert!(!guard.check_and_record("t", "a"));
    }

    #[test]
    fn concurrent_callers_accept_exactly_once() {
        let guard = Arc::new(ReplayGuard::new(1000));
        let accepted = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let guard = Arc::clone(&guard);
                let accepted = Arc::clone(&accepted);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        if guard.check_and_record("2026-01-01T00:00:00Z", "contended-nonce-value") {
                            accepted.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(accepted.load(Ordering::SeqCst), 1);
    }
}
