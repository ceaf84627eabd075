// src/dedup/mod.rs
// =============================================================================
// This module provides the deduplication tracker used to avoid repeating
// expensive work (re-probing an endpoint, re-capturing a soft-404 baseline).
//
// How it works:
// - SeenSet is a set of string fingerprints behind a mutex
// - check_and_mark() atomically answers "seen before?" AND marks as seen
// - Two independent instances exist at runtime: one keyed by host:port,
//   one keyed by host:port:protocol
//
// Why atomicity matters:
// - Many probe tasks run concurrently
// - If "check" and "mark" were separate calls, two tasks could both see
//   "not seen" and both do the expensive work
// - Holding the mutex across the insert guarantees exactly one winner
// =============================================================================

use std::collections::HashSet;
use std::sync::Mutex;

// A concurrency-safe set of string fingerprints.
//
// Lives for the duration of one run; nothing is persisted across runs.
#[derive(Debug, Default)]
pub struct SeenSet {
    inner: Mutex<HashSet<String>>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    // Returns true if the fingerprint was already marked, false if this
    // call is the first to see it. Marking happens as a side effect,
    // atomically with the check.
    pub fn check_and_mark(&self, fingerprint: &str) -> bool {
        // HashSet::insert returns true when the value was NOT present
        !self.inner.lock().unwrap().insert(fingerprint.to_string())
    }

    // Marks a fingerprint as seen. Returns true if it was newly added.
    pub fn add(&self, fingerprint: &str) -> bool {
        self.inner.lock().unwrap().insert(fingerprint.to_string())
    }

    // Marks a batch of fingerprints as seen.
    pub fn add_range<I, S>(&self, fingerprints: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = self.inner.lock().unwrap();
        for fp in fingerprints {
            set.insert(fp.into());
        }
    }

    // Tests membership without marking.
    pub fn contains(&self, fingerprint: &str) -> bool {
        self.inner.lock().unwrap().contains(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }
}
