// src/probe/mod.rs
// =============================================================================
// This module is the probing engine: it drives every network request the
// tool makes.
//
// Submodules:
// - fetch: one target's probe (jitter, request, redirect chase, body file)
// - pool: bounded-concurrency scheduling over the lazy target stream
//
// This file defines the shared configuration and the result type that the
// rest of the application consumes.
// =============================================================================

mod fetch;
mod pool;

pub use fetch::{build_client, probe_target, ProbeResult, MAX_REDIRECT_HOPS};
pub use pool::run_probes;

use std::collections::HashSet;
use std::path::PathBuf;

// Everything a probe task needs to know, assembled once from the CLI and
// shared read-only by every task.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Concurrency bound: at most this many probes in flight at once
    pub threads: usize,
    /// Upper bound for the random pre-request delay (0 disables jitter)
    pub jitter_ms: u64,
    /// Status codes treated as non-results and discarded outright
    pub ignore_status: HashSet<u16>,
    /// Whether 3xx responses are chased (bounded to MAX_REDIRECT_HOPS)
    pub follow_redirects: bool,
    /// Whether soft-404 filtering is active
    pub soft404: bool,
    /// Similarity ratio above which a response is considered a soft 404
    pub soft404_ratio: f64,
    /// Per-request timeout in seconds (each redirect hop gets its own)
    pub timeout_secs: u64,
    /// Optional project name, used only as a body-file prefix
    pub project_name: Option<String>,
    /// Directory that response body files are written into
    pub response_dir: PathBuf,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            threads: 20,
            jitter_ms: 0,
            ignore_status: HashSet::from([404]),
            follow_redirects: true,
            soft404: true,
            soft404_ratio: 0.95,
            timeout_secs: 10,
            project_name: None,
            response_dir: PathBuf::from("responses"),
        }
    }
}
