// src/soft404/mod.rs
// =============================================================================
// This module detects "soft 404" responses: pages that come back 200 OK but
// are really a not-found page in disguise.
//
// How it works:
// 1. Once per (host, port, protocol), fetch a random path that almost
//    certainly does not exist ("/x7k2m9...") and keep its tokenized body
//    as a baseline
// 2. For every real response, compute how similar its body is to that
//    baseline (0.0 = nothing in common, 1.0 = identical)
// 3. If the similarity exceeds the configured threshold, the "hit" is just
//    the server's catch-all page and gets suppressed
//
// The similarity measure is a sequence-matcher ratio over whitespace
// tokens: 2 * M / T, where M is the total length of matching subsequence
// blocks and T is the combined token count. It is symmetric, 1.0 for
// identical sequences and 0.0 for fully disjoint ones.
// =============================================================================

use crate::target::Target;
use crate::util::Randomness;
use reqwest::Client;
use std::collections::HashMap;

/// Length of the random path used for baseline capture.
const BASELINE_PATH_LENGTH: usize = 20;

// The tokenized body of a known-nonexistent page, captured once per
// (host, port, protocol) and shared read-only by every later probe.
#[derive(Debug, Clone)]
pub struct BaselineSample {
    /// The random URL that was fetched to produce this baseline
    pub probe_url: String,
    /// The response body split on whitespace
    pub tokens: Vec<String>,
}

// Splits a response body into whitespace-separated tokens.
pub fn tokenize(body: &str) -> Vec<String> {
    body.split_whitespace().map(str::to_string).collect()
}

// Fetches a random, near-certainly-nonexistent path on the target's
// host/port/protocol and returns its tokenized body.
//
// Returns None when the request fails; the caller then skips soft-404
// filtering for this endpoint and treats every response as real.
pub async fn capture_baseline(
    client: &Client,
    target: &Target,
    random: &Randomness,
) -> Option<BaselineSample> {
    let probe_url = format!(
        "{}://{}:{}/{}",
        target.protocol,
        target.host_addr,
        target.port,
        random.alnum_string(BASELINE_PATH_LENGTH)
    );
    let response = client.get(&probe_url).send().await.ok()?;
    let body = response.text().await.ok()?;
    Some(BaselineSample {
        probe_url,
        tokens: tokenize(&body),
    })
}

// Computes the similarity ratio between two token sequences.
//
// Identical sequences score 1.0, fully disjoint ones 0.0. Two empty
// sequences are considered identical.
pub fn similarity_ratio(a: &[String], b: &[String]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matches = matching_token_count(a, b, 0, a.len(), 0, b.len());
    2.0 * matches as f64 / total as f64
}

// Total length of all matching blocks between a[alo..ahi] and b[blo..bhi].
//
// Finds the longest common block, then recurses on the pieces to its left
// and right, the same divide-and-conquer a sequence matcher uses.
fn matching_token_count(
    a: &[String],
    b: &[String],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> usize {
    let (i, j, size) = longest_match(a, b, alo, ahi, blo, bhi);
    if size == 0 {
        return 0;
    }
    size + matching_token_count(a, b, alo, i, blo, j)
        + matching_token_count(a, b, i + size, ahi, j + size, bhi)
}

// Finds the longest block of tokens common to a[alo..ahi] and b[blo..bhi].
//
// Returns (start in a, start in b, length). Runs one pass over a, keeping
// for each position in b the length of the common run ending there.
fn longest_match(
    a: &[String],
    b: &[String],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let mut b_positions: HashMap<&str, Vec<usize>> = HashMap::new();
    for (j, token) in b.iter().enumerate().take(bhi).skip(blo) {
        b_positions.entry(token.as_str()).or_default().push(j);
    }

    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    let mut run_lengths: HashMap<usize, usize> = HashMap::new();

    for i in alo..ahi {
        let mut new_runs: HashMap<usize, usize> = HashMap::new();
        if let Some(positions) = b_positions.get(a[i].as_str()) {
            for &j in positions {
                let len = if j == 0 {
                    1
                } else {
                    run_lengths.get(&(j - 1)).copied().unwrap_or(0) + 1
                };
                new_runs.insert(j, len);
                if len > best_size {
                    best_i = i + 1 - len;
                    best_j = j + 1 - len;
                    best_size = len;
                }
            }
        }
        run_lengths = new_runs;
    }

    (best_i, best_j, best_size)
}
