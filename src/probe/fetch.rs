// src/probe/fetch.rs
// =============================================================================
// This module probes a single target: jitter sleep, HTTP request, bounded
// redirect chase, soft-404 check, body file write.
//
// Key behaviors:
// - Certificate verification is DISABLED on purpose: discovery targets are
//   routinely self-signed or have mismatched names, and we still want to
//   see what they serve
// - Redirects are chased manually (reqwest's auto-follow is turned off) so
//   the ignore set can be checked at every hop
// - Any network error at any hop drops the probe: no retry, no result,
//   and crucially no crash
//
// Rust concepts:
// - Option<T> as control flow: returning None means "no result", which is
//   a normal outcome here, not an error
// - Ownership: the Target moves into this function; nothing about it is
//   shared with other tasks
// =============================================================================

use crate::probe::ProbeConfig;
use crate::soft404::{self, BaselineSample};
use crate::target::Target;
use crate::util::{sanitise_filename, timestamp_string, Randomness};
use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// How many 3xx responses a single probe will follow before treating the
/// last response as final.
pub const MAX_REDIRECT_HOPS: usize = 5;

/// Connect/TLS-handshake timeout, independent of the per-request timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

// One accepted probe outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    /// The endpoint this result came from
    #[serde(flatten)]
    pub target: Target,
    /// The URL originally requested
    pub url: String,
    /// The URL after redirect resolution (same as url when no 3xx was hit)
    pub final_url: String,
    /// Final HTTP status code
    pub status: u16,
    /// Size of the final response body
    pub bytes: usize,
    /// Where the body was written, if it was non-empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_file: Option<String>,
}

// Builds the HTTP client shared by every probe.
//
// One client means one connection pool; it's cheap to clone (internally
// reference counted), which is why probe tasks each get their own copy.
pub fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(CONNECT_TIMEOUT)
        .danger_accept_invalid_certs(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .context("failed to build HTTP client")
}

// Probes one target. Returns None when the target produced no result:
// network error, ignored status code, or soft-404 suppression.
//
// The baseline, when present, is the tokenized body of a random
// nonexistent page on the same host/port/protocol.
pub async fn probe_target(
    client: &Client,
    config: &ProbeConfig,
    target: Target,
    baseline: Option<Arc<BaselineSample>>,
    random: &Randomness,
) -> Option<ProbeResult> {
    let requested_url = target.url();

    // Spread requests out so we don't hammer a host in bursts
    let jitter = random.jitter(config.jitter_ms);
    if !jitter.is_zero() {
        tokio::time::sleep(jitter).await;
    }

    // Redirect chase: at most 1 initial request + MAX_REDIRECT_HOPS follows
    let mut current_url = requested_url.clone();
    let mut final_response: Option<Response> = None;
    for hop in 0..=MAX_REDIRECT_HOPS {
        let response = client.get(&current_url).send().await.ok()?;

        if config.ignore_status.contains(&response.status().as_u16()) {
            return None;
        }

        if response.status().is_redirection() && config.follow_redirects && hop < MAX_REDIRECT_HOPS
        {
            if let Some(next_url) = redirect_location(&response, &current_url) {
                current_url = next_url;
                continue;
            }
            // Unparsable Location header: stop following, this response
            // is as final as it gets
        }

        final_response = Some(response);
        break;
    }

    let response = final_response?;
    let status = response.status().as_u16();
    let body = response.bytes().await.ok()?;

    // A success status with a body that matches the host's "not found"
    // page is a soft 404: suppress it
    if config.soft404 && !target.path.trim_start_matches('/').is_empty() {
        if let Some(baseline) = &baseline {
            let text = String::from_utf8_lossy(&body);
            let ratio = soft404::similarity_ratio(&soft404::tokenize(&text), &baseline.tokens);
            if ratio > config.soft404_ratio {
                return None;
            }
        }
    }

    println!("✅ {} - {} [{} bytes]", current_url, status, body.len());

    let body_file = if body.is_empty() {
        // An empty body produces no file
        None
    } else {
        match write_body_file(config, &current_url, &body, random).await {
            Ok(path) => Some(path),
            Err(e) => {
                // The probe still counts; it just has no body file reference
                eprintln!("  Warning: could not write response body: {}", e);
                None
            }
        }
    };

    Some(ProbeResult {
        target,
        url: requested_url,
        final_url: current_url,
        status,
        bytes: body.len(),
        body_file,
    })
}

// Resolves a 3xx response's Location header against the URL that produced
// it. Returns None when the header is missing or unparsable.
fn redirect_location(response: &Response, current_url: &str) -> Option<String> {
    let location = response
        .headers()
        .get(reqwest::header::LOCATION)?
        .to_str()
        .ok()?;
    let base = Url::parse(current_url).ok()?;
    Some(base.join(location).ok()?.to_string())
}

// Writes a response body to a uniquely named file in the response
// directory and returns its path.
//
// The name combines the sanitized URL, a timestamp and a random integer so
// two probes of the same URL can never collide.
async fn write_body_file(
    config: &ProbeConfig,
    url: &str,
    body: &[u8],
    random: &Randomness,
) -> Result<String> {
    let stem = format!(
        "{}_{}_{}",
        sanitise_filename(url),
        timestamp_string(),
        random.filename_suffix()
    );
    let filename = match &config.project_name {
        Some(project) => format!("{}_{}.html", sanitise_filename(&project.to_lowercase()), stem),
        None => format!("{}.html", stem),
    };
    let path = config.response_dir.join(filename);
    tokio::fs::write(&path, body)
        .await
        .with_context(|| format!("could not write {}", path.display()))?;
    Ok(path.display().to_string())
}
