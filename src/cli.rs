// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// clap is a popular Rust library for parsing command-line arguments.
// We use the "derive" API which lets us define the CLI structure using
// Rust structs and attributes (the #[...] things).
//
// There are no subcommands: webgrabber does one thing, so every option
// hangs directly off the top-level parser.
// =============================================================================

use clap::Parser;
use std::path::PathBuf;

// This struct represents our entire CLI application
//
// #[derive(Parser)] tells clap to automatically generate parsing code
// The #[command(...)] attributes configure how the CLI behaves
#[derive(Parser, Debug)]
#[command(
    name = "webgrabber",
    version = "0.1.0",
    about = "Discover reachable web content by probing hosts, ports and paths",
    long_about = "webgrabber expands address specifications (IPs, CIDR blocks, hostnames, URLs) \
                  into candidate endpoints, probes them over HTTP/HTTPS with bounded concurrency, \
                  filters soft-404 responses, and records every accepted URL and response body."
)]
pub struct Cli {
    /// Address specifications: IP, CIDR block, hostname, or full URL
    ///
    /// These are positional; combine freely, e.g.
    /// webgrabber 10.0.0.0/24 intranet.local https://app.example.com:8443/
    pub targets: Vec<String>,

    /// File with one address specification per line
    #[arg(long)]
    pub targets_file: Option<PathBuf>,

    /// Ports to probe on every expanded address
    #[arg(long, value_delimiter = ',', default_value = "80,443")]
    pub ports: Vec<u16>,

    /// Protocols to try on every endpoint
    #[arg(long, value_delimiter = ',', default_value = "http,https")]
    pub protocols: Vec<String>,

    /// File with one request path per line (default: probe the root only)
    #[arg(long)]
    pub paths_file: Option<PathBuf>,

    /// Concurrent probe slots
    ///
    /// At most this many probes are on the wire at once. The target
    /// generator is lazy, so this is the only throttle the run needs.
    #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u64).range(1..))]
    pub threads: u64,

    /// Upper bound in milliseconds for the random delay before each probe
    #[arg(long, default_value_t = 0)]
    pub jitter_ms: u64,

    /// Status codes discarded without producing a result
    #[arg(long, value_delimiter = ',', default_value = "404")]
    pub ignore_status: Vec<u16>,

    /// Don't follow 3xx redirects
    #[arg(long)]
    pub no_follow_redirects: bool,

    /// Disable soft-404 similarity filtering
    #[arg(long)]
    pub no_soft404: bool,

    /// Similarity ratio above which a response counts as a soft 404
    #[arg(long, default_value_t = 0.95)]
    pub ratio: f64,

    /// Per-request timeout in seconds (each redirect hop gets its own)
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Project name, used only as a prefix on response body filenames
    #[arg(long)]
    pub project_name: Option<String>,

    /// Directory for response body files
    #[arg(long, default_value = "responses")]
    pub response_dir: PathBuf,

    /// Accepted-URL log (append-only, one URL per line)
    #[arg(long, default_value = "urls.txt")]
    pub url_log: PathBuf,

    /// Output results in JSON format instead of a table
    #[arg(long)]
    pub json: bool,

    /// Seed for the random generator (jitter, baseline paths, filenames)
    ///
    /// Mostly useful for reproducing a run in tests
    #[arg(long)]
    pub seed: Option<u64>,
}
