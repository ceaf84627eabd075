// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up output locations (response directory, accepted-URL log)
// 3. Expand the address specs lazily and run the probe pool over them
// 4. Print the collected results and exit with a proper code
//    (0 = run completed, 2 = setup error)
//
// Rust concepts used:
// - async/await: Because we need to make many network requests concurrently
// - Result<T, E>: For error handling (T = success type, E = error type)
// - Iterators: The target stream stays lazy all the way into the pool
// =============================================================================

// Module declarations - tells Rust about our other source files
mod cli; // src/cli.rs - command-line parsing
mod dedup; // src/dedup/ - "seen before" tracking
mod probe; // src/probe/ - the probing engine
mod sink; // src/sink/ - single-writer result persistence
mod soft404; // src/soft404/ - soft-404 baseline capture and similarity
mod target; // src/target/ - target expansion
mod util; // src/util.rs - randomness, filenames, timestamps

use anyhow::{bail, Result};
use clap::Parser;
use cli::Cli;
use dedup::SeenSet;
use probe::{ProbeConfig, ProbeResult};
use std::sync::Arc;
use util::Randomness;

// The #[tokio::main] attribute transforms our async main into a real main function
// It creates a tokio runtime and runs our async code inside it
#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            // Setup failed in a way we can't recover from
            eprintln!("Error: {}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// This is the main application logic
// Returns:
//   Ok(0) = run completed
//   Err = unrecoverable setup error (log not writable, no targets, ...)
async fn run() -> Result<i32> {
    let cli = Cli::parse();

    // Assemble address specs from positionals and the optional file
    let mut specs = cli.targets.clone();
    if let Some(file) = &cli.targets_file {
        specs.extend(util::read_lines(file)?);
    }
    if specs.is_empty() {
        bail!("no targets given (pass specs as arguments or use --targets-file)");
    }

    // Request paths: none configured means "probe the root once"
    let paths = match &cli.paths_file {
        Some(file) => util::read_lines(file)?,
        None => Vec::new(),
    };

    std::fs::create_dir_all(&cli.response_dir)?;

    let config = Arc::new(ProbeConfig {
        threads: cli.threads as usize,
        jitter_ms: cli.jitter_ms,
        ignore_status: cli.ignore_status.iter().copied().collect(),
        follow_redirects: !cli.no_follow_redirects,
        soft404: !cli.no_soft404,
        soft404_ratio: cli.ratio,
        timeout_secs: cli.timeout_secs,
        project_name: cli.project_name.clone(),
        response_dir: cli.response_dir.clone(),
    });

    // One explicitly constructed random source feeds jitter, baseline
    // paths and filename suffixes; --seed makes a run reproducible
    let random = Randomness::from_seed(cli.seed);

    println!("🔍 Probing {} spec(s) on ports {:?}", specs.len(), cli.ports);

    // The sink must be up before the first probe; failing to open the log
    // is fatal because the run would have no way to record results
    let (sink_tx, sink_handle) = sink::spawn(&cli.url_log, config.threads * 4).await?;

    // Lazy expansion: large CIDR blocks are walked one address at a time
    // as the pool frees up slots
    let targets = target::generate_targets(
        specs,
        cli.ports.clone(),
        cli.protocols.clone(),
        paths,
        Arc::new(SeenSet::new()),
    );

    let probed = probe::run_probes(Arc::clone(&config), targets, sink_tx, random).await?;

    // All senders are gone once run_probes returns; the sink drains and
    // hands us everything it collected
    let results = sink_handle.await?;

    println!("\n📊 Probed {} target(s), {} accepted", probed, results.len());
    print_results(&results, cli.json)?;

    Ok(0)
}

// Prints the results either as a table or JSON
fn print_results(results: &[ProbeResult], json: bool) -> Result<()> {
    if json {
        // Serialize results to JSON and print
        let json_output = serde_json::to_string_pretty(results)?;
        println!("{}", json_output);
    } else {
        // Print human-readable table
        print_table(results);
    }
    Ok(())
}

// Prints results as a human-readable table in the terminal
fn print_table(results: &[ProbeResult]) {
    if results.is_empty() {
        return;
    }

    println!();
    println!("{:<60} {:<8} {:<12} {:<30}", "URL", "STATUS", "BYTES", "BODY FILE");
    println!("{}", "=".repeat(110));

    for result in results {
        // Truncate URL if too long for display
        let url_display = truncate_url(&result.final_url);
        let body_file = result.body_file.as_deref().unwrap_or("<no output file>");

        println!(
            "{:<60} {:<8} {:<12} {:<30}",
            url_display, result.status, result.bytes, body_file
        );
    }
}

// Shortens a URL to 57 characters for the table.
//
// URLs carry whatever bytes the target specs and paths file contained, so
// the cut has to land on a character boundary, not a byte offset.
fn truncate_url(url: &str) -> String {
    match url.char_indices().nth(57) {
        Some((idx, _)) => format!("{}...", &url[..idx]),
        None => url.to_string(),
    }
}
