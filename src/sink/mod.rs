// src/sink/mod.rs
// =============================================================================
// This module is the single-writer result sink.
//
// How it works:
// 1. spawn() opens the accepted-URL log up front (failing here is fatal:
//    a run that cannot record results is pointless)
// 2. Probe tasks push messages into a bounded channel
// 3. One dedicated task drains the channel, appends URL records to the log
//    (flushing after every write) and collects ProbeResults
// 4. When every sender is dropped the task finishes and hands the collected
//    results back
//
// Why a single writer?
// - Dozens of probe tasks complete concurrently
// - If they all wrote to the log themselves, lines would interleave
// - Funneling every write through one task is the only serialization point
//   the whole program needs; all other per-target state is task-owned
// =============================================================================

use crate::probe::ProbeResult;
use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

// One record accepted by a probe task.
#[derive(Debug)]
pub enum SinkMessage {
    /// A line for the accepted-URL log (newline included)
    AcceptedUrl(String),
    /// A completed probe result, collected for the final summary
    Result(ProbeResult),
}

// Opens the accepted-URL log and starts the writer task.
//
// Returns the sender half for probe tasks plus a join handle that yields
// every collected ProbeResult once all senders are dropped.
//
// Errors here (log not creatable/appendable) are fatal to the run.
pub async fn spawn(
    log_path: &Path,
    capacity: usize,
) -> Result<(mpsc::Sender<SinkMessage>, JoinHandle<Vec<ProbeResult>>)> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .await
        .with_context(|| format!("could not open accepted-URL log {}", log_path.display()))?;

    let (tx, mut rx) = mpsc::channel::<SinkMessage>(capacity);

    let handle = tokio::spawn(async move {
        let mut writer = BufWriter::new(file);
        let mut results = Vec::new();

        while let Some(message) = rx.recv().await {
            match message {
                SinkMessage::AcceptedUrl(line) => {
                    // Flush after every record so a crash mid-run loses
                    // nothing already accepted
                    if let Err(e) = writer.write_all(line.as_bytes()).await {
                        eprintln!("  Warning: failed to write URL log: {}", e);
                    } else if let Err(e) = writer.flush().await {
                        eprintln!("  Warning: failed to flush URL log: {}", e);
                    }
                }
                SinkMessage::Result(result) => results.push(result),
            }
        }

        let _ = writer.flush().await;
        results
    });

    Ok((tx, handle))
}
