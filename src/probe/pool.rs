// src/probe/pool.rs
// =============================================================================
// This module schedules probes over the lazy target stream with bounded
// concurrency.
//
// How it works:
// 1. Each target becomes one future
// 2. buffer_unordered(threads) keeps at most `threads` of them in flight;
//    a new target is only pulled from the generator when a slot frees up,
//    so even a /8 block never floods memory or the network
// 3. Before its real request, a task resolves the soft-404 baseline for
//    its host/port/protocol: the dedup tracker picks exactly one task to
//    capture it, and everyone else awaits that same capture through a
//    shared once-cell instead of probing unfiltered while it's in flight
// 4. Accepted results go to the sink channel
//
// Why buffer_unordered and not one task per target?
// - Spawning 16 million tasks for a /8 would be wasteful
// - buffer_unordered gives us the slot-pool semantics for free: it IS the
//   backpressure mechanism, and results come back in completion order,
//   which we don't care about anyway
// =============================================================================

use crate::dedup::SeenSet;
use crate::probe::{build_client, probe_target, ProbeConfig};
use crate::sink::SinkMessage;
use crate::soft404::{self, BaselineSample};
use crate::target::Target;
use crate::util::Randomness;
use anyhow::Result;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, OnceCell};

// One awaitable baseline slot per soft404_key().
//
// The cell holds None when capture failed (filtering stays off for that
// endpoint) and is shared read-only once initialized. Tasks that arrive
// while the capture request is still in flight await the cell rather than
// reading an empty map.
type BaselineCell = Arc<OnceCell<Option<Arc<BaselineSample>>>>;
type BaselineMap = Arc<Mutex<HashMap<String, BaselineCell>>>;

// Consumes the target stream, probing with bounded concurrency.
//
// Returns the number of targets processed (probed, skipped or suppressed
// alike) once the generator is exhausted and the pool has drained.
pub async fn run_probes(
    config: Arc<ProbeConfig>,
    targets: impl Iterator<Item = Target>,
    sink: mpsc::Sender<SinkMessage>,
    random: Randomness,
) -> Result<usize> {
    let client = build_client(config.timeout_secs)?;
    let baseline_seen = Arc::new(SeenSet::new());
    let baselines: BaselineMap = Arc::default();

    let probes = targets.map(|target| {
        // Each task gets its own cheap handles to the shared pieces
        let client = client.clone();
        let config = Arc::clone(&config);
        let sink = sink.clone();
        let random = random.clone();
        let baseline_seen = Arc::clone(&baseline_seen);
        let baselines = Arc::clone(&baselines);

        async move {
            // First task to claim this host/port/protocol creates the
            // baseline cell; claim and insert happen under one map lock,
            // so later tasks always find the cell and await the same
            // capture. A failed capture initializes the cell to None,
            // which disables soft-404 filtering for that endpoint.
            let mut baseline = None;
            if config.soft404 {
                let key = target.soft404_key();
                let cell = {
                    let mut map = baselines.lock().unwrap();
                    if !baseline_seen.check_and_mark(&key) {
                        map.insert(key.clone(), Arc::new(OnceCell::new()));
                    }
                    map.get(&key).map(Arc::clone)
                };
                if let Some(cell) = cell {
                    baseline = cell
                        .get_or_init(|| async {
                            soft404::capture_baseline(&client, &target, &random)
                                .await
                                .map(Arc::new)
                        })
                        .await
                        .clone();
                }
            }

            if let Some(result) = probe_target(&client, &config, target, baseline, &random).await {
                // Channel send only fails when the sink is gone, at which
                // point there is nobody left to tell
                let line = format!("{}\n", result.final_url);
                let _ = sink.send(SinkMessage::AcceptedUrl(line)).await;
                let _ = sink.send(SinkMessage::Result(result)).await;
            }
        }
    });

    let probed = stream::iter(probes)
        .buffer_unordered(config.threads.max(1))
        .fold(0usize, |count, _| async move { count + 1 })
        .await;

    Ok(probed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProbeResult;
    use std::collections::HashSet;
    use std::time::{Duration, Instant};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(dir: &std::path::Path, threads: usize) -> Arc<ProbeConfig> {
        Arc::new(ProbeConfig {
            threads,
            soft404: false,
            ignore_status: HashSet::new(),
            response_dir: dir.to_path_buf(),
            timeout_secs: 5,
            ..ProbeConfig::default()
        })
    }

    fn targets_for(server: &MockServer, paths: &[&str]) -> Vec<Target> {
        paths
            .iter()
            .map(|p| Target {
                host_addr: "127.0.0.1".to_string(),
                port: server.address().port(),
                protocol: "http".to_string(),
                path: p.to_string(),
            })
            .collect()
    }

    // Drives the pool and splits the sink stream back into its two record
    // kinds, the way main's sink task would see them.
    async fn run_collecting(
        config: Arc<ProbeConfig>,
        targets: Vec<Target>,
    ) -> (usize, Vec<String>, Vec<ProbeResult>) {
        let (tx, mut rx) = mpsc::channel(64);
        let collector = tokio::spawn(async move {
            let mut lines = Vec::new();
            let mut results = Vec::new();
            while let Some(message) = rx.recv().await {
                match message {
                    SinkMessage::AcceptedUrl(line) => lines.push(line),
                    SinkMessage::Result(result) => results.push(result),
                }
            }
            (lines, results)
        });

        let probed = run_probes(config, targets.into_iter(), tx, Randomness::from_seed(Some(1)))
            .await
            .unwrap();
        let (lines, results) = collector.await.unwrap();
        (probed, lines, results)
    }

    #[tokio::test]
    async fn test_end_to_end_all_targets_accepted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), 4);
        let targets = targets_for(&server, &["a", "b", "c", "d"]);

        let (probed, lines, results) = run_collecting(config, targets).await;

        assert_eq!(probed, 4);
        assert_eq!(results.len(), 4);
        assert_eq!(lines.len(), 4);
        for line in &lines {
            assert!(line.ends_with('\n'));
        }
        // One non-empty body file per accepted result
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 4);
        for result in &results {
            let body = std::fs::read_to_string(result.body_file.as_ref().unwrap()).unwrap();
            assert_eq!(body, "ok");
        }
    }

    #[tokio::test]
    async fn test_pool_never_exceeds_slot_count() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("slow")
                    .set_delay(Duration::from_millis(100)),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), 2);
        let targets = targets_for(&server, &["a", "b", "c", "d", "e", "f", "g", "h"]);

        // 8 requests of >=100ms each through 2 slots cannot finish in
        // under 4 serial rounds; anything faster would mean more than 2
        // probes were in flight at once
        let started = Instant::now();
        let (probed, _, results) = run_collecting(config, targets).await;
        assert!(started.elapsed() >= Duration::from_millis(400));
        assert_eq!(probed, 8);
        assert_eq!(results.len(), 8);
    }

    #[tokio::test]
    async fn test_baseline_captured_once_and_soft404s_suppressed() {
        let server = MockServer::start().await;
        // Every path, including the random baseline path, returns the same
        // catch-all page
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("page not found sorry"))
            .expect(4) // 1 baseline capture + 3 probes
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = Arc::new(ProbeConfig {
            threads: 1,
            ignore_status: HashSet::new(),
            response_dir: dir.path().to_path_buf(),
            timeout_secs: 5,
            ..ProbeConfig::default()
        });
        let targets = targets_for(&server, &["admin", "login", "backup"]);

        let (probed, lines, results) = run_collecting(config, targets).await;

        assert_eq!(probed, 3);
        // All three look exactly like the not-found baseline
        assert!(results.is_empty());
        assert!(lines.is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_soft404_filters_paths_arriving_during_capture() {
        let server = MockServer::start().await;
        // Slow catch-all page: the delay keeps the baseline capture in
        // flight while every other task for the host is already running
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("page not found sorry")
                    .set_delay(Duration::from_millis(100)),
            )
            .expect(5) // 1 baseline capture + 4 probes, never more
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        // More slots than targets, so all four paths enter the pool at
        // once and race the capture
        let config = Arc::new(ProbeConfig {
            threads: 4,
            ignore_status: HashSet::new(),
            response_dir: dir.path().to_path_buf(),
            timeout_secs: 5,
            ..ProbeConfig::default()
        });
        let targets = targets_for(&server, &["admin", "login", "backup", "secret"]);

        let (probed, lines, results) = run_collecting(config, targets).await;

        assert_eq!(probed, 4);
        // Every response matches the baseline exactly; none may slip
        // through just because it raced the capture
        assert!(
            results.is_empty(),
            "soft-404 responses slipped past the filter: {:?}",
            results.iter().map(|r| r.final_url.clone()).collect::<Vec<_>>()
        );
        assert!(lines.is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_failed_probe_drops_without_stalling_pool() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("up"))
            .mount(&server)
            .await;

        // One live endpoint plus one with nothing listening
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let dead_port = listener.local_addr().unwrap().port();
        drop(listener);

        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), 2);
        let mut targets = targets_for(&server, &["live"]);
        targets.push(Target {
            host_addr: "127.0.0.1".to_string(),
            port: dead_port,
            protocol: "http".to_string(),
            path: "dead".to_string(),
        });

        let (probed, _, results) = run_collecting(config, targets).await;
        assert_eq!(probed, 2);
        assert_eq!(results.len(), 1);
        assert!(results[0].final_url.ends_with("/live"));
    }
}
