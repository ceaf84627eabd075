// src/util.rs
// =============================================================================
// Small helpers shared by the rest of the application.
//
// What lives here:
// - Randomness: an explicitly constructed random generator handle
// - sanitise_filename: makes URLs safe to use as file names
// - timestamp_string: wall-clock timestamps for file names
// - read_lines: loads newline-separated entries from a file
//
// Why a Randomness struct instead of rand::thread_rng()?
// - Jitter delays, baseline paths and filename suffixes all need randomness
// - A global generator makes tests non-deterministic
// - Constructing one generator up front and passing it around lets tests
//   seed it and get reproducible behavior
// =============================================================================

use anyhow::{Context, Result};
use rand::distributions::{Alphanumeric, Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// A cloneable handle to one shared random generator.
//
// Cloning is cheap (it's an Arc internally), so every probe task can carry
// its own handle. The Mutex is held only for the few instructions it takes
// to draw a value, never across an .await point.
#[derive(Clone)]
pub struct Randomness {
    inner: Arc<Mutex<StdRng>>,
}

impl Randomness {
    // Creates a generator from an optional seed.
    //
    // Some(seed) = deterministic (used by tests and --seed)
    // None = seeded from the operating system's entropy source
    pub fn from_seed(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self {
            inner: Arc::new(Mutex::new(rng)),
        }
    }

    // Draws a uniformly distributed delay in [0, max_ms] milliseconds.
    //
    // Used for pre-request jitter so probes don't land in bursts.
    pub fn jitter(&self, max_ms: u64) -> Duration {
        if max_ms == 0 {
            return Duration::ZERO;
        }
        let dist = Uniform::new_inclusive(0, max_ms);
        let ms = dist.sample(&mut *self.inner.lock().unwrap());
        Duration::from_millis(ms)
    }

    // Generates a random lowercase alphanumeric string of the given length.
    //
    // Used for the near-certainly-nonexistent baseline paths.
    pub fn alnum_string(&self, length: usize) -> String {
        let mut rng = self.inner.lock().unwrap();
        (0..length)
            .map(|_| char::from(Alphanumeric.sample(&mut *rng)).to_ascii_lowercase())
            .collect()
    }

    // Draws a random integer for filename collision avoidance.
    pub fn filename_suffix(&self) -> u64 {
        self.inner.lock().unwrap().gen()
    }
}

// Replaces every character outside [0-9a-zA-Z-._] with an underscore.
//
// URLs contain '/' and ':' which are not welcome in file names, so anything
// we derive a filename from goes through here first.
pub fn sanitise_filename(unsanitised: &str) -> String {
    unsanitised
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

// Current local time formatted for embedding in file names.
pub fn timestamp_string() -> String {
    chrono::Local::now().format("%Y-%m-%d_%H-%M-%S").to_string()
}

// Reads a whole file into memory and returns its non-empty lines.
//
// Used for --targets-file and --paths-file.
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("could not read {}", path.display()))?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitise_replaces_url_characters() {
        assert_eq!(
            sanitise_filename("http://10.0.0.1:8080/admin?q=1"),
            "http___10.0.0.1_8080_admin_q_1"
        );
    }

    #[test]
    fn test_sanitise_keeps_allowed_characters() {
        assert_eq!(sanitise_filename("my-file_v1.2"), "my-file_v1.2");
    }

    #[test]
    fn test_seeded_randomness_is_deterministic() {
        let a = Randomness::from_seed(Some(42));
        let b = Randomness::from_seed(Some(42));
        assert_eq!(a.alnum_string(20), b.alnum_string(20));
        assert_eq!(a.filename_suffix(), b.filename_suffix());
    }

    #[test]
    fn test_jitter_zero_bound() {
        let random = Randomness::from_seed(Some(1));
        assert_eq!(random.jitter(0), Duration::ZERO);
    }

    #[test]
    fn test_jitter_within_bound() {
        let random = Randomness::from_seed(Some(1));
        for _ in 0..100 {
            assert!(random.jitter(50) <= Duration::from_millis(50));
        }
    }

    #[test]
    fn test_alnum_string_charset() {
        let random = Randomness::from_seed(Some(7));
        let s = random.alnum_string(64);
        assert_eq!(s.len(), 64);
        assert!(s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }
}
