// src/target/mod.rs
// =============================================================================
// This module defines probe targets and expands address specifications
// (IPs, CIDR blocks, hostnames, literal URLs) into them.
//
// Submodules:
// - expand: lazy expansion of address specs into concrete targets
//
// A Target is one candidate endpoint: host + port + protocol + path.
// Once a target is handed to a probe task, that task owns it exclusively;
// nothing about a target is shared between tasks.
// =============================================================================

mod expand;

pub use expand::generate_targets;

use serde::{Deserialize, Serialize};

// One candidate endpoint to probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// IP address or hostname (resolution deferred to the fetch step)
    pub host_addr: String,
    /// TCP port
    pub port: u16,
    /// "http" or "https"
    pub protocol: String,
    /// Request path, without a leading slash requirement (we strip it)
    pub path: String,
}

impl Target {
    // Builds the request URL for this target.
    //
    // A leading '/' on the path is stripped so we never emit '//admin'.
    pub fn url(&self) -> String {
        format!(
            "{}://{}:{}/{}",
            self.protocol,
            self.host_addr,
            self.port,
            self.path.trim_start_matches('/')
        )
    }

    // Fingerprint for "has this endpoint already been expanded/probed".
    //
    // Keyed on (host, port): protocol and path variants of the same
    // endpoint share one prefetch fingerprint.
    pub fn prefetch_key(host_addr: &str, port: u16) -> String {
        format!("{}:{}", host_addr, port)
    }

    // Fingerprint for "has a soft-404 baseline been captured here".
    //
    // Keyed on (host, port, protocol): http and https on the same port can
    // serve entirely different content, so each needs its own baseline.
    pub fn soft404_key(&self) -> String {
        format!("{}:{}:{}", self.host_addr, self.port, self.protocol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(path: &str) -> Target {
        Target {
            host_addr: "10.0.0.1".to_string(),
            port: 8080,
            protocol: "http".to_string(),
            path: path.to_string(),
        }
    }

    #[test]
    fn test_url_strips_leading_slash() {
        assert_eq!(target("/admin").url(), "http://10.0.0.1:8080/admin");
        assert_eq!(target("admin").url(), "http://10.0.0.1:8080/admin");
    }

    #[test]
    fn test_url_with_empty_path() {
        assert_eq!(target("").url(), "http://10.0.0.1:8080/");
    }

    #[test]
    fn test_identical_tuples_share_fingerprints() {
        let a = target("login");
        let b = target("logout");
        assert_eq!(
            Target::prefetch_key(&a.host_addr, a.port),
            Target::prefetch_key(&b.host_addr, b.port)
        );
        assert_eq!(a.soft404_key(), b.soft404_key());
    }

    #[test]
    fn test_soft404_key_differs_by_protocol() {
        let mut https = target("");
        https.protocol = "https".to_string();
        assert_ne!(target("").soft404_key(), https.soft404_key());
    }
}
