// src/target/expand.rs
// =============================================================================
// This module expands address specifications into a lazy stream of targets.
//
// Accepted specification forms:
// - CIDR block:   "10.0.0.0/24"  -> every address, network through broadcast
// - Bare IP:      "10.0.0.5"     -> that address
// - Hostname:     "intranet"     -> kept verbatim, DNS happens at fetch time
// - Literal URL:  "https://a:8443/?q=1" -> exactly one target, no expansion
//
// Why lazy?
// - A /8 block is 16.7 million addresses
// - Materializing host x port x protocol x path up front would exhaust
//   memory; iterators expand one element at a time as the probe pool pulls
//
// Failure policy: malformed URLs yield no target and no error. Enumeration
// is best-effort by design.
// =============================================================================

use crate::dedup::SeenSet;
use crate::target::Target;
use ipnetwork::IpNetwork;
use std::net::IpAddr;
use std::sync::Arc;
use url::Url;

// Expands a list of address specs into a lazy sequence of targets.
//
// Parameters:
//   specs: address specifications (CIDR / IP / hostname / URL)
//   ports, protocols: crossed with every expanded address
//   paths: request paths; an empty list means "probe the root once"
//   seen: prefetch dedup tracker; an endpoint (host, port) that two
//         overlapping specs both produce is only expanded once
//
// URL specs bypass the cartesian expansion entirely and produce one target.
pub fn generate_targets(
    specs: Vec<String>,
    ports: Vec<u16>,
    protocols: Vec<String>,
    paths: Vec<String>,
    seen: Arc<SeenSet>,
) -> impl Iterator<Item = Target> {
    let paths = if paths.is_empty() {
        vec![String::new()]
    } else {
        paths
    };

    specs.into_iter().flat_map(move |spec| {
        if spec.contains("://") {
            Box::new(parse_url_target(&spec).into_iter()) as Box<dyn Iterator<Item = Target>>
        } else {
            endpoint_targets(
                expand_addresses(&spec),
                ports.clone(),
                protocols.clone(),
                paths.clone(),
                Arc::clone(&seen),
            )
        }
    })
}

// Expands a non-URL spec into addresses.
//
// Tried in order: CIDR block, bare IP, hostname fallthrough.
fn expand_addresses(spec: &str) -> Box<dyn Iterator<Item = String>> {
    if let Ok(network) = spec.parse::<IpNetwork>() {
        // iter() walks the whole block inclusive of network and broadcast
        Box::new(network.iter().map(|ip| ip.to_string()))
    } else if let Ok(ip) = spec.parse::<IpAddr>() {
        Box::new(std::iter::once(ip.to_string()))
    } else {
        // Could be a hostname; keep it and let DNS sort it out later
        Box::new(std::iter::once(spec.to_string()))
    }
}

// Crosses addresses with ports (deduplicated), then protocols and paths.
fn endpoint_targets(
    addrs: Box<dyn Iterator<Item = String>>,
    ports: Vec<u16>,
    protocols: Vec<String>,
    paths: Vec<String>,
    seen: Arc<SeenSet>,
) -> Box<dyn Iterator<Item = Target>> {
    Box::new(addrs.flat_map(move |addr| {
        let seen = Arc::clone(&seen);
        let protocols = protocols.clone();
        let paths = paths.clone();
        ports
            .clone()
            .into_iter()
            .map(move |port| (addr.clone(), port))
            .filter(move |(host, port)| !seen.check_and_mark(&Target::prefetch_key(host, *port)))
            .flat_map(move |(host, port)| {
                expand_endpoint(host, port, protocols.clone(), paths.clone())
            })
    }))
}

// One (host, port) endpoint crossed with every protocol and path.
fn expand_endpoint(
    host: String,
    port: u16,
    protocols: Vec<String>,
    paths: Vec<String>,
) -> impl Iterator<Item = Target> {
    protocols.into_iter().flat_map(move |protocol| {
        let host = host.clone();
        paths.clone().into_iter().map(move |path| Target {
            host_addr: host.clone(),
            port,
            protocol: protocol.clone(),
            path,
        })
    })
}

// Parses a literal URL spec into a single target.
//
// Scheme must be http or https; the port falls back to the scheme default
// (80/443). The query string is carried as the target path. Anything that
// doesn't parse yields no target.
fn parse_url_target(spec: &str) -> Option<Target> {
    let parsed = Url::parse(spec).ok()?;
    let protocol = parsed.scheme().to_lowercase();
    let port = match parsed.port() {
        Some(p) => p,
        None => match protocol.as_str() {
            "http" => 80,
            "https" => 443,
            _ => return None,
        },
    };
    // Non-default ports can still carry a bogus scheme
    if protocol != "http" && protocol != "https" {
        return None;
    }
    Some(Target {
        host_addr: parsed.host_str()?.to_string(),
        port,
        protocol,
        path: parsed.query().unwrap_or("").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate(specs: &[&str], ports: &[u16], protocols: &[&str], paths: &[&str]) -> Vec<Target> {
        generate_targets(
            specs.iter().map(|s| s.to_string()).collect(),
            ports.to_vec(),
            protocols.iter().map(|s| s.to_string()).collect(),
            paths.iter().map(|s| s.to_string()).collect(),
            Arc::new(SeenSet::new()),
        )
        .collect()
    }

    #[test]
    fn test_cidr_slash_30_yields_four_addresses() {
        let targets = generate(&["1.2.3.0/30"], &[80], &["http"], &[]);
        let hosts: Vec<&str> = targets.iter().map(|t| t.host_addr.as_str()).collect();
        assert_eq!(hosts, vec!["1.2.3.0", "1.2.3.1", "1.2.3.2", "1.2.3.3"]);
    }

    #[test]
    fn test_cidr_crossed_with_every_port() {
        let targets = generate(&["1.2.3.0/31"], &[80, 443], &["http"], &[]);
        assert_eq!(targets.len(), 4);
        for port in [80, 443] {
            assert_eq!(targets.iter().filter(|t| t.port == port).count(), 2);
        }
    }

    #[test]
    fn test_single_address_block_yields_one_address() {
        let targets = generate(&["1.2.3.4/32"], &[80], &["http"], &[]);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].host_addr, "1.2.3.4");
    }

    #[test]
    fn test_bare_ip_and_hostname_pass_through() {
        let targets = generate(&["192.0.2.7", "intranet.local"], &[80], &["http"], &[]);
        let hosts: Vec<&str> = targets.iter().map(|t| t.host_addr.as_str()).collect();
        assert_eq!(hosts, vec!["192.0.2.7", "intranet.local"]);
    }

    #[test]
    fn test_overlapping_specs_are_deduplicated() {
        // 1.2.3.0/31 is contained in 1.2.3.0/30; its two addresses must not
        // be expanded a second time
        let targets = generate(&["1.2.3.0/30", "1.2.3.0/31"], &[80], &["http"], &[]);
        assert_eq!(targets.len(), 4);
    }

    #[test]
    fn test_paths_and_protocols_cartesian() {
        let targets = generate(
            &["1.2.3.4"],
            &[8080],
            &["http", "https"],
            &["admin", "login"],
        );
        assert_eq!(targets.len(), 4);
        assert!(targets
            .iter()
            .any(|t| t.protocol == "https" && t.path == "login"));
    }

    #[test]
    fn test_url_spec_bypasses_expansion() {
        let targets = generate(&["https://example.com/search?q=1"], &[80, 8080], &["http"], &[]);
        assert_eq!(targets.len(), 1);
        let t = &targets[0];
        assert_eq!(t.host_addr, "example.com");
        assert_eq!(t.port, 443); // scheme default, not the configured ports
        assert_eq!(t.protocol, "https");
        assert_eq!(t.path, "q=1"); // query string carried as path
    }

    #[test]
    fn test_url_spec_with_explicit_port() {
        let targets = generate(&["http://example.com:8443/"], &[80], &["http"], &[]);
        assert_eq!(targets[0].port, 8443);
    }

    #[test]
    fn test_unrecognized_scheme_yields_nothing() {
        assert!(generate(&["ftp://example.com/"], &[80], &["http"], &[]).is_empty());
        assert!(generate(&["gopher://example.com"], &[80], &["http"], &[]).is_empty());
    }

    #[test]
    fn test_malformed_url_is_skipped_silently() {
        assert!(generate(&["http://"], &[80], &["http"], &[]).is_empty());
    }

    #[test]
    fn test_expansion_is_lazy() {
        // A /8 holds 16.7M addresses; taking three must not expand the rest
        let mut iter = generate_targets(
            vec!["10.0.0.0/8".to_string()],
            vec![80],
            vec!["http".to_string()],
            vec![],
            Arc::new(SeenSet::new()),
        );
        assert_eq!(iter.next().unwrap().host_addr, "10.0.0.0");
        assert_eq!(iter.next().unwrap().host_addr, "10.0.0.1");
        assert_eq!(iter.next().unwrap().host_addr, "10.0.0.2");
    }
}
