//! Pod resolver configuration.
//!
//! The guest inherits the pod's DNS setup: nameservers and search domains
//! are read once from the pod's `resolv.conf` at startup. Entries are not
//! validated here; the encoder rejects bad search domains later.

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Used when the pod resolver lists no IPv4 nameserver.
pub const DEFAULT_NAMESERVER: Ipv4Addr = Ipv4Addr::new(8, 8, 8, 8);

/// Used when the pod resolver lists no search domain.
pub const DEFAULT_SEARCH_DOMAIN: &str = "cluster.local";

const NAMESERVER_PREFIX: &str = "nameserver";
const SEARCH_PREFIX: &str = "search";

/// DNS settings handed to the guest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    pub nameservers: Vec<Ipv4Addr>,
    pub search_domains: Vec<String>,
}

impl ResolverConfig {
    /// Parses `resolv.conf` content.
    ///
    /// The first dotted-quad on each `nameserver` line is taken; IPv6 and
    /// malformed entries are skipped. `search` lines may repeat and are
    /// concatenated in order.
    pub fn parse(content: &str) -> Self {
        let mut nameservers = Vec::new();
        let mut search_domains = Vec::new();

        for line in content.lines() {
            if let Some(rest) = line.strip_prefix(NAMESERVER_PREFIX) {
                if let Some(address) = rest
                    .split_whitespace()
                    .find_map(|token| token.parse::<Ipv4Addr>().ok())
                {
                    nameservers.push(address);
                }
            } else if let Some(rest) = line.strip_prefix(SEARCH_PREFIX) {
                search_domains.extend(rest.split_whitespace().map(str::to_string));
            }
        }

        if nameservers.is_empty() {
            nameservers.push(DEFAULT_NAMESERVER);
        }
        if search_domains.is_empty() {
            search_domains.push(DEFAULT_SEARCH_DOMAIN.to_string());
        }

        Self {
            nameservers,
            search_domains,
        }
    }
}

/// Source of the pod's resolver configuration.
pub trait ResolverSource {
    fn resolver_config(&self) -> Result<ResolverConfig>;
}

/// Reads resolver settings from a `resolv.conf` file.
#[derive(Debug, Clone)]
pub struct ResolvConfFile {
    path: PathBuf,
}

impl ResolvConfFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ResolverSource for ResolvConfFile {
    fn resolver_config(&self) -> Result<ResolverConfig> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| Error::ResolvConf {
            path: self.path.clone(),
            source,
        })?;
        Ok(ResolverConfig::parse(&content))
    }
}

impl ResolverSource for ResolverConfig {
    fn resolver_config(&self) -> Result<ResolverConfig> {
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POD_RESOLV_CONF: &str = "search default.svc.cluster.local svc.cluster.local cluster.local\n\
                                   nameserver 10.96.0.10\n\
                                   options ndots:5\n";

    #[test]
    fn test_parse_pod_resolv_conf() {
        let config = ResolverConfig::parse(POD_RESOLV_CONF);
        assert_eq!(config.nameservers, vec![Ipv4Addr::new(10, 96, 0, 10)]);
        assert_eq!(
            config.search_domains,
            vec![
                "default.svc.cluster.local",
                "svc.cluster.local",
                "cluster.local"
            ]
        );
    }

    #[test]
    fn test_parse_skips_ipv6_nameservers() {
        let config = ResolverConfig::parse("nameserver fd00::10\nnameserver 1.1.1.1\n");
        assert_eq!(config.nameservers, vec![Ipv4Addr::new(1, 1, 1, 1)]);
    }

    #[test]
    fn test_parse_multiple_search_lines() {
        let config = ResolverConfig::parse("search a.local\nsearch b.local c.local\nnameserver 8.8.4.4\n");
        assert_eq!(config.search_domains, vec!["a.local", "b.local", "c.local"]);
    }

    #[test]
    fn test_parse_applies_defaults() {
        let config = ResolverConfig::parse("# empty\noptions ndots:2\n");
        assert_eq!(config.nameservers, vec![DEFAULT_NAMESERVER]);
        assert_eq!(config.search_domains, vec![DEFAULT_SEARCH_DOMAIN]);
    }

    #[test]
    fn test_parse_keeps_invalid_search_domains() {
        let config = ResolverConfig::parse("search foo,com\n");
        assert_eq!(config.search_domains, vec!["foo,com"]);
    }

    #[test]
    fn test_missing_file_is_error() {
        let source = ResolvConfFile::new("/nonexistent/vmdhcp/resolv.conf");
        assert!(matches!(
            source.resolver_config(),
            Err(Error::ResolvConf { .. })
        ));
    }

    #[test]
    fn test_reads_file() {
        let path = std::env::temp_dir().join(format!("vmdhcp_resolv_{}.conf", std::process::id()));
        std::fs::write(&path, POD_RESOLV_CONF).unwrap();

        let config = ResolvConfFile::new(&path).resolver_config().unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(config.nameservers.len(), 1);
        assert_eq!(config.search_domains.len(), 3);
    }
}
