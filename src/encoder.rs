//! Wire formats for the lease options.
//!
//! The lease payload is encoded once at startup into an [`OptionsMap`]
//! (option code to exact value bytes) which every OFFER and ACK then
//! carries verbatim. Inputs that are absent, empty or zero produce no
//! option at all; a degenerate value is never emitted.
//!
//! # References
//!
//! - RFC 1035 §3.1: domain name wire format
//! - RFC 3397: Domain Search Option (119)
//! - RFC 3442: Classless Static Route Option (121)

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use crate::config::CustomOptions;
use crate::error::DomainListError;
use crate::lease::{LeaseConfig, RouteEntry};
use crate::options::{DhcpOption, MAX_OPTION_LEN, OptionCode};

/// Longest domain name in presentation form, without the trailing dot.
const MAX_DOMAIN_LEN: usize = 253;

/// Longest single label.
const MAX_LABEL_LEN: usize = 63;

/// Encodes routes for option 121.
///
/// Routes with a destination keep their relative order; default routes
/// always go last. Each entry is the prefix length, the significant
/// `ceil(prefix / 8)` bytes of the destination network and the 4-byte
/// gateway (zero when the route has none). An empty slice yields an empty
/// vector.
pub fn encode_classless_routes(routes: &[RouteEntry]) -> Vec<u8> {
    let (defaults, specific): (Vec<&RouteEntry>, Vec<&RouteEntry>) =
        routes.iter().partition(|route| route.is_default());

    let mut encoded = Vec::with_capacity(routes.len() * 9);
    for route in specific.into_iter().chain(defaults) {
        let prefix = route.prefix_len();
        encoded.push(prefix);
        if let Some(destination) = route.destination {
            let significant = usize::from(prefix).div_ceil(8);
            encoded.extend_from_slice(&destination.network().octets()[..significant]);
        }
        encoded.extend_from_slice(&route.gateway.unwrap_or(Ipv4Addr::UNSPECIFIED).octets());
    }

    encoded
}

/// Checks a search domain against host name syntax.
///
/// A single trailing dot is allowed. Labels must be non-empty, at most 63
/// bytes and made of ASCII letters, digits and inner hyphens.
pub fn is_valid_search_domain(domain: &str) -> bool {
    if domain.starts_with('-') || domain.ends_with('-') {
        return false;
    }

    let name = domain.strip_suffix('.').unwrap_or(domain);
    if name.is_empty() || name.len() > MAX_DOMAIN_LEN {
        return false;
    }

    name.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= MAX_LABEL_LEN
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .bytes()
                .all(|byte| byte.is_ascii_alphanumeric() || byte == b'-')
    })
}

/// Encodes search domains for option 119.
///
/// Each domain becomes a sequence of length-prefixed labels closed by a
/// zero byte. No compression pointers are used.
///
/// # Errors
///
/// [`DomainListError::InvalidDomain`] for the first domain failing
/// [`is_valid_search_domain`], [`DomainListError::TooLong`] when the result
/// would not fit in a single 255 byte option.
pub fn encode_domain_search(domains: &[String]) -> Result<Vec<u8>, DomainListError> {
    let mut encoded = Vec::new();

    for domain in domains {
        if !is_valid_search_domain(domain) {
            return Err(DomainListError::InvalidDomain(domain.clone()));
        }

        let name = domain.strip_suffix('.').unwrap_or(domain);
        for label in name.split('.') {
            encoded.push(label.len() as u8);
            encoded.extend_from_slice(label.as_bytes());
        }
        encoded.push(0);
    }

    if encoded.len() > MAX_OPTION_LEN {
        return Err(DomainListError::TooLong(encoded.len()));
    }

    Ok(encoded)
}

/// Picks the value of the legacy domain name option (15).
///
/// The entry with the most labels wins; on a tie the earlier entry is kept.
/// This is a compatibility choice matching how pod search lists are
/// ordered (most specific first), not a rule taken from an RFC.
/// Returns `None` only for an empty list.
pub fn select_domain_name(domains: &[String]) -> Option<&str> {
    let label_count = |domain: &str| domain.trim_end_matches('.').split('.').count();

    let mut selected: Option<&str> = None;
    for domain in domains {
        match selected {
            Some(current) if label_count(domain) <= label_count(current) => {}
            _ => selected = Some(domain),
        }
    }

    selected.map(|domain| domain.strip_suffix('.').unwrap_or(domain))
}

/// Inputs to [`build_options`]. Every field may be absent or empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionInputs<'a> {
    pub subnet_mask: Option<Ipv4Addr>,
    pub router: Option<Ipv4Addr>,
    pub nameservers: &'a [Ipv4Addr],
    pub routes: &'a [RouteEntry],
    pub search_domains: &'a [String],
    pub mtu: u16,
    pub hostname: &'a str,
    pub custom: Option<&'a CustomOptions>,
}

impl<'a> From<&'a LeaseConfig> for OptionInputs<'a> {
    fn from(lease: &'a LeaseConfig) -> Self {
        Self {
            subnet_mask: Some(lease.subnet_mask()),
            router: Some(lease.gateway),
            nameservers: &lease.nameservers,
            routes: &lease.routes,
            search_domains: &lease.search_domains,
            mtu: lease.mtu,
            hostname: lease.hostname.as_deref().unwrap_or_default(),
            custom: lease.custom_options.as_ref(),
        }
    }
}

/// Encoded lease options, keyed by option code.
///
/// Built once by [`build_options`] and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionsMap(BTreeMap<u8, Vec<u8>>);

impl OptionsMap {
    pub fn get(&self, code: u8) -> Option<&[u8]> {
        self.0.get(&code).map(Vec::as_slice)
    }

    pub fn contains(&self, code: OptionCode) -> bool {
        self.0.contains_key(&(code as u8))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &[u8])> {
        self.0.iter().map(|(code, value)| (*code, value.as_slice()))
    }

    /// The map as packet options, in ascending code order.
    pub fn to_options(&self) -> Vec<DhcpOption> {
        self.0
            .iter()
            .map(|(code, value)| DhcpOption::Raw(*code, value.clone()))
            .collect()
    }

    fn insert(&mut self, code: OptionCode, value: Vec<u8>) {
        self.0.insert(code as u8, value);
    }
}

fn concat_addresses(addresses: &[Ipv4Addr]) -> Vec<u8> {
    addresses.iter().flat_map(|address| address.octets()).collect()
}

/// Encodes every present input into its option.
///
/// # Errors
///
/// Only the search domain list can fail; see [`encode_domain_search`].
pub fn build_options(inputs: &OptionInputs<'_>) -> Result<OptionsMap, DomainListError> {
    let mut options = OptionsMap::default();

    if let Some(mask) = inputs.subnet_mask.filter(|mask| !mask.is_unspecified()) {
        options.insert(OptionCode::SubnetMask, mask.octets().to_vec());
    }

    if let Some(router) = inputs.router.filter(|router| !router.is_unspecified()) {
        options.insert(OptionCode::Router, router.octets().to_vec());
    }

    if !inputs.nameservers.is_empty() {
        options.insert(OptionCode::DnsServer, concat_addresses(inputs.nameservers));
    }

    if !inputs.routes.is_empty() {
        options.insert(
            OptionCode::ClasslessStaticRoute,
            encode_classless_routes(inputs.routes),
        );
    }

    if !inputs.search_domains.is_empty() {
        let encoded = encode_domain_search(inputs.search_domains)?;
        options.insert(OptionCode::DomainSearch, encoded);

        if let Some(domain_name) = select_domain_name(inputs.search_domains) {
            options.insert(OptionCode::DomainName, domain_name.as_bytes().to_vec());
        }
    }

    if inputs.mtu != 0 {
        options.insert(OptionCode::InterfaceMtu, inputs.mtu.to_be_bytes().to_vec());
    }

    if !inputs.hostname.is_empty() {
        options.insert(OptionCode::Hostname, inputs.hostname.as_bytes().to_vec());
    }

    if let Some(custom) = inputs.custom {
        if let Some(boot_file) = custom.boot_file_name.as_deref().filter(|name| !name.is_empty()) {
            options.insert(OptionCode::BootFileName, boot_file.as_bytes().to_vec());
        }
        if let Some(tftp) = custom.tftp_server_name.as_deref().filter(|name| !name.is_empty()) {
            options.insert(OptionCode::TftpServerName, tftp.as_bytes().to_vec());
        }
        if !custom.ntp_servers.is_empty() {
            options.insert(OptionCode::NtpServers, concat_addresses(&custom.ntp_servers));
        }
        for private in custom
            .private_options
            .iter()
            .filter(|private| !private.value.is_empty())
        {
            options.0.insert(private.option, private.value.as_bytes().to_vec());
        }
    }

    Ok(options)
}
