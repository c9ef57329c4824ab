//! The single lease handed to the guest.
//!
//! A [`LeaseConfig`] is assembled once per server start from the guest MAC,
//! the address on the dummy interface and the pod resolver configuration.
//! It never changes afterwards: there is no lease store, no expiry and no
//! renewal bookkeeping. The same lease is offered and acknowledged for the
//! lifetime of the process.

use std::net::Ipv4Addr;

use ipnetwork::Ipv4Network;
use tracing::info;

use crate::config::{Config, CustomOptions};
use crate::error::Result;
use crate::mac::MacAddress;
use crate::netif::InterfaceAddressSource;
use crate::resolv::ResolverSource;

/// Server identifier advertised to the guest.
///
/// Link-local and distinct from both the gateway and any address the guest
/// could be handed, so the responder is never reachable at a leased address.
pub const ADVERTISING_ADDRESS: Ipv4Addr = Ipv4Addr::new(169, 254, 75, 10);

/// Gateway handed to the guest.
pub const GATEWAY_ADDRESS: Ipv4Addr = Ipv4Addr::new(169, 254, 1, 1);

/// Guest MTU, below 1500 to leave room for bridging overhead.
pub const DEFAULT_MTU: u16 = 1480;

/// A static route advertised through option 121.
///
/// A missing destination denotes the default route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteEntry {
    pub destination: Option<Ipv4Network>,
    pub gateway: Option<Ipv4Addr>,
}

impl RouteEntry {
    pub fn new(destination: Option<Ipv4Network>, gateway: Option<Ipv4Addr>) -> Self {
        Self {
            destination,
            gateway,
        }
    }

    /// Default route via `gateway`.
    pub fn default_via(gateway: Ipv4Addr) -> Self {
        Self::new(None, Some(gateway))
    }

    pub fn is_default(&self) -> bool {
        self.destination.is_none_or(|network| network.prefix() == 0)
    }

    /// Destination prefix length; zero for default routes.
    pub fn prefix_len(&self) -> u8 {
        self.destination.map_or(0, |network| network.prefix())
    }
}

/// Everything the guest receives over DHCP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseConfig {
    pub client_mac: MacAddress,
    pub client_address: Ipv4Network,
    pub advertising_address: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub mtu: u16,
    pub routes: Vec<RouteEntry>,
    pub nameservers: Vec<Ipv4Addr>,
    pub search_domains: Vec<String>,
    pub hostname: Option<String>,
    pub custom_options: Option<CustomOptions>,
}

impl LeaseConfig {
    /// Builds the lease for `client_mac`.
    ///
    /// Fails if the dummy interface has no usable IPv4 address or the
    /// resolver configuration cannot be read; nothing is returned partially.
    pub fn assemble(
        client_mac: MacAddress,
        config: &Config,
        interfaces: &dyn InterfaceAddressSource,
        resolver: &dyn ResolverSource,
    ) -> Result<Self> {
        let client_address = interfaces.ipv4_network(&config.dummy_interface)?;
        let resolver_config = resolver.resolver_config()?;

        let gateway = GATEWAY_ADDRESS;
        let on_link = Ipv4Network::new(gateway, 32).ok();
        let routes = vec![RouteEntry::new(on_link, None), RouteEntry::default_via(gateway)];

        info!(
            "Found nameservers: {}",
            join_display(&resolver_config.nameservers)
        );
        info!(
            "Found search domains: {}",
            resolver_config.search_domains.join(" ")
        );

        let lease = Self {
            client_mac,
            client_address,
            advertising_address: ADVERTISING_ADDRESS,
            gateway,
            mtu: config.mtu,
            routes,
            nameservers: resolver_config.nameservers,
            search_domains: resolver_config.search_domains,
            hostname: config.hostname.clone().filter(|name| !name.is_empty()),
            custom_options: config.dhcp_options.clone(),
        };

        info!(
            "Lease for {}: {} via {} (mtu {})",
            lease.client_mac, lease.client_address, lease.gateway, lease.mtu
        );

        Ok(lease)
    }

    /// Address placed in `yiaddr`.
    pub fn client_ip(&self) -> Ipv4Addr {
        self.client_address.ip()
    }

    pub fn subnet_mask(&self) -> Ipv4Addr {
        self.client_address.mask()
    }
}

fn join_display(addresses: &[Ipv4Addr]) -> String {
    addresses
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
