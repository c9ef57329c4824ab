//! Network interface lookups inside the launcher's namespace.

use std::net::SocketAddrV4;

use ipnetwork::{Ipv4Network, ipv4_mask_to_prefix};
use nix::ifaddrs::getifaddrs;

use crate::error::{Error, Result};

/// Source of the guest's intended IPv4 address.
pub trait InterfaceAddressSource {
    /// Returns the first IPv4 address (with prefix) configured on `interface`.
    fn ipv4_network(&self, interface: &str) -> Result<Ipv4Network>;
}

/// Reads addresses from the kernel via `getifaddrs(3)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemInterfaces;

impl InterfaceAddressSource for SystemInterfaces {
    fn ipv4_network(&self, interface: &str) -> Result<Ipv4Network> {
        let lookup_error = |reason: String| Error::InterfaceAddress {
            interface: interface.to_string(),
            reason,
        };

        let addresses = getifaddrs().map_err(|errno| lookup_error(errno.to_string()))?;

        for entry in addresses.filter(|entry| entry.interface_name == interface) {
            let Some(address) = entry.address.as_ref().and_then(|a| a.as_sockaddr_in()) else {
                continue;
            };
            let Some(netmask) = entry.netmask.as_ref().and_then(|m| m.as_sockaddr_in()) else {
                return Err(lookup_error("address has no netmask".to_string()));
            };

            let ip = *SocketAddrV4::from(*address).ip();
            let mask = *SocketAddrV4::from(*netmask).ip();
            let prefix = ipv4_mask_to_prefix(mask)
                .map_err(|error| lookup_error(format!("invalid netmask {}: {}", mask, error)))?;

            return Ipv4Network::new(ip, prefix).map_err(|error| lookup_error(error.to_string()));
        }

        Err(lookup_error("no IPv4 address configured".to_string()))
    }
}

impl InterfaceAddressSource for Ipv4Network {
    fn ipv4_network(&self, _interface: &str) -> Result<Ipv4Network> {
        Ok(*self)
    }
}

/// Resolves an interface name to its kernel index.
pub fn interface_index(interface: &str) -> Result<u32> {
    nix::net::if_::if_nametoindex(interface).map_err(|errno| {
        Error::Socket(format!("Unknown interface {}: {}", interface, errno))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_loopback_address() {
        let network = SystemInterfaces.ipv4_network("lo").unwrap();
        assert_eq!(network.ip(), Ipv4Addr::LOCALHOST);
        assert_eq!(network.prefix(), 8);
    }

    #[test]
    fn test_missing_interface_is_error() {
        let result = SystemInterfaces.ipv4_network("vmdhcp-none0");
        assert!(matches!(result, Err(Error::InterfaceAddress { .. })));
    }

    #[test]
    fn test_loopback_index() {
        assert!(interface_index("lo").unwrap() > 0);
        assert!(interface_index("vmdhcp-none0").is_err());
    }

    #[test]
    fn test_fixed_network_source() {
        let network = Ipv4Network::new(Ipv4Addr::new(10, 244, 0, 7), 24).unwrap();
        assert_eq!(network.ipv4_network("anything").unwrap(), network);
    }
}
