//! Guest NIC hardware addresses.
//!
//! A bridged guest either receives the MAC address requested by the launcher
//! or one derived from the workload's unique identifier. Derived addresses
//! carry the locally administered `52:54` prefix used by QEMU/KVM, followed by
//! the first four bytes of the SHA-1 digest of the identifier.

use std::fmt;
use std::str::FromStr;

use sha1::{Digest, Sha1};

use crate::error::Error;

/// Vendor prefix for derived addresses.
pub const DERIVED_MAC_PREFIX: [u8; 2] = [0x52, 0x54];

/// A 6-byte Ethernet hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Derives a stable address from a workload identifier.
    ///
    /// Identical identifiers always produce identical addresses. Distinct
    /// identifiers may collide; nothing here tries to prevent that.
    pub fn from_identifier(identifier: &str) -> Self {
        let digest = Sha1::digest(identifier.as_bytes());
        let mut bytes = [0u8; 6];
        bytes[..2].copy_from_slice(&DERIVED_MAC_PREFIX);
        bytes[2..].copy_from_slice(&digest[..4]);
        Self(bytes)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }
}

impl FromStr for MacAddress {
    type Err = Error;

    /// Parses `aa:bb:cc:dd:ee:ff` (or `-` separated) notation.
    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        let separator = if value.contains('-') { '-' } else { ':' };
        let parts: Vec<&str> = value.trim().split(separator).collect();
        if parts.len() != 6 {
            return Err(Error::InvalidMac(value.to_string()));
        }

        let mut bytes = [0u8; 6];
        for (byte, part) in bytes.iter_mut().zip(parts) {
            if part.len() != 2 {
                return Err(Error::InvalidMac(value.to_string()));
            }
            *byte =
                u8::from_str_radix(part, 16).map_err(|_| Error::InvalidMac(value.to_string()))?;
        }

        Ok(Self(bytes))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

/// A request for the guest's hardware address, delivered by the launcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MacRequest {
    /// Use this exact address (textual form, validated on resolve).
    Explicit(String),
    /// Derive the address from the workload's unique identifier.
    Derived(String),
}

impl MacRequest {
    pub fn resolve(&self) -> crate::error::Result<MacAddress> {
        match self {
            Self::Explicit(text) => text.parse(),
            Self::Derived(identifier) => Ok(MacAddress::from_identifier(identifier)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_mac_is_deterministic() {
        let first = MacAddress::from_identifier("8d5f3c1e-7a2b-4c9d-b1e0-123456789abc");
        let second = MacAddress::from_identifier("8d5f3c1e-7a2b-4c9d-b1e0-123456789abc");
        assert_eq!(first, second);
        assert_eq!(&first.octets()[..2], &DERIVED_MAC_PREFIX);
    }

    #[test]
    fn test_derived_mac_uses_sha1_prefix() {
        // SHA-1("abc") = a9993e36 4706816a ...
        let mac = MacAddress::from_identifier("abc");
        assert_eq!(mac.octets(), [0x52, 0x54, 0xa9, 0x99, 0x3e, 0x36]);
    }

    #[test]
    fn test_derived_mac_empty_identifier() {
        // SHA-1("") = da39a3ee ...
        let mac = MacAddress::from_identifier("");
        assert_eq!(mac.octets(), [0x52, 0x54, 0xda, 0x39, 0xa3, 0xee]);
    }

    #[test]
    fn test_distinct_identifiers_differ() {
        let first = MacAddress::from_identifier("vmi-a");
        let second = MacAddress::from_identifier("vmi-b");
        assert_ne!(first, second);
    }

    #[test]
    fn test_parse_and_display() {
        let mac: MacAddress = "02:00:5E:10:00:01".parse().unwrap();
        assert_eq!(mac.octets(), [0x02, 0x00, 0x5e, 0x10, 0x00, 0x01]);
        assert_eq!(mac.to_string(), "02:00:5e:10:00:01");

        let dashed: MacAddress = "02-00-5e-10-00-01".parse().unwrap();
        assert_eq!(dashed, mac);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("02:00:5e:10:00".parse::<MacAddress>().is_err());
        assert!("02:00:5e:10:00:zz".parse::<MacAddress>().is_err());
        assert!("020:0:5e:10:00:01".parse::<MacAddress>().is_err());
        assert!("".parse::<MacAddress>().is_err());
    }

    #[test]
    fn test_mac_request_resolve() {
        let explicit = MacRequest::Explicit("de:ad:be:ef:00:01".to_string());
        assert_eq!(
            explicit.resolve().unwrap().octets(),
            [0xde, 0xad, 0xbe, 0xef, 0x00, 0x01]
        );

        let derived = MacRequest::Derived("abc".to_string());
        assert_eq!(derived.resolve().unwrap(), MacAddress::from_identifier("abc"));

        let bad = MacRequest::Explicit("not-a-mac".to_string());
        assert!(matches!(bad.resolve(), Err(Error::InvalidMac(_))));
    }
}
