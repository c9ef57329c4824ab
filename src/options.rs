//! DHCP options as defined in RFC 2132 and its extensions.
//!
//! DHCP uses options to convey configuration parameters between servers and clients.
//! Each option has a code (1 byte), length (1 byte), and variable-length data.
//!
//! Only the options the responder inspects in requests, or adds to every
//! reply itself, have typed variants. Everything else, including the whole
//! pre-built lease payload, travels as [`DhcpOption::Raw`].
//!
//! # References
//!
//! - RFC 2132: DHCP Options and BOOTP Vendor Extensions
//! - RFC 3396: Encoding Long Options in DHCPv4
//! - RFC 3397: Domain Search Option
//! - RFC 3442: Classless Static Route Option

use std::net::Ipv4Addr;

use crate::error::{Error, Result};

/// Largest value a single option TLV can carry.
pub const MAX_OPTION_LEN: usize = 255;

/// DHCP option codes used by this implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum OptionCode {
    /// Padding (no operation). Used for alignment.
    Pad = 0,
    /// Subnet mask (RFC 2132 §3.3).
    SubnetMask = 1,
    /// Router/gateway addresses (RFC 2132 §3.5).
    Router = 3,
    /// DNS server addresses (RFC 2132 §3.8).
    DnsServer = 6,
    /// Host name (RFC 2132 §3.14).
    Hostname = 12,
    /// Domain name (RFC 2132 §3.17).
    DomainName = 15,
    /// Interface MTU (RFC 2132 §5.1).
    InterfaceMtu = 26,
    /// NTP servers (RFC 2132 §8.3).
    NtpServers = 42,
    /// Requested IP address (RFC 2132 §9.1).
    RequestedIpAddress = 50,
    /// IP address lease time in seconds (RFC 2132 §9.2).
    LeaseTime = 51,
    /// Option overload (RFC 2132 §9.3).
    OptionOverload = 52,
    /// DHCP message type (RFC 2132 §9.6).
    MessageType = 53,
    /// Server identifier (RFC 2132 §9.7).
    ServerIdentifier = 54,
    /// TFTP server name (RFC 2132 §9.4).
    TftpServerName = 66,
    /// Boot file name (RFC 2132 §9.5).
    BootFileName = 67,
    /// Domain search list (RFC 3397).
    DomainSearch = 119,
    /// Classless static routes (RFC 3442).
    ClasslessStaticRoute = 121,
    /// End of options marker.
    End = 255,
}

/// DHCP message types (Option 53) as defined in RFC 2132 §9.6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    Discover = 1,
    Offer = 2,
    Request = 3,
    Decline = 4,
    Ack = 5,
    Nak = 6,
    Release = 7,
    Inform = 8,
}

impl TryFrom<u8> for MessageType {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Discover),
            2 => Ok(Self::Offer),
            3 => Ok(Self::Request),
            4 => Ok(Self::Decline),
            5 => Ok(Self::Ack),
            6 => Ok(Self::Nak),
            7 => Ok(Self::Release),
            8 => Ok(Self::Inform),
            other => Err(other),
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Discover => "DISCOVER",
            Self::Offer => "OFFER",
            Self::Request => "REQUEST",
            Self::Decline => "DECLINE",
            Self::Ack => "ACK",
            Self::Nak => "NAK",
            Self::Release => "RELEASE",
            Self::Inform => "INFORM",
        };
        f.write_str(name)
    }
}

/// Option overload flags (Option 52) as defined in RFC 2132 §9.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OverloadFlag {
    /// The `file` field contains options.
    File = 1,
    /// The `sname` field contains options.
    Sname = 2,
    /// Both `file` and `sname` fields contain options.
    Both = 3,
}

impl TryFrom<u8> for OverloadFlag {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::File),
            2 => Ok(Self::Sname),
            3 => Ok(Self::Both),
            other => Err(other),
        }
    }
}

/// A parsed DHCP option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DhcpOption {
    /// DHCP message type (Option 53).
    MessageType(MessageType),
    /// Server identifier (Option 54).
    ServerIdentifier(Ipv4Addr),
    /// Client's requested IP address (Option 50).
    RequestedIpAddress(Ipv4Addr),
    /// Lease time in seconds (Option 51).
    LeaseTime(u32),
    /// Indicates sname/file fields contain options (Option 52).
    OptionOverload(OverloadFlag),
    /// Client host name (Option 12).
    Hostname(String),
    /// Any other option, code and value as they appear on the wire.
    Raw(u8, Vec<u8>),
}

fn ipv4_from(data: &[u8], what: &str) -> Result<Ipv4Addr> {
    let octets: [u8; 4] = data
        .try_into()
        .map_err(|_| Error::InvalidPacket(format!("Invalid {} length", what)))?;
    Ok(Ipv4Addr::from(octets))
}

impl DhcpOption {
    /// Returns the option code for this option.
    pub fn option_code(&self) -> u8 {
        match self {
            Self::MessageType(_) => OptionCode::MessageType as u8,
            Self::ServerIdentifier(_) => OptionCode::ServerIdentifier as u8,
            Self::RequestedIpAddress(_) => OptionCode::RequestedIpAddress as u8,
            Self::LeaseTime(_) => OptionCode::LeaseTime as u8,
            Self::OptionOverload(_) => OptionCode::OptionOverload as u8,
            Self::Hostname(_) => OptionCode::Hostname as u8,
            Self::Raw(code, _) => *code,
        }
    }

    /// Parses a DHCP option from its code and raw data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPacket`] if the data length is invalid for
    /// a typed option, or the value is out of range.
    pub fn parse(code: u8, data: &[u8]) -> Result<Self> {
        const MESSAGE_TYPE: u8 = OptionCode::MessageType as u8;
        const SERVER_IDENTIFIER: u8 = OptionCode::ServerIdentifier as u8;
        const REQUESTED_IP: u8 = OptionCode::RequestedIpAddress as u8;
        const LEASE_TIME: u8 = OptionCode::LeaseTime as u8;
        const OVERLOAD: u8 = OptionCode::OptionOverload as u8;
        const HOSTNAME: u8 = OptionCode::Hostname as u8;
        const PAD: u8 = OptionCode::Pad as u8;
        const END: u8 = OptionCode::End as u8;

        match code {
            MESSAGE_TYPE => {
                let [value] = data else {
                    return Err(Error::InvalidPacket(
                        "Invalid message type length".to_string(),
                    ));
                };
                let msg_type = MessageType::try_from(*value).map_err(|value| {
                    Error::InvalidPacket(format!("Unknown message type: {}", value))
                })?;
                Ok(Self::MessageType(msg_type))
            }
            SERVER_IDENTIFIER => Ok(Self::ServerIdentifier(ipv4_from(data, "server identifier")?)),
            REQUESTED_IP => Ok(Self::RequestedIpAddress(ipv4_from(data, "requested IP address")?)),
            LEASE_TIME => {
                let bytes: [u8; 4] = data
                    .try_into()
                    .map_err(|_| Error::InvalidPacket("Invalid lease time length".to_string()))?;
                Ok(Self::LeaseTime(u32::from_be_bytes(bytes)))
            }
            OVERLOAD => {
                let [value] = data else {
                    return Err(Error::InvalidPacket(
                        "Invalid option overload length".to_string(),
                    ));
                };
                let flag = OverloadFlag::try_from(*value).map_err(|value| {
                    Error::InvalidPacket(format!("Invalid option overload value: {}", value))
                })?;
                Ok(Self::OptionOverload(flag))
            }
            HOSTNAME => Ok(Self::Hostname(String::from_utf8_lossy(data).to_string())),
            PAD | END => Err(Error::InvalidPacket(
                "Pad/End should not be parsed as options".to_string(),
            )),
            other => Ok(Self::Raw(other, data.to_vec())),
        }
    }

    /// Encodes the option to its wire format (code + length + data).
    ///
    /// Raw values longer than 255 bytes are split into consecutive TLVs with
    /// the same code, which receivers concatenate (RFC 3396).
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::MessageType(msg_type) => {
                vec![OptionCode::MessageType as u8, 1, *msg_type as u8]
            }
            Self::ServerIdentifier(addr) => {
                let mut result = vec![OptionCode::ServerIdentifier as u8, 4];
                result.extend_from_slice(&addr.octets());
                result
            }
            Self::RequestedIpAddress(addr) => {
                let mut result = vec![OptionCode::RequestedIpAddress as u8, 4];
                result.extend_from_slice(&addr.octets());
                result
            }
            Self::LeaseTime(time) => {
                let mut result = vec![OptionCode::LeaseTime as u8, 4];
                result.extend_from_slice(&time.to_be_bytes());
                result
            }
            Self::OptionOverload(flag) => {
                vec![OptionCode::OptionOverload as u8, 1, *flag as u8]
            }
            Self::Hostname(name) => encode_long(OptionCode::Hostname as u8, name.as_bytes()),
            Self::Raw(code, data) => encode_long(*code, data),
        }
    }
}

fn encode_long(code: u8, data: &[u8]) -> Vec<u8> {
    if data.is_empty() {
        return vec![code, 0];
    }

    let mut result = Vec::with_capacity(data.len() + 2 * data.len().div_ceil(MAX_OPTION_LEN));
    for chunk in data.chunks(MAX_OPTION_LEN) {
        result.push(code);
        result.push(chunk.len() as u8);
        result.extend_from_slice(chunk);
    }
    result
}
