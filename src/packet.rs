//! DHCP packet parsing and encoding per RFC 2131.
//!
//! A DHCP packet consists of a fixed 236-byte BOOTP header followed by a
//! 4-byte magic cookie and variable-length options.
//!
//! ```text
//! offset  size  field
//!      0     1  op
//!      1     1  htype
//!      2     1  hlen
//!      3     1  hops
//!      4     4  xid
//!      8     2  secs
//!     10     2  flags
//!     12     4  ciaddr
//!     16     4  yiaddr
//!     20     4  siaddr
//!     24     4  giaddr
//!     28    16  chaddr
//!     44    64  sname
//!    108   128  file
//!    236     4  magic cookie = 99.130.83.99
//!    240     -  options
//! ```

use std::net::Ipv4Addr;

use crate::error::{Error, Result};
use crate::mac::MacAddress;
use crate::options::{DhcpOption, MessageType, OptionCode, OverloadFlag};

/// DHCP magic cookie that identifies DHCP packets (vs BOOTP).
const DHCP_MAGIC_COOKIE: [u8; 4] = [99, 130, 83, 99];

const CHADDR_OFFSET: usize = 28;
const SNAME_OFFSET: usize = 44;
const FILE_OFFSET: usize = 108;
const MAGIC_COOKIE_OFFSET: usize = 236;
const OPTIONS_OFFSET: usize = MAGIC_COOKIE_OFFSET + DHCP_MAGIC_COOKIE.len();

const CHADDR_SIZE: usize = 16;
const SNAME_SIZE: usize = 64;
const FILE_SIZE: usize = 128;

/// Replies are padded to this size for BOOTP relay compatibility.
const DHCP_MIN_PACKET_SIZE: usize = 300;

/// Minimum datagram every host must accept (RFC 791).
const DHCP_ENCODE_CAPACITY: usize = 576;

/// Relay loop protection (RFC 2131 §4.1).
const MAX_HOPS: u8 = 16;

/// BOOTP/DHCP operation code for client requests.
pub const BOOTREQUEST: u8 = 1;

/// BOOTP/DHCP operation code for server replies.
pub const BOOTREPLY: u8 = 2;

/// Hardware type for Ethernet.
pub const HTYPE_ETHERNET: u8 = 1;

/// Hardware address length for Ethernet.
pub const HLEN_ETHERNET: u8 = 6;

/// Broadcast bit of the `flags` field.
pub const FLAG_BROADCAST: u16 = 0x8000;

/// A parsed DHCP packet, request or reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhcpPacket {
    pub op: u8,
    pub htype: u8,
    pub hlen: u8,
    pub hops: u8,
    pub xid: u32,
    pub secs: u16,
    pub flags: u16,
    pub ciaddr: Ipv4Addr,
    pub yiaddr: Ipv4Addr,
    pub siaddr: Ipv4Addr,
    pub giaddr: Ipv4Addr,
    pub chaddr: [u8; CHADDR_SIZE],
    pub sname: [u8; SNAME_SIZE],
    pub file: [u8; FILE_SIZE],
    pub options: Vec<DhcpOption>,
}

fn ipv4_at(data: &[u8], offset: usize) -> Ipv4Addr {
    Ipv4Addr::new(
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    )
}

impl DhcpPacket {
    /// Parses a DHCP packet from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPacket`] if:
    /// - Packet is shorter than 240 bytes (fixed header + magic cookie)
    /// - Magic cookie is invalid (not 99.130.83.99)
    /// - Hop count exceeds 16
    /// - Hardware length doesn't match type (Ethernet must be 6)
    /// - Options are malformed (truncated length or data)
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < OPTIONS_OFFSET {
            return Err(Error::InvalidPacket(format!(
                "Packet too short: {} bytes (minimum {})",
                data.len(),
                OPTIONS_OFFSET
            )));
        }

        if data[MAGIC_COOKIE_OFFSET..OPTIONS_OFFSET] != DHCP_MAGIC_COOKIE {
            return Err(Error::InvalidPacket("Invalid magic cookie".to_string()));
        }

        let (op, htype, hlen, hops) = (data[0], data[1], data[2], data[3]);

        if hops > MAX_HOPS {
            return Err(Error::InvalidPacket(format!(
                "Hop count {} exceeds maximum {}",
                hops, MAX_HOPS
            )));
        }

        if htype == HTYPE_ETHERNET && hlen != HLEN_ETHERNET {
            return Err(Error::InvalidPacket(format!(
                "Invalid hlen {} for Ethernet (expected {})",
                hlen, HLEN_ETHERNET
            )));
        }

        let mut chaddr = [0u8; CHADDR_SIZE];
        chaddr.copy_from_slice(&data[CHADDR_OFFSET..SNAME_OFFSET]);
        let mut sname = [0u8; SNAME_SIZE];
        sname.copy_from_slice(&data[SNAME_OFFSET..FILE_OFFSET]);
        let mut file = [0u8; FILE_SIZE];
        file.copy_from_slice(&data[FILE_OFFSET..MAGIC_COOKIE_OFFSET]);

        let mut options = parse_options(&data[OPTIONS_OFFSET..])?;

        let overload = options.iter().find_map(|opt| match opt {
            DhcpOption::OptionOverload(flag) => Some(*flag),
            _ => None,
        });
        if let Some(flag) = overload {
            if matches!(flag, OverloadFlag::File | OverloadFlag::Both) {
                options.extend(parse_options(&file)?);
            }
            if matches!(flag, OverloadFlag::Sname | OverloadFlag::Both) {
                options.extend(parse_options(&sname)?);
            }
        }

        Ok(Self {
            op,
            htype,
            hlen,
            hops,
            xid: u32::from_be_bytes([data[4], data[5], data[6], data[7]]),
            secs: u16::from_be_bytes([data[8], data[9]]),
            flags: u16::from_be_bytes([data[10], data[11]]),
            ciaddr: ipv4_at(data, 12),
            yiaddr: ipv4_at(data, 16),
            siaddr: ipv4_at(data, 20),
            giaddr: ipv4_at(data, 24),
            chaddr,
            sname,
            file,
            options,
        })
    }

    /// Encodes the packet to bytes for transmission.
    ///
    /// The returned buffer is at least 300 bytes, terminated by the End option.
    pub fn encode(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(DHCP_ENCODE_CAPACITY);

        packet.extend_from_slice(&[self.op, self.htype, self.hlen, self.hops]);
        packet.extend_from_slice(&self.xid.to_be_bytes());
        packet.extend_from_slice(&self.secs.to_be_bytes());
        packet.extend_from_slice(&self.flags.to_be_bytes());
        for address in [self.ciaddr, self.yiaddr, self.siaddr, self.giaddr] {
            packet.extend_from_slice(&address.octets());
        }
        packet.extend_from_slice(&self.chaddr);
        packet.extend_from_slice(&self.sname);
        packet.extend_from_slice(&self.file);
        packet.extend_from_slice(&DHCP_MAGIC_COOKIE);

        for option in &self.options {
            packet.extend_from_slice(&option.encode());
        }
        packet.push(OptionCode::End as u8);

        if packet.len() < DHCP_MIN_PACKET_SIZE {
            packet.resize(DHCP_MIN_PACKET_SIZE, 0);
        }

        packet
    }

    /// Returns the DHCP message type (Option 53) if present.
    pub fn message_type(&self) -> Option<MessageType> {
        self.options.iter().find_map(|opt| match opt {
            DhcpOption::MessageType(t) => Some(*t),
            _ => None,
        })
    }

    /// Returns the requested IP address (Option 50) if present.
    pub fn requested_ip(&self) -> Option<Ipv4Addr> {
        self.options.iter().find_map(|opt| match opt {
            DhcpOption::RequestedIpAddress(ip) => Some(*ip),
            _ => None,
        })
    }

    /// Returns the server identifier (Option 54) if present.
    pub fn server_identifier(&self) -> Option<Ipv4Addr> {
        self.options.iter().find_map(|opt| match opt {
            DhcpOption::ServerIdentifier(ip) => Some(*ip),
            _ => None,
        })
    }

    /// Returns the client hostname (Option 12) if present.
    pub fn hostname(&self) -> Option<&str> {
        self.options.iter().find_map(|opt| match opt {
            DhcpOption::Hostname(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Returns the value of any option by code, raw or typed.
    pub fn option(&self, code: u8) -> Option<&DhcpOption> {
        self.options.iter().find(|opt| opt.option_code() == code)
    }

    /// The client's Ethernet address, if this is an Ethernet request.
    pub fn client_mac(&self) -> Option<MacAddress> {
        if self.htype != HTYPE_ETHERNET || self.hlen != HLEN_ETHERNET {
            return None;
        }
        let mut bytes = [0u8; 6];
        bytes.copy_from_slice(&self.chaddr[..6]);
        Some(MacAddress::new(bytes))
    }

    /// Formats the client hardware address (respecting `hlen`) for logging.
    pub fn format_mac(&self) -> String {
        let len = usize::from(self.hlen).min(CHADDR_SIZE);
        self.chaddr[..len]
            .iter()
            .map(|byte| format!("{:02x}", byte))
            .collect::<Vec<_>>()
            .join(":")
    }

    /// Returns true if the broadcast flag (bit 15) is set.
    pub fn is_broadcast(&self) -> bool {
        (self.flags & FLAG_BROADCAST) != 0
    }

    /// Creates a reply to `request`.
    ///
    /// The message type is added as the first option, followed by `options`.
    /// `xid`, `flags`, `giaddr`, `chaddr`, `htype` and `hlen` are copied
    /// from the request.
    pub fn create_reply(
        request: &DhcpPacket,
        message_type: MessageType,
        your_ip: Ipv4Addr,
        server_ip: Ipv4Addr,
        options: Vec<DhcpOption>,
    ) -> Self {
        let mut all_options = Vec::with_capacity(options.len() + 1);
        all_options.push(DhcpOption::MessageType(message_type));
        all_options.extend(options);

        Self {
            op: BOOTREPLY,
            htype: request.htype,
            hlen: request.hlen,
            hops: 0,
            xid: request.xid,
            secs: 0,
            flags: request.flags,
            ciaddr: Ipv4Addr::UNSPECIFIED,
            yiaddr: your_ip,
            siaddr: server_ip,
            giaddr: request.giaddr,
            chaddr: request.chaddr,
            sname: [0u8; SNAME_SIZE],
            file: [0u8; FILE_SIZE],
            options: all_options,
        }
    }
}

/// Parses a TLV option area up to the End marker.
///
/// Repeated non-typed codes are concatenated into one value (RFC 3396).
fn parse_options(data: &[u8]) -> Result<Vec<DhcpOption>> {
    let mut options: Vec<DhcpOption> = Vec::new();
    let mut index = 0;

    while index < data.len() {
        let code = data[index];

        if code == OptionCode::Pad as u8 {
            index += 1;
            continue;
        }

        if code == OptionCode::End as u8 {
            break;
        }

        let Some(&length) = data.get(index + 1) else {
            return Err(Error::InvalidPacket("Option length missing".to_string()));
        };
        let end = index + 2 + usize::from(length);
        let Some(value) = data.get(index + 2..end) else {
            return Err(Error::InvalidPacket("Option data truncated".to_string()));
        };

        match DhcpOption::parse(code, value)? {
            DhcpOption::Raw(code, value) => {
                let existing = options
                    .iter()
                    .position(|opt| matches!(opt, DhcpOption::Raw(other, _) if *other == code));
                match existing {
                    Some(position) => {
                        if let DhcpOption::Raw(_, data) = &mut options[position] {
                            data.extend_from_slice(&value);
                        }
                    }
                    None => options.push(DhcpOption::Raw(code, value)),
                }
            }
            option => options.push(option),
        }

        index = end;
    }

    Ok(options)
}
