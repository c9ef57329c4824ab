use std::io::IoSliceMut;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::os::fd::AsRawFd;

use nix::sys::socket::{
    ControlMessageOwned, MsgFlags, SockaddrIn, recvmsg, setsockopt, sockopt,
};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::io::Interest;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::encoder::{OptionInputs, OptionsMap, build_options};
use crate::error::{Error, Result};
use crate::lease::LeaseConfig;
use crate::lockfile::LockFile;
use crate::mac::MacRequest;
use crate::netif::{InterfaceAddressSource, SystemInterfaces, interface_index};
use crate::options::{DhcpOption, MessageType};
use crate::packet::{BOOTREQUEST, DhcpPacket};
use crate::resolv::{ResolvConfFile, ResolverSource};

const DHCP_SERVER_PORT: u16 = 67;
const DHCP_CLIENT_PORT: u16 = 68;
const RECV_BUFFER_SIZE: usize = 1500;

/// Lease time advertised for the one lease (RFC 2131 §3.3 "infinity").
const INFINITE_LEASE_SECONDS: u32 = u32::MAX;

/// Answers the one expected client with the one pre-built lease.
#[derive(Debug, Clone)]
pub struct Responder {
    lease: LeaseConfig,
    options: OptionsMap,
    reply_options: Vec<DhcpOption>,
}

impl Responder {
    pub fn new(lease: LeaseConfig, options: OptionsMap) -> Self {
        let mut reply_options = vec![
            DhcpOption::ServerIdentifier(lease.advertising_address),
            DhcpOption::LeaseTime(INFINITE_LEASE_SECONDS),
        ];
        reply_options.extend(options.to_options());

        Self {
            lease,
            options,
            reply_options,
        }
    }

    /// Assembles the lease for `request` and encodes its options.
    pub fn prepare(
        request: &MacRequest,
        config: &Config,
        interfaces: &dyn InterfaceAddressSource,
        resolver: &dyn ResolverSource,
    ) -> Result<Self> {
        let client_mac = request.resolve()?;
        info!("Serving DHCP for client {}", client_mac);

        let lease = LeaseConfig::assemble(client_mac, config, interfaces, resolver)?;
        let options = build_options(&OptionInputs::from(&lease))?;

        Ok(Self::new(lease, options))
    }

    pub fn lease(&self) -> &LeaseConfig {
        &self.lease
    }

    pub fn options(&self) -> &OptionsMap {
        &self.options
    }

    /// Builds the reply to `request`, or `None` if it must be ignored.
    ///
    /// Only DISCOVER and REQUEST from the expected hardware address are
    /// answered; both always receive the same lease.
    pub fn respond(&self, request: &DhcpPacket) -> Option<DhcpPacket> {
        if request.op != BOOTREQUEST {
            return None;
        }

        if request.client_mac() != Some(self.lease.client_mac) {
            debug!(
                "Ignoring DHCP packet from unexpected client {}",
                request.format_mac()
            );
            return None;
        }

        let reply_type = match request.message_type()? {
            MessageType::Discover => MessageType::Offer,
            MessageType::Request => {
                if let Some(requested) = request.requested_ip() {
                    debug!(
                        "{} requested {}, leasing {}",
                        self.lease.client_mac,
                        requested,
                        self.lease.client_ip()
                    );
                }
                MessageType::Ack
            }
            other => {
                debug!("Ignoring {} from {}", other, self.lease.client_mac);
                return None;
            }
        };

        Some(DhcpPacket::create_reply(
            request,
            reply_type,
            self.lease.client_ip(),
            self.lease.advertising_address,
            self.reply_options.clone(),
        ))
    }

    /// Parses `data` and builds the reply.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPacket`] for malformed packets.
    pub fn respond_to_bytes(&self, data: &[u8]) -> Result<Option<DhcpPacket>> {
        let request = DhcpPacket::parse(data)?;
        Ok(self.respond(&request))
    }
}

/// Where a reply to `request` is sent.
pub fn reply_destination(request: &DhcpPacket) -> SocketAddr {
    let ip = if request.is_broadcast() || request.ciaddr.is_unspecified() {
        Ipv4Addr::BROADCAST
    } else {
        request.ciaddr
    };
    SocketAddr::V4(SocketAddrV4::new(ip, DHCP_CLIENT_PORT))
}

/// Whether a datagram that arrived on interface `arrival` is for the
/// interface bound at `bound_index`.
///
/// A missing arrival index is accepted; the socket is already scoped to the
/// device.
pub fn accepts_interface(bound_index: u32, arrival: Option<u32>) -> bool {
    arrival.is_none_or(|index| index == bound_index)
}

/// DHCP responder bound to the advertising interface.
pub struct DhcpServer {
    responder: Responder,
    socket: UdpSocket,
    interface: String,
    interface_index: u32,
}

impl DhcpServer {
    /// Binds port 67 on `interface`.
    pub fn bind(interface: &str, responder: Responder) -> Result<Self> {
        let interface_index = interface_index(interface)?;
        let socket = Self::create_socket(interface)?;

        info!(
            "DHCP server bound to {} (index {}) port {}",
            interface, interface_index, DHCP_SERVER_PORT
        );

        Ok(Self {
            responder,
            socket,
            interface: interface.to_string(),
            interface_index,
        })
    }

    fn create_socket(interface: &str) -> Result<UdpSocket> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
            .map_err(|error| Error::Socket(format!("Failed to create socket: {}", error)))?;

        socket
            .set_reuse_address(true)
            .map_err(|error| Error::Socket(format!("Failed to set SO_REUSEADDR: {}", error)))?;

        socket
            .set_broadcast(true)
            .map_err(|error| Error::Socket(format!("Failed to set SO_BROADCAST: {}", error)))?;

        socket.bind_device(Some(interface.as_bytes())).map_err(|error| {
            Error::Socket(format!(
                "Failed to set SO_BINDTODEVICE {}: {}",
                interface, error
            ))
        })?;

        setsockopt(&socket, sockopt::Ipv4PacketInfo, &true)
            .map_err(|errno| Error::Socket(format!("Failed to set IP_PKTINFO: {}", errno)))?;

        socket
            .set_nonblocking(true)
            .map_err(|error| Error::Socket(format!("Failed to set non-blocking: {}", error)))?;

        let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, DHCP_SERVER_PORT);
        socket.bind(&bind_addr.into()).map_err(|error| {
            Error::Socket(format!("Failed to bind to {}: {}", bind_addr, error))
        })?;

        let std_socket: std::net::UdpSocket = socket.into();
        let tokio_socket = UdpSocket::from_std(std_socket).map_err(|error| {
            Error::Socket(format!("Failed to convert to tokio socket: {}", error))
        })?;

        Ok(tokio_socket)
    }

    /// Serves the lease until the socket fails.
    ///
    /// Malformed packets, foreign interfaces and unexpected clients are
    /// dropped. A failed read is returned as the only way out of the loop.
    pub async fn run(self) -> Result<()> {
        let mut buffer = [0u8; RECV_BUFFER_SIZE];

        info!("DHCP server ready and listening on {}", self.interface);

        loop {
            let (size, arrival) = self.recv(&mut buffer).await?;

            if !accepts_interface(self.interface_index, arrival) {
                debug!(
                    "Dropping packet received on interface index {:?}",
                    arrival
                );
                continue;
            }

            let request = match DhcpPacket::parse(&buffer[..size]) {
                Ok(request) => request,
                Err(error) => {
                    warn!("Dropping packet: {}", error);
                    continue;
                }
            };

            let Some(reply) = self.responder.respond(&request) else {
                continue;
            };

            if let Some(message_type) = request.message_type() {
                info!("{} from {}", message_type, request.format_mac());
            }

            if let Err(error) = self.send_reply(&reply, &request).await {
                warn!("Failed to send reply to {}: {}", request.format_mac(), error);
            }
        }
    }

    /// Reads one datagram along with the index of the interface it arrived on.
    async fn recv(&self, buffer: &mut [u8]) -> std::io::Result<(usize, Option<u32>)> {
        let fd = self.socket.as_raw_fd();

        self.socket
            .async_io(Interest::READABLE, || {
                let mut iov = [IoSliceMut::new(&mut *buffer)];
                let mut cmsg_buffer = nix::cmsg_space!(libc::in_pktinfo);

                let message = recvmsg::<SockaddrIn>(
                    fd,
                    &mut iov,
                    Some(&mut cmsg_buffer),
                    MsgFlags::empty(),
                )
                .map_err(std::io::Error::from)?;

                let arrival = message
                    .cmsgs()
                    .map_err(std::io::Error::from)?
                    .find_map(|cmsg| match cmsg {
                        ControlMessageOwned::Ipv4PacketInfo(info) => {
                            u32::try_from(info.ipi_ifindex).ok()
                        }
                        _ => None,
                    });

                Ok((message.bytes, arrival))
            })
            .await
    }

    async fn send_reply(&self, reply: &DhcpPacket, request: &DhcpPacket) -> Result<()> {
        let destination = reply_destination(request);
        self.socket.send_to(&reply.encode(), destination).await?;

        if let Some(message_type) = reply.message_type() {
            info!(
                "{} {} to {}",
                message_type,
                reply.yiaddr,
                request.format_mac()
            );
        }

        Ok(())
    }
}

/// Starts the responder once the launcher has sent the MAC request.
///
/// Runs the whole startup path in order (lease assembly, option
/// encoding, socket bind, lock file) and returns the spawned receive loop.
/// Any startup failure is returned before a packet is sent.
pub async fn start(
    config: &Config,
    requests: &mut mpsc::Receiver<MacRequest>,
) -> Result<JoinHandle<Result<()>>> {
    let lock_path = config.lock_file();
    LockFile::check(&lock_path)?;

    let request = requests.recv().await.ok_or(Error::RequestChannelClosed)?;

    let responder = Responder::prepare(
        &request,
        config,
        &SystemInterfaces,
        &ResolvConfFile::new(&config.resolv_conf),
    )?;

    let server = DhcpServer::bind(&config.server_interface, responder)?;
    LockFile::acquire(&lock_path)?;

    Ok(tokio::spawn(server.run()))
}
