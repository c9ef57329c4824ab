//! # vmdhcp
//!
//! A single-client DHCPv4 responder for a bridged virtual machine NIC.
//!
//! The responder knows its one client in advance: the guest's MAC address
//! (given, or derived from a stable identifier) and the address the pod
//! network assigned to the dummy interface. It answers DISCOVER with OFFER
//! and REQUEST with ACK, always with the same pre-built lease, and ignores
//! everyone else.
//!
//! ## Quick Start
//!
//! ```no_run
//! use tokio::sync::mpsc;
//! use vmdhcp::{Config, MacRequest};
//!
//! #[tokio::main]
//! async fn main() -> vmdhcp::Result<()> {
//!     let config = Config::default();
//!     let (sender, mut requests) = mpsc::channel(1);
//!     sender
//!         .send(MacRequest::Derived("vmi-uid".to_string()))
//!         .await
//!         .ok();
//!
//!     let handle = vmdhcp::server::start(&config, &mut requests).await?;
//!     handle.await.map_err(std::io::Error::other)?
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`MacAddress`] - Guest identity, including derivation from an identifier
//! - [`LeaseConfig`] - The one lease, assembled from interface and resolver state
//! - [`encoder`] - Option payload encoding (RFC 3442 routes, RFC 3397 search list)
//! - [`Responder`] - Answers the expected client, ignores the rest
//! - [`DhcpServer`] - Interface-scoped UDP socket and receive loop
//! - [`LockFile`] - Single-instance marker

pub mod config;
pub mod encoder;
pub mod error;
pub mod lease;
pub mod lockfile;
pub mod mac;
pub mod netif;
pub mod options;
pub mod packet;
pub mod resolv;
pub mod server;

pub use config::{Config, CustomOptions, PrivateOption};
pub use encoder::{OptionInputs, OptionsMap, build_options};
pub use error::{DomainListError, Error, Result};
pub use lease::{LeaseConfig, RouteEntry};
pub use lockfile::LockFile;
pub use mac::{MacAddress, MacRequest};
pub use options::{DhcpOption, MessageType, OptionCode};
pub use packet::DhcpPacket;
pub use server::{DhcpServer, Responder};
