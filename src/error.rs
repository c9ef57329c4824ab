//! Error types for the DHCP responder.
//!
//! All fallible operations in this crate return [`Result<T>`], which uses
//! the [`Error`] enum for error variants. Everything except
//! [`Error::InvalidPacket`] is fatal at startup.

use std::path::PathBuf;

/// Errors raised while encoding the domain search list (option 119).
///
/// The two kinds are kept apart so callers can tell a bad resolver entry
/// from a list that simply does not fit in one option.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainListError {
    /// A search domain is not a valid DNS name.
    #[error("invalid search domain: {0:?}")]
    InvalidDomain(String),

    /// The encoded list exceeds the 255 byte option budget.
    #[error("search domains encode to {0} bytes, exceeding the 255 byte limit")]
    TooLong(usize),
}

/// Errors that can occur while assembling or serving the lease.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File system or network I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error (config file).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed DHCP packet received.
    ///
    /// This includes packets that are too short, have invalid magic cookies,
    /// invalid option lengths, or other protocol violations. Never fatal.
    #[error("Invalid DHCP packet: {0}")]
    InvalidPacket(String),

    /// Invalid sidecar configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The requested hardware address could not be parsed.
    #[error("Invalid MAC address: {0:?}")]
    InvalidMac(String),

    /// Socket creation or configuration error.
    ///
    /// Typically occurs when binding to port 67 without `CAP_NET_BIND_SERVICE`,
    /// or when the advertising interface doesn't exist.
    #[error("Socket error: {0}")]
    Socket(String),

    /// The guest address could not be read from the dummy interface.
    #[error("Failed to read address of interface {interface}: {reason}")]
    InterfaceAddress { interface: String, reason: String },

    /// The pod resolver configuration could not be read.
    #[error("Failed to read resolver configuration {path}: {source}")]
    ResolvConf {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The single-instance marker already exists.
    #[error("DHCP server already running: {0} exists")]
    AlreadyRunning(PathBuf),

    /// The MAC request channel closed before a request arrived.
    #[error("MAC address request channel closed before a request was received")]
    RequestChannelClosed,

    /// The domain search list could not be encoded.
    #[error("Domain search list: {0}")]
    DomainList(#[from] DomainListError),
}

/// A specialized Result type for DHCP operations.
pub type Result<T> = std::result::Result<T, Error>;
