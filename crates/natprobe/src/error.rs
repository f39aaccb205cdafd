//! Error types for NAT detection.

use natprobe_stun::{AttributeType, StunError};
use std::io;
use std::net::SocketAddrV4;
use thiserror::Error;

/// NAT detection errors
///
/// A missing response is never an error at the classifier level: only
/// resolution, socket and cancellation failures reach the caller.
#[derive(Debug, Error)]
pub enum NatError {
    /// Hostname lookup failed or produced no IPv4 address
    #[error("failed to resolve STUN host {host}: {source}")]
    Resolution {
        /// Host that was looked up
        host: String,
        /// Underlying lookup error
        #[source]
        source: io::Error,
    },

    /// Bind, send or receive failure other than a timeout
    #[error("socket error: {0}")]
    Socket(#[from] io::Error),

    /// No matching response after every attempt
    #[error("no valid response from {server} after {attempts} attempts")]
    Timeout {
        /// Resolved server address
        server: SocketAddrV4,
        /// Datagrams sent
        attempts: u32,
    },

    /// Response could not be decoded
    #[error("malformed STUN response: {0}")]
    Malformed(#[from] StunError),

    /// Every candidate server failed Test I
    #[error("no STUN server responded")]
    NoServerAvailable,

    /// A response lacked an attribute the decision tree needs
    #[error("response from {server} is missing {attribute}")]
    MissingAttribute {
        /// Server that answered
        server: String,
        /// Absent attribute
        attribute: AttributeType,
    },

    /// Detection was cancelled through a [`CancelToken`](crate::cancel::CancelToken)
    #[error("NAT detection cancelled")]
    Cancelled,
}

impl NatError {
    /// Whether this error only means "no response"
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read config: {0}")]
    Io(#[from] io::Error),

    /// TOML could not be parsed
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values parsed but are unusable
    #[error("invalid config: {0}")]
    Invalid(String),
}
