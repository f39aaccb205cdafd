//! Error types for the STUN codec.

use thiserror::Error;

/// Errors raised while decoding a STUN datagram.
///
/// Every variant describes a malformed response; callers performing an
/// exchange discard such datagrams instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StunError {
    /// Datagram shorter than the fixed header
    #[error("STUN message too short: expected at least {expected} bytes, got {actual}")]
    MessageTooShort {
        /// Minimum size
        expected: usize,
        /// Size received
        actual: usize,
    },

    /// Message type code outside the known table
    #[error("unknown STUN message type: 0x{0:04X}")]
    UnknownMessageType(u16),

    /// Declared body length runs past the end of the datagram
    #[error("STUN body length {declared} exceeds the {available} bytes received")]
    BodyOverflow {
        /// Length from the header
        declared: usize,
        /// Bytes actually present after the header
        available: usize,
    },

    /// Fewer than four bytes left for an attribute header
    #[error("truncated attribute header at offset {offset}")]
    TruncatedAttribute {
        /// Offset from the start of the message
        offset: usize,
    },

    /// Attribute value runs past the end of the body
    #[error("attribute 0x{attr_type:04X} at offset {offset} overruns the message body")]
    AttributeOverflow {
        /// Attribute type code
        attr_type: u16,
        /// Offset from the start of the message
        offset: usize,
    },

    /// Attribute value has the wrong size for its type
    #[error("invalid length {length} for attribute 0x{attr_type:04X}")]
    InvalidAttribute {
        /// Attribute type code
        attr_type: u16,
        /// Value length received
        length: usize,
    },

    /// Address attribute with a family other than IPv4
    #[error("unsupported address family 0x{0:02X}")]
    UnsupportedFamily(u8),

    /// Transaction id text that is not 32 hex characters
    #[error("invalid transaction id: {0:?}")]
    InvalidTransactionId(String),
}
