//! STUN messages (RFC 3489 Section 11.1)
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |      STUN Message Type        |         Message Length        |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                      Transaction ID (128 bits)                |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Unlike RFC 5389 there is no magic cookie and attributes are not padded.

use crate::attribute::{ChangeRequest, StunAttribute};
use crate::error::StunError;
use crate::transaction::{TRANSACTION_ID_LEN, TransactionId};
use std::fmt;
use std::net::SocketAddrV4;

/// STUN message header size (20 bytes)
pub const HEADER_SIZE: usize = 20;

/// Attribute header size (type + length)
pub const ATTRIBUTE_HEADER_SIZE: usize = 4;

/// STUN message type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Binding Request (0x0001)
    BindRequest,
    /// Binding Response (0x0101)
    BindResponse,
    /// Binding Error Response (0x0111)
    BindErrorResponse,
    /// Shared Secret Request (0x0002)
    SharedSecretRequest,
    /// Shared Secret Response (0x0102)
    SharedSecretResponse,
    /// Shared Secret Error Response (0x0112)
    SharedSecretErrorResponse,
}

/// Bidirectional name/code table, indexed by variant order.
const MESSAGE_TYPE_TABLE: [(MessageType, u16, &str); 6] = [
    (MessageType::BindRequest, 0x0001, "Binding Request"),
    (MessageType::BindResponse, 0x0101, "Binding Response"),
    (MessageType::BindErrorResponse, 0x0111, "Binding Error Response"),
    (MessageType::SharedSecretRequest, 0x0002, "Shared Secret Request"),
    (MessageType::SharedSecretResponse, 0x0102, "Shared Secret Response"),
    (
        MessageType::SharedSecretErrorResponse,
        0x0112,
        "Shared Secret Error Response",
    ),
];

impl MessageType {
    /// Wire code
    #[must_use]
    pub const fn code(self) -> u16 {
        MESSAGE_TYPE_TABLE[self as usize].1
    }

    /// Human-readable name
    #[must_use]
    pub const fn name(self) -> &'static str {
        MESSAGE_TYPE_TABLE[self as usize].2
    }

    /// Look up a wire code
    #[must_use]
    pub fn from_code(code: u16) -> Option<Self> {
        MESSAGE_TYPE_TABLE
            .iter()
            .find(|(_, c, _)| *c == code)
            .map(|(t, _, _)| *t)
    }

    /// Look up a name (case-insensitive)
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        MESSAGE_TYPE_TABLE
            .iter()
            .find(|(_, _, n)| n.eq_ignore_ascii_case(name))
            .map(|(t, _, _)| *t)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// STUN message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StunMessage {
    /// Message type
    pub message_type: MessageType,
    /// Transaction ID (128 bits)
    pub transaction_id: TransactionId,
    /// Message attributes, in wire order
    pub attributes: Vec<StunAttribute>,
}

impl StunMessage {
    /// Create an empty message
    #[must_use]
    pub fn new(message_type: MessageType, transaction_id: TransactionId) -> Self {
        Self {
            message_type,
            transaction_id,
            attributes: Vec::new(),
        }
    }

    /// Create a Binding Request
    #[must_use]
    pub fn binding_request(transaction_id: TransactionId) -> Self {
        Self::new(MessageType::BindRequest, transaction_id)
    }

    /// Create a Binding Response
    #[must_use]
    pub fn binding_response(transaction_id: TransactionId) -> Self {
        Self::new(MessageType::BindResponse, transaction_id)
    }

    /// Builder-style [`add_attribute`](Self::add_attribute)
    #[must_use]
    pub fn with_attribute(mut self, attr: StunAttribute) -> Self {
        self.attributes.push(attr);
        self
    }

    /// Add an attribute to the message
    pub fn add_attribute(&mut self, attr: StunAttribute) {
        self.attributes.push(attr);
    }

    /// Encode message to bytes
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_SIZE + 12 * self.attributes.len());

        // Message Type (2 bytes)
        bytes.extend_from_slice(&self.message_type.code().to_be_bytes());

        // Message Length (2 bytes) - placeholder
        bytes.extend_from_slice(&[0u8; 2]);

        // Transaction ID (16 bytes)
        bytes.extend_from_slice(self.transaction_id.as_bytes());

        for attr in &self.attributes {
            attr.encode_into(&mut bytes);
        }

        // Message length excludes the 20-byte header
        let msg_length = (bytes.len() - HEADER_SIZE) as u16;
        bytes[2..4].copy_from_slice(&msg_length.to_be_bytes());

        bytes
    }

    /// Decode message from bytes.
    ///
    /// Attributes are read from offset 20 for exactly the declared body
    /// length; each step advances by `4 + attribute length`. Types the codec
    /// does not interpret are skipped. Bytes past the declared body are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns `StunError` if the header is short, the type is unknown, or the
    /// body or any interpreted attribute is truncated or malformed.
    pub fn decode(bytes: &[u8]) -> Result<Self, StunError> {
        if bytes.len() < HEADER_SIZE {
            return Err(StunError::MessageTooShort {
                expected: HEADER_SIZE,
                actual: bytes.len(),
            });
        }

        let type_code = u16::from_be_bytes([bytes[0], bytes[1]]);
        let msg_length = u16::from_be_bytes([bytes[2], bytes[3]]) as usize;

        let mut id = [0u8; TRANSACTION_ID_LEN];
        id.copy_from_slice(&bytes[4..HEADER_SIZE]);
        let transaction_id = TransactionId::from_bytes(id);

        let message_type =
            MessageType::from_code(type_code).ok_or(StunError::UnknownMessageType(type_code))?;

        let body = bytes
            .get(HEADER_SIZE..HEADER_SIZE + msg_length)
            .ok_or(StunError::BodyOverflow {
                declared: msg_length,
                available: bytes.len() - HEADER_SIZE,
            })?;

        let mut attributes = Vec::new();
        let mut offset = 0;

        while offset < body.len() {
            let header = body
                .get(offset..offset + ATTRIBUTE_HEADER_SIZE)
                .ok_or(StunError::TruncatedAttribute {
                    offset: HEADER_SIZE + offset,
                })?;
            let attr_type = u16::from_be_bytes([header[0], header[1]]);
            let attr_length = u16::from_be_bytes([header[2], header[3]]) as usize;

            let value_start = offset + ATTRIBUTE_HEADER_SIZE;
            let value = body.get(value_start..value_start + attr_length).ok_or(
                StunError::AttributeOverflow {
                    attr_type,
                    offset: HEADER_SIZE + offset,
                },
            )?;

            if let Some(attr) = StunAttribute::decode(attr_type, value)? {
                attributes.push(attr);
            }

            offset += ATTRIBUTE_HEADER_SIZE + attr_length;
        }

        Ok(Self {
            message_type,
            transaction_id,
            attributes,
        })
    }

    /// Last MAPPED-ADDRESS in the message
    #[must_use]
    pub fn mapped_address(&self) -> Option<SocketAddrV4> {
        self.attributes.iter().rev().find_map(|attr| match attr {
            StunAttribute::MappedAddress(addr) => Some(*addr),
            _ => None,
        })
    }

    /// Last SOURCE-ADDRESS in the message
    #[must_use]
    pub fn source_address(&self) -> Option<SocketAddrV4> {
        self.attributes.iter().rev().find_map(|attr| match attr {
            StunAttribute::SourceAddress(addr) => Some(*addr),
            _ => None,
        })
    }

    /// Last CHANGED-ADDRESS in the message
    #[must_use]
    pub fn changed_address(&self) -> Option<SocketAddrV4> {
        self.attributes.iter().rev().find_map(|attr| match attr {
            StunAttribute::ChangedAddress(addr) => Some(*addr),
            _ => None,
        })
    }

    /// CHANGE-REQUEST carried by a request, if any
    #[must_use]
    pub fn change_request(&self) -> Option<ChangeRequest> {
        self.attributes.iter().rev().find_map(|attr| match attr {
            StunAttribute::ChangeRequest(request) => Some(*request),
            _ => None,
        })
    }
}
