//! STUN attributes (RFC 3489 Section 11.2)
//!
//! Only the attributes needed for NAT classification are interpreted:
//! MAPPED-ADDRESS, SOURCE-ADDRESS, CHANGED-ADDRESS and CHANGE-REQUEST. The
//! remaining classic codes are named in [`AttributeType`] so that they can be
//! logged, but the decoder skips them.

use crate::error::StunError;
use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};

/// Address family byte for IPv4
pub const FAMILY_IPV4: u8 = 0x01;

/// Length of an IPv4 address attribute value
const ADDRESS_VALUE_LEN: usize = 8;

/// Length of a CHANGE-REQUEST value
const CHANGE_REQUEST_LEN: usize = 4;

/// Attribute type codes known to the classic STUN protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    /// MAPPED-ADDRESS (0x0001)
    MappedAddress,
    /// RESPONSE-ADDRESS (0x0002)
    ResponseAddress,
    /// CHANGE-REQUEST (0x0003)
    ChangeRequest,
    /// SOURCE-ADDRESS (0x0004)
    SourceAddress,
    /// CHANGED-ADDRESS (0x0005)
    ChangedAddress,
    /// USERNAME (0x0006)
    Username,
    /// PASSWORD (0x0007)
    Password,
    /// MESSAGE-INTEGRITY (0x0008)
    MessageIntegrity,
    /// ERROR-CODE (0x0009)
    ErrorCode,
    /// UNKNOWN-ATTRIBUTES (0x000A)
    UnknownAttributes,
    /// REFLECTED-FROM (0x000B)
    ReflectedFrom,
    /// XOR-ONLY (0x0021)
    XorOnly,
    /// XOR-MAPPED-ADDRESS, pre-RFC 5389 code (0x8020)
    XorMappedAddress,
    /// SERVER-NAME (0x8022)
    ServerName,
    /// SECONDARY-ADDRESS (0x8050)
    SecondaryAddress,
}

/// Bidirectional name/code table, indexed by variant order.
const ATTRIBUTE_TABLE: [(AttributeType, u16, &str); 15] = [
    (AttributeType::MappedAddress, 0x0001, "MAPPED-ADDRESS"),
    (AttributeType::ResponseAddress, 0x0002, "RESPONSE-ADDRESS"),
    (AttributeType::ChangeRequest, 0x0003, "CHANGE-REQUEST"),
    (AttributeType::SourceAddress, 0x0004, "SOURCE-ADDRESS"),
    (AttributeType::ChangedAddress, 0x0005, "CHANGED-ADDRESS"),
    (AttributeType::Username, 0x0006, "USERNAME"),
    (AttributeType::Password, 0x0007, "PASSWORD"),
    (AttributeType::MessageIntegrity, 0x0008, "MESSAGE-INTEGRITY"),
    (AttributeType::ErrorCode, 0x0009, "ERROR-CODE"),
    (AttributeType::UnknownAttributes, 0x000A, "UNKNOWN-ATTRIBUTES"),
    (AttributeType::ReflectedFrom, 0x000B, "REFLECTED-FROM"),
    (AttributeType::XorOnly, 0x0021, "XOR-ONLY"),
    (AttributeType::XorMappedAddress, 0x8020, "XOR-MAPPED-ADDRESS"),
    (AttributeType::ServerName, 0x8022, "SERVER-NAME"),
    (AttributeType::SecondaryAddress, 0x8050, "SECONDARY-ADDRESS"),
];

impl AttributeType {
    /// Wire code
    #[must_use]
    pub const fn code(self) -> u16 {
        ATTRIBUTE_TABLE[self as usize].1
    }

    /// Canonical RFC name
    #[must_use]
    pub const fn name(self) -> &'static str {
        ATTRIBUTE_TABLE[self as usize].2
    }

    /// Look up a wire code
    #[must_use]
    pub fn from_code(code: u16) -> Option<Self> {
        ATTRIBUTE_TABLE
            .iter()
            .find(|(_, c, _)| *c == code)
            .map(|(t, _, _)| *t)
    }

    /// Look up a canonical name (case-insensitive)
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        ATTRIBUTE_TABLE
            .iter()
            .find(|(_, _, n)| n.eq_ignore_ascii_case(name))
            .map(|(t, _, _)| *t)
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// CHANGE-REQUEST flag word
///
/// Bit 0x04 asks the server to answer from its alternate IP, bit 0x02 from
/// its alternate port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChangeRequest(u32);

impl ChangeRequest {
    /// Change-port bit
    pub const CHANGE_PORT: u32 = 0x02;
    /// Change-IP bit
    pub const CHANGE_IP: u32 = 0x04;

    /// Answer from the alternate IP and port (Test II)
    pub const IP_AND_PORT: Self = Self(Self::CHANGE_IP | Self::CHANGE_PORT);
    /// Answer from the alternate port only (Test III)
    pub const PORT_ONLY: Self = Self(Self::CHANGE_PORT);

    /// Wrap a raw flag word
    #[must_use]
    pub const fn from_flags(flags: u32) -> Self {
        Self(flags)
    }

    /// Raw flag word
    #[must_use]
    pub const fn flags(self) -> u32 {
        self.0
    }

    /// Whether the change-IP bit is set
    #[must_use]
    pub const fn change_ip(self) -> bool {
        self.0 & Self::CHANGE_IP != 0
    }

    /// Whether the change-port bit is set
    #[must_use]
    pub const fn change_port(self) -> bool {
        self.0 & Self::CHANGE_PORT != 0
    }
}

/// A STUN attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StunAttribute {
    /// Reflexive address the server saw the request come from
    MappedAddress(SocketAddrV4),
    /// Address the server sent the response from
    SourceAddress(SocketAddrV4),
    /// Server's alternate address, target of CHANGE-REQUEST replies
    ChangedAddress(SocketAddrV4),
    /// Ask the server to reply from another IP and/or port
    ChangeRequest(ChangeRequest),
    /// Any other attribute, written verbatim. The decoder never produces this;
    /// types it does not interpret are skipped.
    Raw {
        /// Type code
        attr_type: u16,
        /// Value bytes
        value: Vec<u8>,
    },
}

impl StunAttribute {
    /// Attribute type code
    #[must_use]
    pub fn attr_type(&self) -> u16 {
        match self {
            Self::MappedAddress(_) => AttributeType::MappedAddress.code(),
            Self::SourceAddress(_) => AttributeType::SourceAddress.code(),
            Self::ChangedAddress(_) => AttributeType::ChangedAddress.code(),
            Self::ChangeRequest(_) => AttributeType::ChangeRequest.code(),
            Self::Raw { attr_type, .. } => *attr_type,
        }
    }

    /// Append type, length and value to `out`
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        let value = self.encode_value();
        out.extend_from_slice(&self.attr_type().to_be_bytes());
        out.extend_from_slice(&(value.len() as u16).to_be_bytes());
        out.extend_from_slice(&value);
    }

    fn encode_value(&self) -> Vec<u8> {
        match self {
            Self::MappedAddress(addr) | Self::SourceAddress(addr) | Self::ChangedAddress(addr) => {
                let mut value = Vec::with_capacity(ADDRESS_VALUE_LEN);
                value.push(0); // Reserved
                value.push(FAMILY_IPV4);
                value.extend_from_slice(&addr.port().to_be_bytes());
                value.extend_from_slice(&addr.ip().octets());
                value
            }
            Self::ChangeRequest(request) => request.flags().to_be_bytes().to_vec(),
            Self::Raw { value, .. } => value.clone(),
        }
    }

    /// Decode one attribute value.
    ///
    /// Returns `Ok(None)` for types this codec does not interpret.
    ///
    /// # Errors
    ///
    /// Returns `StunError` if an interpreted attribute has a malformed value.
    pub fn decode(attr_type: u16, value: &[u8]) -> Result<Option<Self>, StunError> {
        let attr = match AttributeType::from_code(attr_type) {
            Some(AttributeType::MappedAddress) => {
                Self::MappedAddress(decode_address(attr_type, value)?)
            }
            Some(AttributeType::SourceAddress) => {
                Self::SourceAddress(decode_address(attr_type, value)?)
            }
            Some(AttributeType::ChangedAddress) => {
                Self::ChangedAddress(decode_address(attr_type, value)?)
            }
            Some(AttributeType::ChangeRequest) => {
                let flags: [u8; CHANGE_REQUEST_LEN] =
                    value.try_into().map_err(|_| StunError::InvalidAttribute {
                        attr_type,
                        length: value.len(),
                    })?;
                Self::ChangeRequest(ChangeRequest::from_flags(u32::from_be_bytes(flags)))
            }
            _ => return Ok(None),
        };
        Ok(Some(attr))
    }
}

/// Reserved byte, family, big-endian port, IPv4 octets.
fn decode_address(attr_type: u16, value: &[u8]) -> Result<SocketAddrV4, StunError> {
    if value.len() < ADDRESS_VALUE_LEN {
        return Err(StunError::InvalidAttribute {
            attr_type,
            length: value.len(),
        });
    }
    if value[1] != FAMILY_IPV4 {
        return Err(StunError::UnsupportedFamily(value[1]));
    }
    let port = u16::from_be_bytes([value[2], value[3]]);
    let ip = Ipv4Addr::new(value[4], value[5], value[6], value[7]);
    Ok(SocketAddrV4::new(ip, port))
}
