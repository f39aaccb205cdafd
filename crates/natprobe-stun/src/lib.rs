//! # natprobe STUN codec
//!
//! Encoding and decoding of classic (RFC 3489) STUN messages, as used by the
//! NAT type discovery procedure:
//!
//! - 20-byte header with a 128-bit transaction id (no magic cookie)
//! - MAPPED-ADDRESS, SOURCE-ADDRESS, CHANGED-ADDRESS and CHANGE-REQUEST attributes
//! - Forward-compatible attribute walking: unknown types are skipped
//!
//! ## Example
//!
//! ```rust
//! use natprobe_stun::{ChangeRequest, RandomIds, StunAttribute, StunMessage, TransactionIdSource};
//!
//! let id = RandomIds.next_id();
//! let request = StunMessage::binding_request(id)
//!     .with_attribute(StunAttribute::ChangeRequest(ChangeRequest::IP_AND_PORT));
//! let bytes = request.encode();
//!
//! let decoded = StunMessage::decode(&bytes).unwrap();
//! assert_eq!(decoded.transaction_id, id);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod attribute;
pub mod error;
pub mod message;
pub mod transaction;

pub use attribute::{AttributeType, ChangeRequest, StunAttribute};
pub use error::StunError;
pub use message::{HEADER_SIZE, MessageType, StunMessage};
pub use transaction::{
    RandomIds, SequentialIds, TRANSACTION_ID_LEN, TransactionId, TransactionIdSource,
};
