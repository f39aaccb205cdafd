//! Transaction identifiers
//!
//! RFC 3489 correlates a response with its request through a 128-bit
//! transaction id. Ids are rendered as 32 uppercase hex characters and
//! compared case-insensitively when given as text.

use crate::error::StunError;
use rand::RngCore;
use rand::rngs::OsRng;
use std::fmt;
use std::str::FromStr;

/// Transaction id length in bytes
pub const TRANSACTION_ID_LEN: usize = 16;

/// 128-bit STUN transaction id
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId([u8; TRANSACTION_ID_LEN]);

impl TransactionId {
    /// Wrap raw bytes
    #[must_use]
    pub const fn from_bytes(bytes: [u8; TRANSACTION_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw bytes, as they appear on the wire
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; TRANSACTION_ID_LEN] {
        &self.0
    }

    /// Uppercase hex rendering (always 32 characters)
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }

    /// Case-insensitive comparison against a hex rendering
    #[must_use]
    pub fn matches_hex(&self, text: &str) -> bool {
        text.eq_ignore_ascii_case(&self.to_hex())
    }
}

impl FromStr for TransactionId {
    type Err = StunError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != TRANSACTION_ID_LEN * 2 {
            return Err(StunError::InvalidTransactionId(s.to_string()));
        }
        let mut bytes = [0u8; TRANSACTION_ID_LEN];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|_| StunError::InvalidTransactionId(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId({})", self.to_hex())
    }
}

/// Source of fresh transaction ids, one per exchange.
pub trait TransactionIdSource: Send + Sync {
    /// Produce the id for the next request
    fn next_id(&mut self) -> TransactionId;
}

/// Ids drawn from the operating system's CSPRNG
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIds;

impl TransactionIdSource for RandomIds {
    fn next_id(&mut self) -> TransactionId {
        let mut bytes = [0u8; TRANSACTION_ID_LEN];
        OsRng.fill_bytes(&mut bytes);
        TransactionId(bytes)
    }
}

/// Deterministic counter-based ids, for reproducible tests
#[derive(Debug, Clone, Default)]
pub struct SequentialIds {
    next: u128,
}

impl SequentialIds {
    /// Start counting at `start`
    #[must_use]
    pub fn starting_at(start: u128) -> Self {
        Self { next: start }
    }
}

impl TransactionIdSource for SequentialIds {
    fn next_id(&mut self) -> TransactionId {
        let id = TransactionId(self.next.to_be_bytes());
        self.next = self.next.wrapping_add(1);
        id
    }
}
