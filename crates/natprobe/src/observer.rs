//! Observability hooks
//!
//! The exchange, selector and classifier report what they do through an
//! injected [`ProbeObserver`]. [`TracingObserver`] is the default and turns
//! every event into a `tracing` record.

use crate::types::NatType;
use natprobe_stun::{ChangeRequest, MessageType, StunError, TransactionId};
use std::fmt;
use std::net::{SocketAddr, SocketAddrV4};
use tracing::{debug, info, trace, warn};

/// The STUN tests of the discovery procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StunTest {
    /// Plain binding request to the selected server
    TestI,
    /// CHANGE-REQUEST (IP and port) to the selected server
    TestII,
    /// Plain binding request to the server's CHANGED-ADDRESS
    TestIChanged,
    /// CHANGE-REQUEST (port only) to the changed IP
    TestIII,
}

impl fmt::Display for StunTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TestI => "Test I",
            Self::TestII => "Test II",
            Self::TestIChanged => "Test I (changed address)",
            Self::TestIII => "Test III",
        })
    }
}

/// Why a received datagram was dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscardReason {
    /// Not decodable as STUN
    Malformed(StunError),
    /// Decoded, but not a Binding Response
    UnexpectedType(MessageType),
    /// Binding Response for another transaction
    TransactionMismatch {
        /// Id we were waiting for
        expected: TransactionId,
        /// Id the datagram carried
        received: TransactionId,
    },
}

impl fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(err) => write!(f, "malformed: {err}"),
            Self::UnexpectedType(ty) => write!(f, "unexpected message type: {ty}"),
            Self::TransactionMismatch { expected, received } => {
                write!(f, "transaction id {received} does not match {expected}")
            }
        }
    }
}

/// Something that happened during detection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeEvent {
    /// Server selection is probing a candidate
    TryingServer {
        /// Candidate host
        host: String,
    },
    /// Candidate answered and will be used
    ServerSelected {
        /// Selected host
        host: String,
    },
    /// Candidate did not answer or did not resolve
    ServerFailed {
        /// Candidate host
        host: String,
        /// Error text
        reason: String,
    },
    /// A binding request went out
    RequestSent {
        /// Destination
        server: SocketAddrV4,
        /// Request transaction id
        transaction_id: TransactionId,
        /// Attempt number, starting at 1
        attempt: u32,
        /// CHANGE-REQUEST carried, if any
        change: Option<ChangeRequest>,
    },
    /// A matching Binding Response arrived
    ResponseReceived {
        /// Sender
        from: SocketAddr,
        /// Datagram size
        len: usize,
    },
    /// A datagram was dropped and the wait continues
    ResponseDiscarded {
        /// Sender
        from: SocketAddr,
        /// Why it was dropped
        reason: DiscardReason,
    },
    /// An attempt's deadline passed without a matching response
    AttemptTimedOut {
        /// Destination
        server: SocketAddrV4,
        /// Attempt number, starting at 1
        attempt: u32,
    },
    /// A decision-tree test finished
    TestCompleted {
        /// Which test
        test: StunTest,
        /// Whether the server answered
        responded: bool,
    },
    /// The session reached a classification
    Classified {
        /// Result
        nat_type: NatType,
    },
}

/// Receives [`ProbeEvent`]s
pub trait ProbeObserver: Send + Sync {
    /// Called synchronously for every event
    fn on_event(&self, event: &ProbeEvent);
}

/// Forwards events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ProbeObserver for TracingObserver {
    fn on_event(&self, event: &ProbeEvent) {
        match event {
            ProbeEvent::TryingServer { host } => debug!(%host, "trying STUN host"),
            ProbeEvent::ServerSelected { host } => info!(%host, "selected STUN host"),
            ProbeEvent::ServerFailed { host, reason } => {
                warn!(%host, %reason, "STUN host failed")
            }
            ProbeEvent::RequestSent {
                server,
                transaction_id,
                attempt,
                change,
            } => trace!(
                %server,
                %transaction_id,
                attempt,
                change = ?change.map(ChangeRequest::flags),
                "sendto"
            ),
            ProbeEvent::ResponseReceived { from, len } => trace!(%from, len, "recvfrom"),
            ProbeEvent::ResponseDiscarded { from, reason } => {
                debug!(%from, %reason, "discarded datagram")
            }
            ProbeEvent::AttemptTimedOut { server, attempt } => {
                debug!(%server, attempt, "no response before deadline")
            }
            ProbeEvent::TestCompleted { test, responded } => {
                debug!(%test, responded, "test completed")
            }
            ProbeEvent::Classified { nat_type } => info!(%nat_type, "NAT type determined"),
        }
    }
}
