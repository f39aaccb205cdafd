//! NAT classification results
//!
//! [`NatType`] is the outcome of the RFC 3489 discovery procedure,
//! [`ExchangeResult`] what a single STUN test observed, and
//! [`DetectionReport`] what a detection session hands back to its caller.

use natprobe_stun::StunMessage;
use serde::Serialize;
use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};

/// NAT type classification
///
/// Cone and symmetric categories follow RFC 3489 Section 5:
/// - Open Internet: no translation, no filtering
/// - Full Cone: any external host can send to the mapped port
/// - Restricted Cone: only hosts that were sent to can reply
/// - Port Restricted Cone: only contacted IP:port pairs can reply
/// - Symmetric: a different mapping per destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NatType {
    /// UDP is blocked, or no STUN server answered
    #[serde(rename = "Blocked")]
    Blocked,
    /// Public address, no NAT and no firewall
    #[serde(rename = "Open Internet")]
    OpenInternet,
    /// Full Cone NAT
    #[serde(rename = "Full Cone")]
    FullCone,
    /// Public address behind a firewall that drops unsolicited replies
    #[serde(rename = "Symmetric UDP Firewall")]
    SymmetricUdpFirewall,
    /// Address-restricted cone NAT
    #[serde(rename = "Restrict Cone")]
    RestrictedCone,
    /// Port-restricted cone NAT
    #[serde(rename = "Port Restricted Cone")]
    PortRestrictedCone,
    /// Symmetric NAT
    #[serde(rename = "Symmetric")]
    Symmetric,
    /// Server's CHANGED-ADDRESS did not answer a plain Test I
    #[serde(rename = "Meet an error, when do Test1 on Changed IP and Port")]
    ChangedAddressError,
}

impl NatType {
    /// Every classification, in decision-tree order
    pub const ALL: [Self; 8] = [
        Self::Blocked,
        Self::OpenInternet,
        Self::SymmetricUdpFirewall,
        Self::FullCone,
        Self::ChangedAddressError,
        Self::RestrictedCone,
        Self::PortRestrictedCone,
        Self::Symmetric,
    ];

    /// Human-readable name
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Blocked => "Blocked",
            Self::OpenInternet => "Open Internet",
            Self::FullCone => "Full Cone",
            Self::SymmetricUdpFirewall => "Symmetric UDP Firewall",
            Self::RestrictedCone => "Restrict Cone",
            Self::PortRestrictedCone => "Port Restricted Cone",
            Self::Symmetric => "Symmetric",
            Self::ChangedAddressError => "Meet an error, when do Test1 on Changed IP and Port",
        }
    }

    /// Whether an unsolicited peer can reach the mapped endpoint
    #[must_use]
    pub const fn accepts_unsolicited(self) -> bool {
        matches!(self, Self::OpenInternet | Self::FullCone)
    }
}

impl fmt::Display for NatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// What one STUN test observed
///
/// All addresses stay `None` unless a matching Binding Response arrived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExchangeResult {
    /// A matching response arrived
    pub responded: bool,
    /// MAPPED-ADDRESS: our endpoint as the server saw it
    pub external: Option<SocketAddrV4>,
    /// SOURCE-ADDRESS: where the server answered from
    pub source: Option<SocketAddrV4>,
    /// CHANGED-ADDRESS: the server's alternate endpoint
    pub changed: Option<SocketAddrV4>,
}

impl ExchangeResult {
    /// Result of a test that got no answer
    #[must_use]
    pub fn no_response() -> Self {
        Self::default()
    }

    /// Result of a test answered by `response`
    #[must_use]
    pub fn from_response(response: &StunMessage) -> Self {
        Self {
            responded: true,
            external: response.mapped_address(),
            source: response.source_address(),
            changed: response.changed_address(),
        }
    }
}

/// Outcome of a detection session
///
/// Serializes with the keys `type`, `external_ip` and `external_port`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectionReport {
    /// Classification
    #[serde(rename = "type")]
    pub nat_type: NatType,
    /// External IP from Test I, if the server answered
    pub external_ip: Option<Ipv4Addr>,
    /// External port from Test I, if the server answered
    pub external_port: Option<u16>,
    /// STUN server the tests ran against
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stun_server: Option<String>,
}

impl DetectionReport {
    /// Build a report from a classification and the Test I mapping
    #[must_use]
    pub fn new(
        nat_type: NatType,
        external: Option<SocketAddrV4>,
        stun_server: Option<String>,
    ) -> Self {
        Self {
            nat_type,
            external_ip: external.map(|addr| *addr.ip()),
            external_port: external.map(|addr| addr.port()),
            stun_server,
        }
    }

    /// External endpoint as a socket address
    #[must_use]
    pub fn external_addr(&self) -> Option<SocketAddrV4> {
        match (self.external_ip, self.external_port) {
            (Some(ip), Some(port)) => Some(SocketAddrV4::new(ip, port)),
            _ => None,
        }
    }
}
