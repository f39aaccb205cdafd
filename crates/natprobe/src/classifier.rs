//! RFC 3489 NAT classification.
//!
//! The decision tree runs up to four STUN tests against one server:
//!
//! ```text
//! Test I ── no response ─────────────────────────────► Blocked
//!    │
//!    ├─ mapped == local ─ Test II ── response ───────► Open Internet
//!    │                       └────── no response ────► Symmetric UDP Firewall
//!    │
//!    └─ mapped != local ─ Test II ── response ───────► Full Cone
//!                            │
//!                            └─ Test I @ CHANGED-ADDRESS
//!                                  ├─ no response ───► Changed Address Error
//!                                  ├─ mapping differs ► Symmetric NAT
//!                                  └─ same mapping ─ Test III ── response ► Restricted Cone
//!                                                        └─ no response ──► Port Restricted Cone
//! ```
//!
//! Test II carries CHANGE-REQUEST with both flags; Test III carries the
//! port flag only and goes to the changed IP on the original port.

use crate::error::NatError;
use crate::exchange::Exchange;
use crate::observer::{ProbeEvent, ProbeObserver, StunTest, TracingObserver};
use crate::selector::ServerPool;
use crate::types::{DetectionReport, ExchangeResult, NatType};
use natprobe_stun::{AttributeType, ChangeRequest};
use std::net::SocketAddrV4;
use std::sync::Arc;

/// Runs the discovery procedure over an [`Exchange`]
pub struct NatClassifier<E> {
    exchange: E,
    local: SocketAddrV4,
    servers: ServerPool,
    observer: Arc<dyn ProbeObserver>,
}

impl<E: Exchange> NatClassifier<E> {
    /// Classifier comparing mappings against `local`
    #[must_use]
    pub fn new(exchange: E, local: SocketAddrV4) -> Self {
        Self {
            exchange,
            local,
            servers: ServerPool::default(),
            observer: Arc::new(TracingObserver),
        }
    }

    /// Candidates used when no STUN host is given
    #[must_use]
    pub fn with_servers(mut self, servers: ServerPool) -> Self {
        self.servers = servers;
        self
    }

    /// Replace the observer
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ProbeObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Local endpoint mappings are compared against
    #[must_use]
    pub fn local(&self) -> SocketAddrV4 {
        self.local
    }

    /// Give the exchange back
    #[must_use]
    pub fn into_exchange(self) -> E {
        self.exchange
    }

    /// Classify the NAT between us and `stun_host:stun_port`.
    ///
    /// With no host, the server pool is probed first; if nobody answers the
    /// result is [`NatType::Blocked`]. The reported external endpoint is the
    /// Test I mapping.
    ///
    /// # Errors
    ///
    /// - `NatError::Resolution` if a host cannot be resolved
    /// - `NatError::Socket` on I/O failures
    /// - `NatError::MissingAttribute` if a response lacks MAPPED-ADDRESS,
    ///   or CHANGED-ADDRESS when the tree needs it
    /// - `NatError::Cancelled` if the session was cancelled
    pub async fn classify(
        &mut self,
        stun_host: Option<&str>,
        stun_port: u16,
    ) -> Result<DetectionReport, NatError> {
        let host = match stun_host {
            Some(host) => host.to_string(),
            None => match self
                .servers
                .select(&mut self.exchange, stun_port, self.observer.as_ref())
                .await
            {
                Ok(host) => host,
                Err(NatError::NoServerAvailable) => {
                    return Ok(self.finish(NatType::Blocked, None, None));
                }
                Err(err) => return Err(err),
            },
        };

        let first = self.run(StunTest::TestI, &host, stun_port, None).await?;
        if !first.responded {
            return Ok(self.finish(NatType::Blocked, None, Some(host)));
        }
        let external = require(first.external, &host, AttributeType::MappedAddress)?;

        let second = self
            .run(
                StunTest::TestII,
                &host,
                stun_port,
                Some(ChangeRequest::IP_AND_PORT),
            )
            .await?;

        if external == self.local {
            let nat_type = if second.responded {
                NatType::OpenInternet
            } else {
                NatType::SymmetricUdpFirewall
            };
            return Ok(self.finish(nat_type, Some(external), Some(host)));
        }

        if second.responded {
            return Ok(self.finish(NatType::FullCone, Some(external), Some(host)));
        }

        let changed = require(first.changed, &host, AttributeType::ChangedAddress)?;
        let changed_ip = changed.ip().to_string();

        let third = self
            .run(StunTest::TestIChanged, &changed_ip, changed.port(), None)
            .await?;
        if !third.responded {
            return Ok(self.finish(NatType::ChangedAddressError, Some(external), Some(host)));
        }
        let remapped = require(third.external, &changed_ip, AttributeType::MappedAddress)?;

        if remapped != external {
            return Ok(self.finish(NatType::Symmetric, Some(external), Some(host)));
        }

        let fourth = self
            .run(
                StunTest::TestIII,
                &changed_ip,
                stun_port,
                Some(ChangeRequest::PORT_ONLY),
            )
            .await?;
        let nat_type = if fourth.responded {
            NatType::RestrictedCone
        } else {
            NatType::PortRestrictedCone
        };
        Ok(self.finish(nat_type, Some(external), Some(host)))
    }

    /// One test; a timeout is an ordinary "no response".
    async fn run(
        &mut self,
        test: StunTest,
        host: &str,
        port: u16,
        change: Option<ChangeRequest>,
    ) -> Result<ExchangeResult, NatError> {
        let result = match self.exchange.exchange(host, port, change).await {
            Ok(result) => result,
            Err(err) if err.is_timeout() => ExchangeResult::no_response(),
            Err(err) => return Err(err),
        };

        self.observer.on_event(&ProbeEvent::TestCompleted {
            test,
            responded: result.responded,
        });
        Ok(result)
    }

    fn finish(
        &self,
        nat_type: NatType,
        external: Option<SocketAddrV4>,
        stun_server: Option<String>,
    ) -> DetectionReport {
        self.observer
            .on_event(&ProbeEvent::Classified { nat_type });
        DetectionReport::new(nat_type, external, stun_server)
    }
}

fn require(
    addr: Option<SocketAddrV4>,
    server: &str,
    attribute: AttributeType,
) -> Result<SocketAddrV4, NatError> {
    addr.ok_or_else(|| NatError::MissingAttribute {
        server: server.to_string(),
        attribute,
    })
}
