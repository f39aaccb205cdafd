//! STUN server selection.

use crate::error::NatError;
use crate::exchange::Exchange;
use crate::observer::{ProbeEvent, ProbeObserver};

/// Public STUN hosts probed when no server is configured, in priority order
pub const DEFAULT_STUN_SERVERS: [&str; 9] = [
    "stunserver.stunprotocol.org",
    "stun.hot-chilli.net",
    "stun.fitauto.ru",
    "stun.syncthing.net",
    "stun.qq.com",
    "stun.miwifi.com",
    "stun.voipbuster.com",
    "stun.voipstunt.com",
    "stun.voxgratia.org",
];

/// Ordered list of candidate STUN hosts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerPool {
    hosts: Vec<String>,
}

impl Default for ServerPool {
    fn default() -> Self {
        Self::new(DEFAULT_STUN_SERVERS.iter().map(ToString::to_string))
    }
}

impl ServerPool {
    /// Pool over `hosts`, probed in the given order
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hosts: hosts.into_iter().map(Into::into).collect(),
        }
    }

    /// Candidate hosts in probe order
    #[must_use]
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    /// Number of candidates
    #[must_use]
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Whether the pool has no candidates
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Return the first host that answers a plain binding request on `port`.
    ///
    /// Hosts that time out or fail to resolve are skipped. Later hosts are
    /// not contacted once one answers.
    ///
    /// # Errors
    ///
    /// - `NatError::NoServerAvailable` if every host failed
    /// - socket errors and cancellation are returned immediately
    pub async fn select<E: Exchange>(
        &self,
        exchange: &mut E,
        port: u16,
        observer: &dyn ProbeObserver,
    ) -> Result<String, NatError> {
        for host in &self.hosts {
            observer.on_event(&ProbeEvent::TryingServer { host: host.clone() });

            match exchange.exchange(host, port, None).await {
                Ok(_) => {
                    observer.on_event(&ProbeEvent::ServerSelected { host: host.clone() });
                    return Ok(host.clone());
                }
                Err(err @ (NatError::Timeout { .. } | NatError::Resolution { .. })) => {
                    observer.on_event(&ProbeEvent::ServerFailed {
                        host: host.clone(),
                        reason: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        Err(NatError::NoServerAvailable)
    }
}
