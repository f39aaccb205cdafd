//! One STUN test: a request/response cycle with timeout and retry.
//!
//! Each attempt sends the request and waits until a deadline fixed at send
//! time. Datagrams that are not the matching Binding Response are discarded
//! without extending that deadline, so an exchange never runs longer than
//! `attempts × attempt_timeout` regardless of what arrives.

use crate::cancel::CancelToken;
use crate::error::NatError;
use crate::observer::{DiscardReason, ProbeEvent, ProbeObserver, TracingObserver};
use crate::transport::Transport;
use crate::types::ExchangeResult;
use async_trait::async_trait;
use natprobe_stun::{
    ChangeRequest, MessageType, RandomIds, StunAttribute, StunMessage, TransactionId,
    TransactionIdSource,
};
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Default wait per attempt
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(1);

/// Default resends after the first attempt
pub const DEFAULT_RETRIES: u32 = 3;

/// Receive buffer size
const RECV_BUFFER_SIZE: usize = 2048;

/// Retry settings for one exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeConfig {
    /// Wait after each send
    pub attempt_timeout: Duration,
    /// Resends after the first attempt
    pub retries: u32,
}

impl ExchangeConfig {
    /// Total sends per exchange
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Upper bound on the wall-clock time of one exchange
    #[must_use]
    pub fn max_duration(&self) -> Duration {
        self.attempt_timeout.saturating_mul(self.attempts())
    }
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            retries: DEFAULT_RETRIES,
        }
    }
}

/// Runs STUN tests against a server
///
/// Implemented by [`StunExchange`]; the classifier only depends on this trait.
#[async_trait]
pub trait Exchange: Send {
    /// Send a binding request to `host:port`, optionally carrying a
    /// CHANGE-REQUEST, and wait for the matching response.
    ///
    /// # Errors
    ///
    /// - `NatError::Resolution` if `host` has no IPv4 address
    /// - `NatError::Timeout` if no matching response arrived
    /// - `NatError::Socket` on send/receive failures
    /// - `NatError::Cancelled` if the session was cancelled
    async fn exchange(
        &mut self,
        host: &str,
        port: u16,
        change: Option<ChangeRequest>,
    ) -> Result<ExchangeResult, NatError>;
}

/// Resolve `host` to its first IPv4 address.
///
/// IPv4 literals are used as-is without a lookup.
///
/// # Errors
///
/// Returns `NatError::Resolution` if the lookup fails or yields no IPv4 address.
pub async fn resolve_ipv4(host: &str, port: u16) -> Result<SocketAddrV4, NatError> {
    if let Ok(ip) = host.parse::<Ipv4Addr>() {
        return Ok(SocketAddrV4::new(ip, port));
    }

    let addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|source| NatError::Resolution {
            host: host.to_string(),
            source,
        })?;

    addrs
        .filter_map(|addr| match addr {
            SocketAddr::V4(v4) => Some(v4),
            SocketAddr::V6(_) => None,
        })
        .next()
        .ok_or_else(|| NatError::Resolution {
            host: host.to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no IPv4 address found"),
        })
}

/// STUN exchange over a [`Transport`]
///
/// Owns the transport for the session; one exchange is in flight at a time.
pub struct StunExchange<T> {
    transport: T,
    ids: Box<dyn TransactionIdSource>,
    config: ExchangeConfig,
    observer: Arc<dyn ProbeObserver>,
    cancel: CancelToken,
}

impl<T: Transport> StunExchange<T> {
    /// Exchange with random transaction ids and tracing output
    #[must_use]
    pub fn new(transport: T, config: ExchangeConfig) -> Self {
        Self {
            transport,
            ids: Box::new(RandomIds),
            config,
            observer: Arc::new(TracingObserver),
            cancel: CancelToken::never(),
        }
    }

    /// Replace the transaction id source
    #[must_use]
    pub fn with_ids(mut self, ids: impl TransactionIdSource + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    /// Replace the observer
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ProbeObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Honour `cancel` at every send and receive
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Retry settings
    #[must_use]
    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    /// Underlying transport
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Give the transport back
    #[must_use]
    pub fn into_transport(self) -> T {
        self.transport
    }

    async fn resolve(&self, host: &str, port: u16) -> Result<SocketAddrV4, NatError> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(NatError::Cancelled),
            resolved = resolve_ipv4(host, port) => resolved,
        }
    }

    async fn send(&self, request: &[u8], server: SocketAddrV4) -> Result<(), NatError> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(NatError::Cancelled),
            sent = self.transport.send_to(request, SocketAddr::V4(server)) => {
                sent?;
                Ok(())
            }
        }
    }

    /// Next datagram before `deadline`, or `None` once it has passed.
    async fn recv_until(
        &self,
        deadline: Instant,
        buf: &mut [u8],
    ) -> Result<Option<(usize, SocketAddr)>, NatError> {
        if Instant::now() >= deadline {
            return Ok(None);
        }

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(NatError::Cancelled),
            received = tokio::time::timeout_at(deadline, self.transport.recv_from(buf)) => {
                match received {
                    Err(_elapsed) => Ok(None),
                    Ok(Ok(datagram)) => Ok(Some(datagram)),
                    Ok(Err(err))
                        if matches!(
                            err.kind(),
                            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
                        ) =>
                    {
                        Ok(None)
                    }
                    Ok(Err(err)) => Err(NatError::Socket(err)),
                }
            }
        }
    }

    /// The result if `datagram` is the response to `expected`.
    fn accept(
        &self,
        datagram: &[u8],
        from: SocketAddr,
        expected: TransactionId,
    ) -> Option<ExchangeResult> {
        let reason = match StunMessage::decode(datagram) {
            Err(err) => DiscardReason::Malformed(err),
            Ok(message) if message.message_type != MessageType::BindResponse => {
                DiscardReason::UnexpectedType(message.message_type)
            }
            Ok(message) if message.transaction_id != expected => {
                DiscardReason::TransactionMismatch {
                    expected,
                    received: message.transaction_id,
                }
            }
            Ok(message) => {
                self.observer.on_event(&ProbeEvent::ResponseReceived {
                    from,
                    len: datagram.len(),
                });
                return Some(ExchangeResult::from_response(&message));
            }
        };

        self.observer
            .on_event(&ProbeEvent::ResponseDiscarded { from, reason });
        None
    }
}

#[async_trait]
impl<T: Transport> Exchange for StunExchange<T> {
    async fn exchange(
        &mut self,
        host: &str,
        port: u16,
        change: Option<ChangeRequest>,
    ) -> Result<ExchangeResult, NatError> {
        let server = self.resolve(host, port).await?;

        let transaction_id = self.ids.next_id();
        let mut request = StunMessage::binding_request(transaction_id);
        if let Some(change) = change {
            request.add_attribute(StunAttribute::ChangeRequest(change));
        }
        let request = request.encode();

        let mut buf = [0u8; RECV_BUFFER_SIZE];
        let attempts = self.config.attempts();

        for attempt in 1..=attempts {
            self.observer.on_event(&ProbeEvent::RequestSent {
                server,
                transaction_id,
                attempt,
                change,
            });
            self.send(&request, server).await?;

            let deadline = Instant::now() + self.config.attempt_timeout;
            while let Some((len, from)) = self.recv_until(deadline, &mut buf).await? {
                if let Some(result) = self.accept(&buf[..len], from, transaction_id) {
                    return Ok(result);
                }
            }

            self.observer
                .on_event(&ProbeEvent::AttemptTimedOut { server, attempt });
        }

        Err(NatError::Timeout { server, attempts })
    }
}
