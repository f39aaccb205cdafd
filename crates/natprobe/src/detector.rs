//! NAT type detection facade
//!
//! Binds one UDP socket, runs the classifier once and drops the socket on
//! every exit path.

use crate::cancel::CancelToken;
use crate::classifier::NatClassifier;
use crate::config::DetectorConfig;
use crate::error::NatError;
use crate::exchange::StunExchange;
use crate::observer::{ProbeObserver, TracingObserver};
use crate::transport::{Transport, UdpTransport};
use crate::types::DetectionReport;
use natprobe_stun::{RandomIds, TransactionIdSource};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;

/// NAT type detector
///
/// Holds the configuration, the observer receiving probe events and an
/// optional cancellation token. Each call to [`detect`](Self::detect) is an
/// independent session with its own socket.
#[derive(Clone)]
pub struct NatDetector {
    config: DetectorConfig,
    observer: Arc<dyn ProbeObserver>,
    cancel: CancelToken,
}

impl Default for NatDetector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}

impl NatDetector {
    /// Create a detector from `config`
    #[must_use]
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            observer: Arc::new(TracingObserver),
            cancel: CancelToken::never(),
        }
    }

    /// Send probe events to `observer` instead of `tracing`
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ProbeObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Abort sessions when `cancel` fires
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Bind to the configured source address and classify the NAT.
    ///
    /// A source port of 0 binds an ephemeral port; mappings are then compared
    /// against the port actually bound.
    ///
    /// # Errors
    ///
    /// Returns `NatError::Socket` if the socket cannot be bound, and any error
    /// [`NatClassifier::classify`] returns.
    pub async fn detect(&self) -> Result<DetectionReport, NatError> {
        let source = SocketAddrV4::new(self.config.source_ip, self.config.source_port);
        let transport = UdpTransport::bind(source).await?;
        let local = local_endpoint(&transport, source)?;
        self.detect_on(transport, local).await
    }

    /// Classify over an existing transport, comparing mappings with `local`.
    ///
    /// # Errors
    ///
    /// See [`NatClassifier::classify`].
    pub async fn detect_on<T: Transport>(
        &self,
        transport: T,
        local: SocketAddrV4,
    ) -> Result<DetectionReport, NatError> {
        self.detect_with_ids(transport, local, RandomIds).await
    }

    /// Like [`detect_on`](Self::detect_on) with a chosen transaction id source.
    ///
    /// # Errors
    ///
    /// See [`NatClassifier::classify`].
    pub async fn detect_with_ids<T, I>(
        &self,
        transport: T,
        local: SocketAddrV4,
        ids: I,
    ) -> Result<DetectionReport, NatError>
    where
        T: Transport,
        I: TransactionIdSource + 'static,
    {
        let exchange = StunExchange::new(transport, self.config.exchange_config())
            .with_ids(ids)
            .with_observer(Arc::clone(&self.observer))
            .with_cancel(self.cancel.clone());

        let mut classifier = NatClassifier::new(exchange, local)
            .with_servers(self.config.server_pool())
            .with_observer(Arc::clone(&self.observer));

        classifier
            .classify(self.config.stun_host.as_deref(), self.config.stun_port)
            .await
    }
}

/// Detect the NAT type seen from `source_ip:source_port`.
///
/// With no `stun_host`, the default public servers are probed in order and
/// the first one that answers is used. Timeouts and retries use the defaults
/// of [`DetectorConfig`].
///
/// # Errors
///
/// Returns an error if the socket cannot be bound, a host cannot be resolved,
/// or a server's responses lack attributes the procedure needs. A server that
/// never answers is not an error: it yields [`NatType::Blocked`](crate::NatType::Blocked).
pub async fn detect_nat_type(
    source_ip: Ipv4Addr,
    source_port: u16,
    stun_host: Option<&str>,
    stun_port: u16,
) -> Result<DetectionReport, NatError> {
    let config = DetectorConfig {
        stun_host: stun_host.map(ToString::to_string),
        stun_port,
        source_ip,
        source_port,
        ..DetectorConfig::default()
    };
    NatDetector::new(config).detect().await
}

fn local_endpoint<T: Transport>(
    transport: &T,
    source: SocketAddrV4,
) -> Result<SocketAddrV4, NatError> {
    let bound = transport.local_addr()?;
    Ok(SocketAddrV4::new(*source.ip(), bound.port()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NatType;
    use natprobe_stun::{MessageType, SequentialIds, StunAttribute, StunMessage};
    use tokio::net::UdpSocket;

    /// Loopback server answering every binding request, ignoring CHANGE-REQUEST
    async fn spawn_echo_server() -> SocketAddrV4 {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let SocketAddr::V4(addr) = socket.local_addr().unwrap() else {
            panic!("expected IPv4");
        };

        tokio::spawn(async move {
            let mut buf = [0u8; 2048];
            loop {
                let Ok((len, from)) = socket.recv_from(&mut buf).await else {
                    return;
                };
                let Ok(request) = StunMessage::decode(&buf[..len]) else {
                    continue;
                };
                if request.message_type != MessageType::BindRequest {
                    continue;
                }
                let SocketAddr::V4(from) = from else {
                    continue;
                };
                let response = StunMessage::binding_response(request.transaction_id)
                    .with_attribute(StunAttribute::MappedAddress(from))
                    .with_attribute(StunAttribute::SourceAddress(addr))
                    .with_attribute(StunAttribute::ChangedAddress(addr));
                let _ = socket.send_to(&response.encode(), from).await;
            }
        });

        addr
    }

    fn loopback_config(server: SocketAddrV4) -> DetectorConfig {
        DetectorConfig {
            stun_host: Some(server.ip().to_string()),
            stun_port: server.port(),
            source_ip: Ipv4Addr::LOCALHOST,
            source_port: 0,
            attempt_timeout_ms: 50,
            retries: 1,
            ..DetectorConfig::default()
        }
    }

    #[tokio::test]
    async fn test_detect_open_internet_on_loopback() {
        let server = spawn_echo_server().await;
        let detector = NatDetector::new(loopback_config(server));

        let report = detector.detect().await.unwrap();
        assert_eq!(report.nat_type, NatType::OpenInternet);
        assert_eq!(report.external_ip, Some(Ipv4Addr::LOCALHOST));
        assert_eq!(report.stun_server, Some("127.0.0.1".to_string()));
    }

    #[tokio::test]
    async fn test_detect_with_sequential_ids() {
        let server = spawn_echo_server().await;
        let detector = NatDetector::new(loopback_config(server));

        let transport = UdpTransport::bind(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0))
            .await
            .unwrap();
        let local = local_endpoint(&transport, SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0))
            .unwrap();
        let report = detector
            .detect_with_ids(transport, local, SequentialIds::starting_at(7))
            .await
            .unwrap();
        assert_eq!(report.nat_type, NatType::OpenInternet);
        assert_eq!(report.external_addr(), Some(local));
    }

    #[tokio::test]
    async fn test_wrong_local_ip_is_full_cone() {
        // Server answers Test II too, so a mismatched local address means Full Cone
        let server = spawn_echo_server().await;
        let detector = NatDetector::new(loopback_config(server));

        let transport = UdpTransport::bind(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0))
            .await
            .unwrap();
        let report = detector
            .detect_on(transport, "10.0.0.1:1".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(report.nat_type, NatType::FullCone);
    }

    #[tokio::test]
    async fn test_silent_server_is_blocked() {
        // Bound but never read, so requests go unanswered
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let SocketAddr::V4(server) = silent.local_addr().unwrap() else {
            panic!("expected IPv4");
        };
        let config = DetectorConfig {
            attempt_timeout_ms: 10,
            ..loopback_config(server)
        };

        let report = NatDetector::new(config).detect().await.unwrap();
        assert_eq!(report.nat_type, NatType::Blocked);
        assert_eq!(report.external_addr(), None);
    }

    #[tokio::test]
    async fn test_cancelled_detector() {
        let server = spawn_echo_server().await;
        let source = crate::cancel::CancelSource::new();
        source.cancel();

        let detector = NatDetector::new(loopback_config(server)).with_cancel(source.token());
        let err = detector.detect().await.unwrap_err();
        assert!(matches!(err, NatError::Cancelled));
    }

    #[tokio::test]
    async fn test_detect_nat_type_binds_source() {
        let server = spawn_echo_server().await;
        let report = detect_nat_type(
            Ipv4Addr::LOCALHOST,
            0,
            Some(&server.ip().to_string()),
            server.port(),
        )
        .await
        .unwrap();
        assert_eq!(report.nat_type, NatType::OpenInternet);
    }

    #[tokio::test]
    async fn test_bind_failure_is_socket_error() {
        // 192.0.2.0/24 is never assigned locally
        let err = detect_nat_type("192.0.2.1".parse().unwrap(), 0, Some("127.0.0.1"), 3478)
            .await
            .unwrap_err();
        assert!(matches!(err, NatError::Socket(_)));
    }
}
