//! In-memory network: one host behind a configurable NAT and a STUN server
//! with two IPs and two ports.
//!
//! [`SimulatedNetwork`] implements [`Transport`], so a detector can run the
//! full discovery procedure against it without touching real sockets.
//!
//! # Example
//!
//! ```no_run
//! use natprobe::{DetectorConfig, NatDetector};
//! use natprobe_integration_tests::fixtures::{NatBehavior, SimulatedNetwork};
//!
//! # async fn run() {
//! let network = SimulatedNetwork::new(NatBehavior::PortRestrictedCone);
//! let local = network.local();
//! let config = DetectorConfig {
//!     stun_host: Some(network.server_host()),
//!     ..DetectorConfig::default()
//! };
//! let report = NatDetector::new(config).detect_on(network, local).await.unwrap();
//! # }
//! ```

use async_trait::async_trait;
use natprobe::Transport;
use natprobe_stun::{MessageType, StunAttribute, StunMessage};
use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Server primary IP
pub const SERVER_IP: Ipv4Addr = Ipv4Addr::new(198, 51, 100, 1);
/// Server alternate IP
pub const SERVER_ALT_IP: Ipv4Addr = Ipv4Addr::new(198, 51, 100, 2);
/// Server primary port
pub const SERVER_PORT: u16 = 3478;
/// Server alternate port
pub const SERVER_ALT_PORT: u16 = 3479;
/// Endpoint advertised in CHANGED-ADDRESS
pub const CHANGED: SocketAddrV4 = SocketAddrV4::new(SERVER_ALT_IP, SERVER_PORT);

/// Private address of the simulated host
pub const LOCAL: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::new(192, 168, 1, 20), 54320);
/// Public IP of the simulated NAT
pub const PUBLIC_IP: Ipv4Addr = Ipv4Addr::new(203, 0, 113, 7);

const FIRST_MAPPED_PORT: u16 = 40000;

/// What sits between the host and the internet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NatBehavior {
    /// Everything is dropped
    Blocked,
    /// Public address, no filtering
    Open,
    /// Public address behind a firewall admitting only contacted endpoints
    Firewall,
    /// One mapping, no filtering
    FullCone,
    /// One mapping, admits any port of a contacted IP
    RestrictedCone,
    /// One mapping, admits only contacted endpoints
    PortRestrictedCone,
    /// One mapping per destination, admits only contacted endpoints
    Symmetric,
}

impl NatBehavior {
    fn translates(self) -> bool {
        !matches!(self, Self::Blocked | Self::Open | Self::Firewall)
    }
}

#[derive(Default)]
struct State {
    /// Destination -> external port, for per-destination mappings
    mappings: HashMap<SocketAddrV4, u16>,
    /// Endpoints the host has sent to
    contacted: HashSet<SocketAddrV4>,
    /// Datagrams admitted to the host
    inbox: VecDeque<(Vec<u8>, SocketAddr)>,
    /// Requests per server endpoint
    requests: Vec<(SocketAddrV4, StunMessage)>,
}

/// Simulated host, NAT and STUN server
#[derive(Clone)]
pub struct SimulatedNetwork {
    behavior: NatBehavior,
    alternate_alive: bool,
    state: Arc<Mutex<State>>,
    arrived: Arc<Notify>,
}

impl SimulatedNetwork {
    /// Network with the given NAT and a fully working server
    pub fn new(behavior: NatBehavior) -> Self {
        Self {
            behavior,
            alternate_alive: true,
            state: Arc::new(Mutex::new(State::default())),
            arrived: Arc::new(Notify::new()),
        }
    }

    /// Silence the server's alternate IP
    #[must_use]
    pub fn with_dead_alternate(mut self) -> Self {
        self.alternate_alive = false;
        self
    }

    /// Host-side address the detector should compare against
    pub fn local(&self) -> SocketAddrV4 {
        LOCAL
    }

    /// Server host name accepted by the exchange (an IP literal)
    pub fn server_host(&self) -> String {
        SERVER_IP.to_string()
    }

    /// Every request the server received, with the endpoint it arrived at
    pub fn requests(&self) -> Vec<(SocketAddrV4, StunMessage)> {
        self.state.lock().unwrap().requests.clone()
    }

    fn is_server(addr: SocketAddrV4) -> bool {
        let ip = *addr.ip();
        (ip == SERVER_IP || ip == SERVER_ALT_IP)
            && matches!(addr.port(), SERVER_PORT | SERVER_ALT_PORT)
    }

    fn external(&self, state: &mut State, target: SocketAddrV4) -> SocketAddrV4 {
        match self.behavior {
            NatBehavior::Symmetric => {
                let next = FIRST_MAPPED_PORT + state.mappings.len() as u16;
                let port = *state.mappings.entry(target).or_insert(next);
                SocketAddrV4::new(PUBLIC_IP, port)
            }
            behavior if behavior.translates() => SocketAddrV4::new(PUBLIC_IP, FIRST_MAPPED_PORT),
            _ => LOCAL,
        }
    }

    fn admits(&self, state: &State, from: SocketAddrV4) -> bool {
        match self.behavior {
            NatBehavior::Blocked => false,
            NatBehavior::Open | NatBehavior::FullCone => true,
            NatBehavior::RestrictedCone => state.contacted.iter().any(|c| c.ip() == from.ip()),
            NatBehavior::Firewall | NatBehavior::PortRestrictedCone | NatBehavior::Symmetric => {
                state.contacted.contains(&from)
            }
        }
    }

    /// Server side: the response and the endpoint it leaves from
    fn serve(
        &self,
        request: &StunMessage,
        at: SocketAddrV4,
        mapped: SocketAddrV4,
    ) -> Option<(StunMessage, SocketAddrV4)> {
        if request.message_type != MessageType::BindRequest {
            return None;
        }

        let change = request.change_request();
        let ip = match change {
            Some(c) if c.change_ip() => other_ip(*at.ip()),
            _ => *at.ip(),
        };
        let port = match change {
            Some(c) if c.change_port() => other_port(at.port()),
            _ => at.port(),
        };
        let source = SocketAddrV4::new(ip, port);

        if !self.alternate_alive && (*at.ip() == SERVER_ALT_IP || ip == SERVER_ALT_IP) {
            return None;
        }

        let response = StunMessage::binding_response(request.transaction_id)
            .with_attribute(StunAttribute::MappedAddress(mapped))
            .with_attribute(StunAttribute::SourceAddress(source))
            .with_attribute(StunAttribute::ChangedAddress(CHANGED));
        Some((response, source))
    }
}

fn other_ip(ip: Ipv4Addr) -> Ipv4Addr {
    if ip == SERVER_IP { SERVER_ALT_IP } else { SERVER_IP }
}

fn other_port(port: u16) -> u16 {
    if port == SERVER_PORT {
        SERVER_ALT_PORT
    } else {
        SERVER_PORT
    }
}

#[async_trait]
impl Transport for SimulatedNetwork {
    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        let SocketAddr::V4(target) = target else {
            return Err(io::Error::new(io::ErrorKind::Unsupported, "IPv4 only"));
        };

        let mut state = self.state.lock().unwrap();
        if self.behavior == NatBehavior::Blocked || !Self::is_server(target) {
            return Ok(buf.len());
        }

        let mapped = self.external(&mut state, target);
        state.contacted.insert(target);

        let Ok(request) = StunMessage::decode(buf) else {
            return Ok(buf.len());
        };
        state.requests.push((target, request.clone()));

        if let Some((response, source)) = self.serve(&request, target, mapped) {
            if self.admits(&state, source) {
                state
                    .inbox
                    .push_back((response.encode(), SocketAddr::V4(source)));
                self.arrived.notify_one();
            }
        }
        Ok(buf.len())
    }

    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        loop {
            let next = self.state.lock().unwrap().inbox.pop_front();
            if let Some((datagram, from)) = next {
                buf[..datagram.len()].copy_from_slice(&datagram);
                return Ok((datagram.len(), from));
            }
            self.arrived.notified().await;
        }
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(SocketAddr::V4(LOCAL))
    }
}
