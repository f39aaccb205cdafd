//! Datagram transport used by STUN exchanges.
//!
//! The [`Transport`] trait is the seam between the exchange logic and the
//! network, so that exchanges can be driven by scripted transports in tests.
//! [`UdpTransport`] is the real implementation on top of a Tokio UDP socket.

use async_trait::async_trait;
use std::io;
use std::net::{SocketAddr, SocketAddrV4};
use tokio::net::UdpSocket;

/// Async datagram transport
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one datagram to `target`
    ///
    /// # Errors
    /// Returns the underlying I/O error
    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize>;

    /// Wait for the next datagram
    ///
    /// # Errors
    /// Returns the underlying I/O error
    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;

    /// Local address the transport is bound to
    ///
    /// # Errors
    /// Returns the underlying I/O error
    fn local_addr(&self) -> io::Result<SocketAddr>;
}

/// UDP transport over a single Tokio socket
///
/// The socket is closed when the transport is dropped.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// Bind a UDP socket to `addr`.
    ///
    /// # Errors
    /// Returns an error if the socket cannot be created or bound.
    pub async fn bind(addr: SocketAddrV4) -> io::Result<Self> {
        let socket = socket2::Socket::new(
            socket2::Domain::IPV4,
            socket2::Type::DGRAM,
            Some(socket2::Protocol::UDP),
        )?;
        socket.bind(&SocketAddr::V4(addr).into())?;

        // Convert to std socket, then to tokio socket
        socket.set_nonblocking(true)?;
        let std_socket: std::net::UdpSocket = socket.into();
        let socket = UdpSocket::from_std(std_socket)?;

        Ok(Self { socket })
    }

    /// Wrap an already-bound Tokio socket
    #[must_use]
    pub fn from_socket(socket: UdpSocket) -> Self {
        Self { socket }
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        self.socket.send_to(buf, target).await
    }

    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.socket.recv_from(buf).await
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}
