//! Loopback STUN responder on a real UDP socket
//!
//! Listens on `127.0.0.1` and answers binding requests with the sender's
//! address as MAPPED-ADDRESS. Since host and server share the loopback
//! interface, the mapping always equals the host's local endpoint.

use natprobe_stun::{MessageType, StunAttribute, StunMessage};
use std::net::{SocketAddr, SocketAddrV4};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

/// How the responder treats CHANGE-REQUEST
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponderMode {
    /// Answer every binding request from the receiving socket
    AnswerAll,
    /// Drop requests carrying a CHANGE-REQUEST, like a firewall would drop
    /// replies from an endpoint never contacted
    IgnoreChangeRequests,
    /// Read requests, answer nothing
    Silent,
}

/// Running responder; stops when dropped
pub struct StunResponder {
    addr: SocketAddrV4,
    requests: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl StunResponder {
    /// Bind to an ephemeral loopback port and start answering
    pub async fn spawn(mode: ResponderMode) -> std::io::Result<Self> {
        let socket = UdpSocket::bind("127.0.0.1:0").await?;
        let SocketAddr::V4(addr) = socket.local_addr()? else {
            return Err(std::io::Error::other("loopback bound to IPv6"));
        };
        let requests = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&requests);

        let task = tokio::spawn(async move {
            let mut buf = [0u8; 2048];
            while let Ok((len, from)) = socket.recv_from(&mut buf).await {
                let Ok(request) = StunMessage::decode(&buf[..len]) else {
                    continue;
                };
                if request.message_type != MessageType::BindRequest {
                    continue;
                }
                counter.fetch_add(1, Ordering::SeqCst);

                let SocketAddr::V4(from) = from else {
                    continue;
                };
                let answer = match mode {
                    ResponderMode::AnswerAll => true,
                    ResponderMode::IgnoreChangeRequests => request.change_request().is_none(),
                    ResponderMode::Silent => false,
                };
                if !answer {
                    continue;
                }

                let response = StunMessage::binding_response(request.transaction_id)
                    .with_attribute(StunAttribute::MappedAddress(from))
                    .with_attribute(StunAttribute::SourceAddress(addr))
                    .with_attribute(StunAttribute::ChangedAddress(addr));
                let _ = socket.send_to(&response.encode(), from).await;
            }
        });

        Ok(Self {
            addr,
            requests,
            task,
        })
    }

    /// Address the responder listens on
    pub fn addr(&self) -> SocketAddrV4 {
        self.addr
    }

    /// Binding requests received so far
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl Drop for StunResponder {
    fn drop(&mut self) {
        self.task.abort();
    }
}
