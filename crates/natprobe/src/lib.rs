//! # natprobe
//!
//! NAT type discovery using the classic STUN procedure of RFC 3489.
//!
//! A detection session binds one UDP socket, optionally probes a list of
//! public STUN servers for one that answers, and runs up to four STUN tests
//! against it to place the NAT in one of the [`NatType`] categories:
//!
//! - Blocked, Open Internet, Symmetric UDP Firewall
//! - Full Cone, Restricted Cone, Port Restricted Cone, Symmetric
//! - Changed Address Error, when the server's alternate address is silent
//!
//! ## Modules
//!
//! - [`exchange`]: one request/response cycle with timeout and retry
//! - [`selector`]: first-responding server from a candidate pool
//! - [`classifier`]: the decision tree
//! - [`detector`]: socket-owning facade
//!
//! ## Example
//!
//! ```rust,no_run
//! use natprobe::{NatType, detect_nat_type};
//! use std::net::Ipv4Addr;
//!
//! # async fn run() -> Result<(), natprobe::NatError> {
//! let report = detect_nat_type(Ipv4Addr::UNSPECIFIED, 54320, None, 3478).await?;
//! println!("{} ({:?}:{:?})", report.nat_type, report.external_ip, report.external_port);
//! if report.nat_type == NatType::Symmetric {
//!     println!("direct peer-to-peer connections will need a relay");
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cancel;
pub mod classifier;
pub mod config;
pub mod detector;
pub mod error;
pub mod exchange;
pub mod observer;
pub mod selector;
pub mod transport;
pub mod types;

pub use cancel::{CancelSource, CancelToken};
pub use classifier::NatClassifier;
pub use config::{DEFAULT_SOURCE_PORT, DEFAULT_STUN_PORT, DetectorConfig};
pub use detector::{NatDetector, detect_nat_type};
pub use error::{ConfigError, NatError};
pub use exchange::{Exchange, ExchangeConfig, StunExchange};
pub use observer::{DiscardReason, ProbeEvent, ProbeObserver, StunTest, TracingObserver};
pub use selector::{DEFAULT_STUN_SERVERS, ServerPool};
pub use transport::{Transport, UdpTransport};
pub use types::{DetectionReport, ExchangeResult, NatType};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
