//! Test fixtures for natprobe integration tests
//!
//! - [`responder`]: loopback STUN server on a real UDP socket
//! - [`simulated_nat`]: in-memory host, NAT and two-address STUN server

pub mod responder;
pub mod simulated_nat;

pub use responder::{ResponderMode, StunResponder};
pub use simulated_nat::{NatBehavior, SimulatedNetwork};
