//! IKEv2 protocol pieces the SA table depends on
//!
//! Payload encoding, key derivation and the exchanges themselves live outside
//! this crate. What remains here is what the manager and the dispatcher need
//! to route a message to its IKE SA:
//!
//! - the fixed 28-byte message header (SPIs, exchange type, flags)
//! - the IKE SA state machine each [`IkeSa`](crate::sa::IkeSa) carries
//!
//! # References
//!
//! - [RFC 7296 Section 3.1](https://datatracker.ietf.org/doc/html/rfc7296#section-3.1) - IKE Header

pub mod constants;
pub mod header;
pub mod state;

pub use constants::*;
pub use header::IkeHeader;
pub use state::{IkeState, IkeStateMachine};
