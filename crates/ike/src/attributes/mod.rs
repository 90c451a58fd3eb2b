//! Configuration attribute registry
//!
//! IKE peers exchange configuration attributes (virtual IPs, DNS servers,
//! ...) in CP payloads. The daemon does not store any of these itself: it
//! keeps a registry of pluggable backends and asks them.
//!
//! - [`AttributeProvider`] - responder side: hands out addresses from pools
//!   and supplies attributes for a peer
//! - [`AttributeHandler`] - initiator side: requests attributes and
//!   applies what the server sends back
//!
//! Both are held as `Arc<dyn ...>` and are identified by pointer, so the
//! same handler that requested an attribute can be asked to release it.

mod manager;
mod types;

pub use manager::AttributeManager;
pub use types::{AttributeHandler, AttributeProvider, AttributeType, ConfigAttribute};
