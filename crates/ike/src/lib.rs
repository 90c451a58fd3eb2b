//! IKE_SA management core for the Fynx IPSec daemon.
//!
//! This crate keeps the table of IKE security associations a daemon is
//! negotiating or has established, and arbitrates which thread may touch
//! each one:
//!
//! - **Checkout/checkin** - exclusive, blocking access to one [`IkeSa`]
//! - **Multi-key lookup** - by SPI pair, by peer host pair, by connection name
//! - **Half-open creation** - responder-side SAs created on first IKE_SA_INIT
//! - **Drain on shutdown** - no SA is destroyed while a thread holds it
//!
//! It also ships the configuration attribute registry and a tokio-based
//! datagram dispatcher that feeds inbound IKE messages to the manager.
//!
//! # Features
//!
//! - `dispatch` (default) - UDP front end built on `tokio`
//! - `serde` - serialization of ids, status records and metric snapshots
//!
//! # Example
//!
//! ```rust
//! use fynx_ike::{IkeSaManager, ManagerConfig};
//!
//! # fn main() -> fynx_ike::Result<()> {
//! let manager = IkeSaManager::new(ManagerConfig::default());
//!
//! // Initiator side: allocate an SPI and hold the new SA
//! let mut sa = manager.create_and_checkout()?;
//! sa.set_name(Some("home-gw".to_string()));
//! let id = sa.id();
//! manager.checkin(sa)?;
//!
//! // Any thread can now check it out again by id
//! let sa = manager.checkout(&id)?.into_inner();
//! assert_eq!(sa.name(), Some("home-gw"));
//! manager.checkin_and_delete(sa)?;
//! assert!(manager.is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! # References
//!
//! - [RFC 7296](https://datatracker.ietf.org/doc/html/rfc7296) - IKEv2 Protocol

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod attributes;
pub mod config;
#[cfg(feature = "dispatch")]
pub mod dispatch;
pub mod error;
pub mod ikev2;
pub mod logging;
pub mod metrics;
pub mod sa;

// Re-export commonly used types
pub use config::ManagerConfig;
pub use error::{Error, Result};
pub use sa::{Checkout, HostPair, IkeSa, IkeSaId, IkeSaManager};
