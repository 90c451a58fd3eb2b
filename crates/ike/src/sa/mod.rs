//! IKE security associations and the table that manages them
//!
//! # Checkout discipline
//!
//! An [`IkeSa`] is only ever touched by one thread. Threads obtain it from the
//! [`IkeSaManager`] by checking it out and give it back with a checkin:
//!
//! ```text
//!  receive thread            IkeSaManager               other thread
//!       │ checkout(id) ───────→ │                            │
//!       │ ←──────── IkeSa ───── │ ←────── checkout(id) ───── │  (blocks)
//!       │  drive protocol       │                            │
//!       │ checkin(sa) ────────→ │ ──────── IkeSa ──────────→ │  (wakes)
//! ```
//!
//! The SA value itself moves between the manager and the caller; while it is
//! checked out the table only keeps its index keys and status handle. It may
//! be passed to another thread, which then checks it in. Dropping a
//! checked-out SA deletes it, waking its waiters with `SaNotFound`.
//!
//! # Locking
//!
//! Two levels: one short-held table lock over the index maps, and a mutex +
//! condition variable per entry for exclusivity. Nobody waits on an entry
//! while holding the table lock, and the table lock is always taken before an
//! entry lock.

pub mod admission;
mod entry;
pub mod hosts;
pub mod id;
pub mod ike_sa;
pub mod manager;
pub mod spi;
pub mod status;
mod table;

pub use admission::{AdmissionControl, HalfOpenLimit};
pub use hosts::HostPair;
pub use id::IkeSaId;
pub use ike_sa::{IkeKeys, IkeSa};
pub use manager::{Checkout, IkeSaManager};
pub use spi::{RandomSpiAllocator, SpiAllocator};
pub use status::{SaSummary, StatusHandle, StatusRecord, StatusSink, TracingSink, WriterSink};
