//! IKE SA state held by the manager
//!
//! The manager treats an [`IkeSa`] as an opaque session: it reads the id,
//! host pair and name to index it, and the status handle to report on it.
//! Everything else belongs to the protocol code that checks it out.

use super::manager::Lease;
use super::status::{SaSummary, StatusHandle};
use super::{HostPair, IkeSaId};
use crate::ikev2::{IkeState, IkeStateMachine};
use crate::{logging, Result};
use std::fmt;
use std::time::Instant;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// IKE SA keying material (RFC 7296 Section 2.14)
///
/// All fields are automatically zeroed on drop.
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct IkeKeys {
    /// Key for deriving Child SA keys
    pub sk_d: Vec<u8>,
    /// Integrity key, initiator to responder
    pub sk_ai: Vec<u8>,
    /// Integrity key, responder to initiator
    pub sk_ar: Vec<u8>,
    /// Encryption key, initiator to responder
    pub sk_ei: Vec<u8>,
    /// Encryption key, responder to initiator
    pub sk_er: Vec<u8>,
    /// AUTH payload key, initiator
    pub sk_pi: Vec<u8>,
    /// AUTH payload key, responder
    pub sk_pr: Vec<u8>,
}

impl fmt::Debug for IkeKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IkeKeys")
            .field("sk_d", &"<redacted>")
            .finish_non_exhaustive()
    }
}

/// One IKE security association
///
/// Only constructed by the [`IkeSaManager`](super::IkeSaManager). While
/// checked out it remembers which table slot it came from, so it can be
/// checked in even after its SPIs changed.
///
/// Dropping a checked-out SA instead of checking it in (for example while
/// unwinding from a panic) deletes it from the manager: threads waiting for
/// it get `SaNotFound`.
pub struct IkeSa {
    id: IkeSaId,
    hosts: HostPair,
    name: Option<String>,
    state: IkeStateMachine,
    keys: Option<IkeKeys>,
    child_spis: Vec<u32>,
    created_at: Instant,
    established_at: Option<Instant>,
    status: StatusHandle,
    pub(super) lease: Option<Lease>,
}

impl IkeSa {
    pub(super) fn new(id: IkeSaId) -> Self {
        let state = if id.is_initiator() {
            IkeStateMachine::new_initiator()
        } else {
            IkeStateMachine::new_responder()
        };
        let hosts = HostPair::unspecified();
        let status = StatusHandle::new(SaSummary {
            state: state.state(),
            hosts,
            child_sas: 0,
        });

        Self {
            id,
            hosts,
            name: None,
            state,
            keys: None,
            child_spis: Vec::new(),
            created_at: Instant::now(),
            established_at: None,
            status,
            lease: None,
        }
    }

    /// SA identifier
    pub fn id(&self) -> IkeSaId {
        self.id
    }

    /// Record the responder's SPI
    ///
    /// The table picks up the new id at checkin.
    pub fn set_responder_spi(&mut self, spi: u64) {
        self.id.set_responder_spi(spi);
    }

    /// Peer host pair
    pub fn hosts(&self) -> HostPair {
        self.hosts
    }

    /// Set the peer host pair
    pub fn set_hosts(&mut self, hosts: HostPair) {
        self.hosts = hosts;
        self.status.update(|s| s.hosts = hosts);
    }

    /// Connection name
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Set or clear the connection name
    pub fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    /// Current protocol state
    pub fn state(&self) -> IkeState {
        self.state.state()
    }

    /// Move the state machine
    ///
    /// # Errors
    ///
    /// Returns the state machine's error if the transition is not allowed.
    pub fn transition(&mut self, next: IkeState) -> Result<()> {
        let prev = self.state.state();
        self.state.transition(next)?;
        if prev != next {
            logging::log_ike_state_transition(
                self.id.initiator_spi(),
                self.id.responder_spi(),
                &prev.to_string(),
                &next.to_string(),
            );
            if next == IkeState::Established && self.established_at.is_none() {
                self.established_at = Some(Instant::now());
            }
            self.status.update(|s| s.state = next);
        }
        Ok(())
    }

    /// Install keying material
    pub fn set_keys(&mut self, keys: IkeKeys) {
        self.keys = Some(keys);
    }

    /// Keying material, if derived
    pub fn keys(&self) -> Option<&IkeKeys> {
        self.keys.as_ref()
    }

    /// Attach a Child SA (by its inbound SPI)
    pub fn add_child_sa(&mut self, spi: u32) {
        if !self.child_spis.contains(&spi) {
            self.child_spis.push(spi);
            let count = self.child_spis.len();
            self.status.update(|s| s.child_sas = count);
        }
    }

    /// Detach a Child SA, returning whether it was attached
    pub fn remove_child_sa(&mut self, spi: u32) -> bool {
        let before = self.child_spis.len();
        self.child_spis.retain(|s| *s != spi);
        let count = self.child_spis.len();
        self.status.update(|s| s.child_sas = count);
        count != before
    }

    /// Inbound SPIs of attached Child SAs
    pub fn child_sa_spis(&self) -> &[u32] {
        &self.child_spis
    }

    /// When the SA entered the table
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// When the SA first reached ESTABLISHED
    pub fn established_at(&self) -> Option<Instant> {
        self.established_at
    }

    /// Check if the responder SPI is still unknown
    pub fn is_half_open(&self) -> bool {
        self.id.is_half_open()
    }

    /// Shared status handle
    pub fn status(&self) -> &StatusHandle {
        &self.status
    }

    /// Tear the SA down, dropping keys and Child SA references
    pub fn destroy(mut self) {
        // Deleting from a non-terminal state always succeeds
        let _ = self.state.delete();
        self.keys = None;
        self.child_spis.clear();
        self.status.update(|s| {
            s.state = IkeState::Deleted;
            s.child_sas = 0;
        });
    }
}

impl Drop for IkeSa {
    fn drop(&mut self) {
        if let Some(lease) = self.lease.take() {
            self.status.update(|s| s.state = IkeState::Deleted);
            lease.abandon(self.id);
        }
    }
}

impl fmt::Debug for IkeSa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IkeSa")
            .field("id", &self.id)
            .field("hosts", &self.hosts)
            .field("name", &self.name)
            .field("state", &self.state.state())
            .field("child_sas", &self.child_spis.len())
            .finish()
    }
}
