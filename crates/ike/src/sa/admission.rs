//! Admission control for responder-side SA creation
//!
//! Any peer can make the manager allocate a half-open SA by sending an
//! IKE_SA_INIT request. A hook lets the daemon refuse such requests (for
//! instance while under a flood) before anything is allocated.

use super::IkeSaId;

/// Decides whether a new half-open responder SA may be created
pub trait AdmissionControl: Send + Sync {
    /// Called with the table lock held; keep it cheap and non-blocking
    fn admit_half_open(&self, id: &IkeSaId, half_open: usize) -> bool;
}

/// Refuses new half-open SAs once `limit` of them exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HalfOpenLimit(pub usize);

impl AdmissionControl for HalfOpenLimit {
    fn admit_half_open(&self, _id: &IkeSaId, half_open: usize) -> bool {
        half_open < self.0
    }
}
