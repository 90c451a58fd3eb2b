//! Metrics for the IKE_SA manager
//!
//! Counters and gauges describing table activity. All updates are relaxed
//! atomic operations, so a manager shared between many worker threads can
//! record them without extra locking.
//!
//! # Example
//!
//! ```
//! use fynx_ike::metrics::ManagerMetrics;
//!
//! let metrics = ManagerMetrics::new();
//!
//! metrics.record_sa_created();
//! metrics.record_checkout(true);
//! metrics.record_checkin();
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.ike_sa_active, 1);
//! assert_eq!(snapshot.checkouts_contended, 1);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// IKE_SA manager metrics
///
/// Cloning shares the underlying counters.
#[derive(Debug, Clone)]
pub struct ManagerMetrics {
    /// Successful checkouts of existing IKE SAs
    pub checkouts_total: Arc<AtomicU64>,

    /// Checkouts that had to wait for another holder
    pub checkouts_contended: Arc<AtomicU64>,

    /// Checkins (re-inserting the SA into the table)
    pub checkins_total: Arc<AtomicU64>,

    /// Lookups that found no IKE SA
    pub not_found_total: Arc<AtomicU64>,

    /// Half-open SAs created for inbound IKE_SA_INIT requests
    pub responder_sa_created: Arc<AtomicU64>,

    /// SAs created locally as original initiator
    pub initiator_sa_created: Arc<AtomicU64>,

    /// IKE SAs deleted (including shutdown)
    pub ike_sa_deleted: Arc<AtomicU64>,

    /// Checkouts refused because the thread already held the SA
    pub reentrant_rejected: Arc<AtomicU64>,

    /// Half-open SAs refused by admission control
    pub admission_denied: Arc<AtomicU64>,

    /// IKE SAs currently in the table
    pub ike_sa_active: Arc<AtomicU64>,

    /// IKE SAs currently without a responder SPI
    pub ike_sa_half_open: Arc<AtomicU64>,
}

impl ManagerMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self {
            checkouts_total: Arc::new(AtomicU64::new(0)),
            checkouts_contended: Arc::new(AtomicU64::new(0)),
            checkins_total: Arc::new(AtomicU64::new(0)),
            not_found_total: Arc::new(AtomicU64::new(0)),
            responder_sa_created: Arc::new(AtomicU64::new(0)),
            initiator_sa_created: Arc::new(AtomicU64::new(0)),
            ike_sa_deleted: Arc::new(AtomicU64::new(0)),
            reentrant_rejected: Arc::new(AtomicU64::new(0)),
            admission_denied: Arc::new(AtomicU64::new(0)),
            ike_sa_active: Arc::new(AtomicU64::new(0)),
            ike_sa_half_open: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Record a checkout of an existing SA
    ///
    /// # Arguments
    ///
    /// * `contended` - Whether the caller had to wait for the entry
    pub fn record_checkout(&self, contended: bool) {
        self.checkouts_total.fetch_add(1, Ordering::Relaxed);
        if contended {
            self.checkouts_contended.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a checkin
    pub fn record_checkin(&self) {
        self.checkins_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a lookup that found nothing
    pub fn record_not_found(&self) {
        self.not_found_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a responder-side half-open SA
    pub fn record_responder_created(&self) {
        self.responder_sa_created.fetch_add(1, Ordering::Relaxed);
        self.record_sa_created();
    }

    /// Record an initiator-side SA
    pub fn record_initiator_created(&self) {
        self.initiator_sa_created.fetch_add(1, Ordering::Relaxed);
        self.record_sa_created();
    }

    /// Record an SA entering the table
    pub fn record_sa_created(&self) {
        self.ike_sa_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an SA leaving the table
    pub fn record_sa_deleted(&self) {
        let _ = self
            .ike_sa_active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| Some(n.saturating_sub(1)));
        self.ike_sa_deleted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a refused reentrant checkout
    pub fn record_reentrant_rejected(&self) {
        self.reentrant_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a refusal by admission control
    pub fn record_admission_denied(&self) {
        self.admission_denied.fetch_add(1, Ordering::Relaxed);
    }

    /// Publish the current half-open count
    pub fn set_half_open(&self, count: usize) {
        self.ike_sa_half_open.store(count as u64, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    ///
    /// Values may be slightly inconsistent across metrics due to concurrent updates.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            checkouts_total: self.checkouts_total.load(Ordering::Relaxed),
            checkouts_contended: self.checkouts_contended.load(Ordering::Relaxed),
            checkins_total: self.checkins_total.load(Ordering::Relaxed),
            not_found_total: self.not_found_total.load(Ordering::Relaxed),
            responder_sa_created: self.responder_sa_created.load(Ordering::Relaxed),
            initiator_sa_created: self.initiator_sa_created.load(Ordering::Relaxed),
            ike_sa_deleted: self.ike_sa_deleted.load(Ordering::Relaxed),
            reentrant_rejected: self.reentrant_rejected.load(Ordering::Relaxed),
            admission_denied: self.admission_denied.load(Ordering::Relaxed),
            ike_sa_active: self.ike_sa_active.load(Ordering::Relaxed),
            ike_sa_half_open: self.ike_sa_half_open.load(Ordering::Relaxed),
        }
    }

    /// Reset the counters to zero
    ///
    /// Gauges keep describing the live table.
    pub fn reset(&self) {
        for counter in [
            &self.checkouts_total,
            &self.checkouts_contended,
            &self.checkins_total,
            &self.not_found_total,
            &self.responder_sa_created,
            &self.initiator_sa_created,
            &self.ike_sa_deleted,
            &self.reentrant_rejected,
            &self.admission_denied,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for ManagerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time snapshot of the manager metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricsSnapshot {
    /// Successful checkouts of existing IKE SAs
    pub checkouts_total: u64,
    /// Checkouts that had to wait
    pub checkouts_contended: u64,
    /// Checkins
    pub checkins_total: u64,
    /// Lookups that found nothing
    pub not_found_total: u64,
    /// Responder-side SAs created
    pub responder_sa_created: u64,
    /// Initiator-side SAs created
    pub initiator_sa_created: u64,
    /// IKE SAs deleted
    pub ike_sa_deleted: u64,
    /// Reentrant checkouts refused
    pub reentrant_rejected: u64,
    /// Half-open SAs refused by admission control
    pub admission_denied: u64,
    /// IKE SAs currently in the table
    pub ike_sa_active: u64,
    /// Half-open IKE SAs currently in the table
    pub ike_sa_half_open: u64,
}

impl MetricsSnapshot {
    /// Fraction of checkouts that had to wait (0.0 to 1.0)
    pub fn contention_rate(&self) -> f64 {
        if self.checkouts_total == 0 {
            return 0.0;
        }
        self.checkouts_contended as f64 / self.checkouts_total as f64
    }

    /// Total SAs ever created
    pub fn sa_created_total(&self) -> u64 {
        self.responder_sa_created + self.initiator_sa_created
    }
}
