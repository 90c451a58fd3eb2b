//! The IKE_SA manager
//!
//! Owns every [`IkeSa`] of the daemon and lends each one to a single thread
//! at a time. See the [module docs](super) for the checkout discipline.

use super::admission::AdmissionControl;
use super::entry::{Acquire, Entry, Ticket};
use super::spi::{RandomSpiAllocator, SpiAllocator};
use super::status::{StatusRecord, StatusSink, TracingSink};
use super::table::Table;
use super::{IkeSa, IkeSaId};
use crate::config::ManagerConfig;
use crate::metrics::ManagerMetrics;
use crate::{logging, Error, Result};
use fynx_platform::{FynxResult, ModuleState, SecurityModule};
use parking_lot::Mutex;
use std::fmt;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

static NEXT_MANAGER_ID: AtomicU64 = AtomicU64::new(1);

/// Result of a successful [`IkeSaManager::checkout`]
#[derive(Debug)]
pub enum Checkout {
    /// The SA was already in the table
    Existing(IkeSa),
    /// A new half-open responder SA was created for this lookup
    Created(IkeSa),
}

impl Checkout {
    /// Take the SA regardless of how it was obtained
    pub fn into_inner(self) -> IkeSa {
        match self {
            Checkout::Existing(sa) | Checkout::Created(sa) => sa,
        }
    }

    /// Check if the lookup created the SA
    pub fn is_created(&self) -> bool {
        matches!(self, Checkout::Created(_))
    }

    /// Borrow the SA
    pub fn sa(&self) -> &IkeSa {
        match self {
            Checkout::Existing(sa) | Checkout::Created(sa) => sa,
        }
    }

    /// Borrow the SA mutably
    pub fn sa_mut(&mut self) -> &mut IkeSa {
        match self {
            Checkout::Existing(sa) | Checkout::Created(sa) => sa,
        }
    }
}

/// Concurrent table of IKE SAs with exclusive checkout
///
/// # Example
///
/// ```
/// use fynx_ike::{Checkout, IkeSaId, IkeSaManager, ManagerConfig};
///
/// # fn main() -> fynx_ike::Result<()> {
/// let manager = IkeSaManager::new(ManagerConfig::default());
///
/// // First IKE_SA_INIT request from a peer creates a half-open SA
/// let request = IkeSaId::responder(0x1122_3344_5566_7788, 0);
/// let mut sa = match manager.checkout(&request)? {
///     Checkout::Created(sa) => sa,
///     Checkout::Existing(_) => unreachable!(),
/// };
/// sa.set_responder_spi(manager.allocate_spi()?);
/// manager.checkin(sa)?;
///
/// // A retransmission finds it again
/// assert!(!manager.checkout(&request)?.is_created());
/// # Ok(())
/// # }
/// ```
pub struct IkeSaManager {
    shared: Arc<Shared>,
    config: ManagerConfig,
    spi_allocator: Box<dyn SpiAllocator>,
    admission: Option<Box<dyn AdmissionControl>>,
    manager_id: u64,
}

/// State reachable from checked-out SAs
struct Shared {
    table: Mutex<Table>,
    metrics: ManagerMetrics,
}

/// Link from a checked-out SA back to the slot it came from
pub(super) struct Lease {
    pub(super) ticket: Ticket,
    shared: Weak<Shared>,
}

impl Lease {
    /// The holder dropped the SA without checking it in
    ///
    /// Removes the slot so waiters and a pending `destroy` are released.
    pub(super) fn abandon(self, id: IkeSaId) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        let mut table = shared.table.lock();
        if table.get(&self.ticket).is_none() {
            return;
        }
        let leftover = table
            .remove(self.ticket.slot)
            .and_then(|slot| slot.entry.mark_deleted());
        shared.metrics.set_half_open(table.half_open());
        drop(table);

        if let Some(other) = leftover {
            other.destroy();
        }
        shared.metrics.record_sa_deleted();
        logging::log_ike_sa_deleted(id.initiator_spi(), id.responder_spi(), "abandoned");
    }
}

impl fmt::Debug for Lease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease").field("ticket", &self.ticket).finish()
    }
}

impl IkeSaManager {
    /// Create an empty manager drawing SPIs from the system RNG
    pub fn new(config: ManagerConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                table: Mutex::new(Table::new()),
                metrics: ManagerMetrics::new(),
            }),
            config,
            spi_allocator: Box::new(RandomSpiAllocator),
            admission: None,
            manager_id: NEXT_MANAGER_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Replace the SPI source
    pub fn with_spi_allocator(mut self, allocator: impl SpiAllocator + 'static) -> Self {
        self.spi_allocator = Box::new(allocator);
        self
    }

    /// Consult `admission` before creating responder-side SAs
    ///
    /// Without a hook every request is admitted.
    pub fn with_admission_control(mut self, admission: impl AdmissionControl + 'static) -> Self {
        self.admission = Some(Box::new(admission));
        self
    }

    /// Check out the SA with the given id
    ///
    /// Blocks while another thread holds it. A responder-role id without a
    /// responder SPI creates a new half-open SA if none exists yet; that SA is
    /// returned as [`Checkout::Created`] and is already checked out.
    ///
    /// # Errors
    ///
    /// - [`Error::SaNotFound`] if no SA matches, it was deleted while
    ///   waiting, or the manager is shutting down
    /// - [`Error::ReentrantCheckout`] if reentrancy detection is on and this
    ///   thread checked it out last without checking it in
    /// - [`Error::AdmissionDenied`] if admission control refused creation
    pub fn checkout(&self, id: &IkeSaId) -> Result<Checkout> {
        self.checkout_inner(id, true)
    }

    fn checkout_inner(&self, id: &IkeSaId, create: bool) -> Result<Checkout> {
        let (entry, ticket) = {
            let mut table = self.shared.table.lock();
            if table.draining {
                return Err(self.not_found(id));
            }

            match table.find_by_id(id) {
                Some(key) => self.entry_of(&table, key)?,
                None if create && id.is_half_open() && !id.is_initiator() => {
                    if id.initiator_spi() == 0 {
                        return Err(self.not_found(id));
                    }
                    if let Some(admission) = &self.admission {
                        if !admission.admit_half_open(id, table.half_open()) {
                            self.shared.metrics.record_admission_denied();
                            logging::log_admission_denied(id.initiator_spi(), table.half_open());
                            return Err(Error::AdmissionDenied(id.to_string()));
                        }
                    }
                    let sa = self.insert(&mut table, *id);
                    self.shared.metrics.record_responder_created();
                    logging::log_ike_sa_created(id.initiator_spi(), 0, "responder");
                    return Ok(Checkout::Created(sa));
                }
                None => return Err(self.not_found(id)),
            }
        };

        match self.acquire(&entry, ticket, id)? {
            Some(sa) => Ok(Checkout::Existing(sa)),
            None => Err(self.not_found(id)),
        }
    }

    /// Create a new initiator SA and check it out
    ///
    /// The SA gets a fresh, collision-free initiator SPI and a zero
    /// responder SPI. Never waits for other threads.
    ///
    /// # Errors
    ///
    /// - [`Error::ShuttingDown`] once [`destroy`](Self::destroy) has begun
    /// - [`Error::SpiAllocation`] if no usable SPI came up
    pub fn create_and_checkout(&self) -> Result<IkeSa> {
        let mut table = self.shared.table.lock();
        if table.draining {
            return Err(Error::ShuttingDown);
        }

        let spi = self.allocate_locked(&table)?;
        let sa = self.insert(&mut table, IkeSaId::initiator(spi, 0));
        drop(table);

        self.shared.metrics.record_initiator_created();
        logging::log_ike_sa_created(spi, 0, "initiator");
        Ok(sa)
    }

    /// Check out an SA by peer addresses
    ///
    /// An unspecified address on one side matches any address. The returned
    /// SA's hosts always satisfy the query, even if they were changed by
    /// another holder since the index was last updated.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidParameter`] if both addresses are unspecified
    /// - [`Error::SaNotFound`] if no SA matches, or the match was deleted
    ///   while waiting for it
    /// - [`Error::ReentrantCheckout`] as for [`checkout`](Self::checkout)
    pub fn checkout_by_hosts(&self, local: IpAddr, remote: IpAddr) -> Result<IkeSa> {
        if local.is_unspecified() && remote.is_unspecified() {
            return Err(Error::InvalidParameter(
                "at least one host address must be specified".into(),
            ));
        }
        let key = format!("{}...{}", local, remote);

        loop {
            let (entry, ticket) = {
                let table = self.shared.table.lock();
                if table.draining {
                    return Err(self.not_found(&key));
                }
                match table.find_by_hosts(&local, &remote) {
                    Some(slot) => self.entry_of(&table, slot)?,
                    None => return Err(self.not_found(&key)),
                }
            };

            let Some(sa) = self.acquire(&entry, ticket, &key)? else {
                return Err(self.not_found(&key));
            };
            if sa.hosts().matches(&local, &remote) {
                return Ok(sa);
            }
            // index was stale; checkin refreshes it
            self.checkin(sa)?;
        }
    }

    /// Return a checked-out SA to the table
    ///
    /// Index keys are refreshed from the SA, so SPI, host and name changes
    /// made while it was checked out become visible. Wakes one waiter.
    ///
    /// # Errors
    ///
    /// [`Error::SaNotFound`] if the SA was not checked out from this manager
    /// or its entry no longer exists. The SA is destroyed in that case.
    pub fn checkin(&self, mut sa: IkeSa) -> Result<()> {
        let id = sa.id();
        let Some(ticket) = self.take_ticket(&mut sa) else {
            sa.destroy();
            return Err(self.not_found(&id));
        };

        let mut table = self.shared.table.lock();
        let entry = match table.get(&ticket) {
            Some(slot) => Arc::clone(&slot.entry),
            None => {
                drop(table);
                sa.destroy();
                return Err(self.not_found(&id));
            }
        };
        let rekeyed = table.reindex(ticket.slot, id, sa.hosts(), sa.name());
        self.shared.metrics.set_half_open(table.half_open());
        entry.release(sa);
        drop(table);

        self.shared.metrics.record_checkin();
        logging::log_checkin(id.initiator_spi(), id.responder_spi(), rekeyed);
        Ok(())
    }

    /// Remove a checked-out SA from the table and destroy it
    ///
    /// Threads waiting for it get [`Error::SaNotFound`].
    ///
    /// # Errors
    ///
    /// [`Error::SaNotFound`] as for [`checkin`](Self::checkin); the SA is
    /// destroyed either way.
    pub fn checkin_and_delete(&self, mut sa: IkeSa) -> Result<()> {
        let id = sa.id();
        let Some(ticket) = self.take_ticket(&mut sa) else {
            sa.destroy();
            return Err(self.not_found(&id));
        };

        let mut table = self.shared.table.lock();
        if table.get(&ticket).is_none() {
            drop(table);
            sa.destroy();
            return Err(self.not_found(&id));
        }
        let leftover = table
            .remove(ticket.slot)
            .and_then(|slot| slot.entry.mark_deleted());
        self.shared.metrics.set_half_open(table.half_open());
        drop(table);

        if let Some(other) = leftover {
            other.destroy();
        }
        sa.destroy();
        self.shared.metrics.record_sa_deleted();
        logging::log_ike_sa_deleted(id.initiator_spi(), id.responder_spi(), "deleted");
        Ok(())
    }

    /// Check out an existing SA and delete it
    ///
    /// Never creates an SA.
    ///
    /// # Errors
    ///
    /// As for [`checkout`](Self::checkout). Deleting an SA the calling
    /// thread holds fails with [`Error::ReentrantCheckout`] when detection is
    /// enabled and deadlocks otherwise.
    pub fn delete(&self, id: &IkeSaId) -> Result<()> {
        let sa = self.checkout_inner(id, false)?.into_inner();
        self.checkin_and_delete(sa)
    }

    /// Ids of all SAs at this moment
    pub fn list_ids(&self) -> Vec<IkeSaId> {
        self.shared.table.lock().ids()
    }

    /// Ids of all SAs with the given connection name
    pub fn list_ids_by_name(&self, name: &str) -> Vec<IkeSaId> {
        self.shared.table.lock().ids_by_name(name)
    }

    /// Report every SA (or those named `name`) to a status sink
    ///
    /// `None` logs through `tracing`. Status is read from each SA's shared
    /// handle, so SAs checked out by other threads are reported without
    /// waiting for them. Sink errors are logged and skipped.
    pub fn log_status(&self, sink: Option<&mut dyn StatusSink>, name: Option<&str>) {
        let snapshot = self.shared.table.lock().status_snapshot(name);

        let mut tracing_sink = TracingSink;
        let sink: &mut dyn StatusSink = match sink {
            Some(sink) => sink,
            None => &mut tracing_sink,
        };

        for (id, name, status) in snapshot {
            let record = StatusRecord {
                id,
                name,
                summary: status.summary(),
            };
            if let Err(e) = sink.record(&record) {
                logging::log_status_sink_failed(&e.to_string());
            }
        }
    }

    /// Shut down: refuse new work, wait for every SA to be checked in,
    /// then destroy them all
    ///
    /// Threads blocked in a checkout return [`Error::SaNotFound`]. Calling
    /// this again, or concurrently, returns immediately.
    pub fn destroy(&self) {
        let entries = {
            let mut table = self.shared.table.lock();
            if table.draining {
                return;
            }
            table.draining = true;
            logging::log_shutdown("draining", table.len());
            table.entries()
        };

        for entry in &entries {
            entry.drive_out();
        }
        for entry in &entries {
            if let Some(sa) = entry.wait_drained() {
                sa.destroy();
            }
        }

        let slots = {
            let mut table = self.shared.table.lock();
            let slots = table.drain();
            table.stopped = true;
            self.shared.metrics.set_half_open(0);
            slots
        };
        for slot in slots {
            self.shared.metrics.record_sa_deleted();
            logging::log_ike_sa_deleted(
                slot.id.initiator_spi(),
                slot.id.responder_spi(),
                "shutdown",
            );
        }
        logging::log_shutdown("stopped", 0);
    }

    /// Draw a collision-free SPI (e.g. our responder SPI)
    ///
    /// The SPI is not reserved until the SA carrying it is checked in.
    ///
    /// # Errors
    ///
    /// [`Error::SpiAllocation`] if no usable SPI came up.
    pub fn allocate_spi(&self) -> Result<u64> {
        let table = self.shared.table.lock();
        self.allocate_locked(&table)
    }

    /// Number of SAs in the table
    pub fn len(&self) -> usize {
        self.shared.table.lock().len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of SAs without a responder SPI
    pub fn half_open_count(&self) -> usize {
        self.shared.table.lock().half_open()
    }

    /// Manager metrics
    pub fn metrics(&self) -> &ManagerMetrics {
        &self.shared.metrics
    }

    /// Manager configuration
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Lifecycle state
    pub fn module_state(&self) -> ModuleState {
        let table = self.shared.table.lock();
        if table.stopped {
            ModuleState::Stopped
        } else if table.draining {
            ModuleState::Draining
        } else {
            ModuleState::Running
        }
    }

    fn insert(&self, table: &mut Table, id: IkeSaId) -> IkeSa {
        let mut sa = IkeSa::new(id);
        let entry = Arc::new(Entry::checked_out());
        let (slot, serial) = table.insert(id, sa.status().clone(), entry);
        sa.lease = Some(self.lease(Ticket {
            manager_id: self.manager_id,
            slot,
            serial,
        }));
        self.shared.metrics.set_half_open(table.half_open());
        sa
    }

    fn entry_of(&self, table: &Table, key: usize) -> Result<(Arc<Entry>, Ticket)> {
        let slot = table
            .slot(key)
            .ok_or_else(|| Error::Internal(format!("index points at empty slot {}", key)))?;
        let ticket = Ticket {
            manager_id: self.manager_id,
            slot: key,
            serial: slot.serial,
        };
        Ok((Arc::clone(&slot.entry), ticket))
    }

    /// Wait for an entry; `Ok(None)` if it went away meanwhile
    fn acquire(
        &self,
        entry: &Entry,
        ticket: Ticket,
        key: &dyn fmt::Display,
    ) -> Result<Option<IkeSa>> {
        match entry.acquire(self.config.detect_reentrant_checkout) {
            Acquire::Acquired { mut sa, waited } => {
                sa.lease = Some(self.lease(ticket));
                self.shared.metrics.record_checkout(waited);
                let id = sa.id();
                logging::log_checkout(id.initiator_spi(), id.responder_spi(), waited);
                Ok(Some(sa))
            }
            Acquire::Gone => Ok(None),
            Acquire::Reentrant => {
                self.shared.metrics.record_reentrant_rejected();
                Err(Error::ReentrantCheckout(key.to_string()))
            }
        }
    }

    fn lease(&self, ticket: Ticket) -> Lease {
        Lease {
            ticket,
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Detach the lease of an SA checked out from this manager
    ///
    /// A foreign SA keeps its lease, so dropping it releases its own slot.
    fn take_ticket(&self, sa: &mut IkeSa) -> Option<Ticket> {
        match &sa.lease {
            Some(lease) if lease.ticket.manager_id == self.manager_id => {
                sa.lease.take().map(|lease| lease.ticket)
            }
            _ => None,
        }
    }

    fn allocate_locked(&self, table: &Table) -> Result<u64> {
        let attempts = self.config.max_spi_attempts;
        for _ in 0..attempts {
            let spi = self.spi_allocator.allocate_initiator_spi();
            if spi != 0 && !table.contains_spi(spi) {
                return Ok(spi);
            }
        }
        Err(Error::SpiAllocation { attempts })
    }

    fn not_found(&self, key: &dyn fmt::Display) -> Error {
        let key = key.to_string();
        self.shared.metrics.record_not_found();
        logging::log_not_found(&key);
        Error::SaNotFound(key)
    }
}

impl fmt::Debug for IkeSaManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IkeSaManager")
            .field("manager_id", &self.manager_id)
            .field("config", &self.config)
            .field("ike_sas", &self.len())
            .finish_non_exhaustive()
    }
}

impl SecurityModule for IkeSaManager {
    fn id(&self) -> &'static str {
        "ike-sa-manager"
    }

    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    fn description(&self) -> &'static str {
        "IKE_SA table with exclusive checkout"
    }

    fn state(&self) -> ModuleState {
        self.module_state()
    }

    fn shutdown(&mut self) -> FynxResult<()> {
        self.destroy();
        Ok(())
    }
}

impl Drop for IkeSaManager {
    /// Tear down without waiting: SAs still checked out are owned by their
    /// holders and get destroyed there
    fn drop(&mut self) {
        let slots = {
            let mut table = self.shared.table.lock();
            if table.stopped {
                return;
            }
            table.draining = true;
            table.stopped = true;
            table.drain()
        };

        for slot in slots {
            slot.entry.drive_out();
            if let Some(sa) = slot.entry.take_now() {
                sa.destroy();
            }
            self.shared.metrics.record_sa_deleted();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ikev2::IkeState;
    use crate::sa::{HalfOpenLimit, HostPair};

    fn manager() -> IkeSaManager {
        IkeSaManager::new(ManagerConfig::default())
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_create_checkin_checkout() {
        let manager = manager();
        let sa = manager.create_and_checkout().unwrap();
        let id = sa.id();
        assert!(id.is_initiator());
        assert!(id.is_half_open());
        assert_ne!(id.initiator_spi(), 0);
        assert_eq!(manager.half_open_count(), 1);

        manager.checkin(sa).unwrap();
        let sa = manager.checkout(&id).unwrap();
        assert!(!sa.is_created());
        assert_eq!(sa.sa().id(), id);
    }

    #[test]
    fn test_initiator_lookup_of_unknown_spi() {
        let manager = manager();
        let err = manager.checkout(&IkeSaId::initiator(0x5, 0)).unwrap_err();
        assert!(err.is_not_found());
        assert!(manager.is_empty());
    }

    #[test]
    fn test_responder_creates_once() {
        let manager = manager();
        let id = IkeSaId::responder(0x9, 0);

        let created = manager.checkout(&id).unwrap();
        assert!(created.is_created());
        manager.checkin(created.into_inner()).unwrap();

        let again = manager.checkout(&id).unwrap();
        assert!(!again.is_created());
        manager.checkin(again.into_inner()).unwrap();
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_response_reaches_half_open_initiator() {
        let manager = manager();
        let sa = manager.create_and_checkout().unwrap();
        let spi_i = sa.id().initiator_spi();
        manager.checkin(sa).unwrap();

        let mut sa = manager
            .checkout(&IkeSaId::initiator(spi_i, 0x2))
            .unwrap()
            .into_inner();
        sa.set_responder_spi(0x2);
        manager.checkin(sa).unwrap();

        assert_eq!(manager.list_ids(), vec![IkeSaId::initiator(spi_i, 0x2)]);
        assert_eq!(manager.half_open_count(), 0);
    }

    #[test]
    fn test_reentrant_checkout() {
        let config = ManagerConfig::builder()
            .with_reentrant_detection(true)
            .build()
            .unwrap();
        let manager = IkeSaManager::new(config);
        let sa = manager.create_and_checkout().unwrap();
        let id = sa.id();

        let err = manager.checkout(&id).unwrap_err();
        assert!(matches!(err, Error::ReentrantCheckout(_)));
        assert!(matches!(manager.delete(&id), Err(Error::ReentrantCheckout(_))));
        assert_eq!(manager.metrics().snapshot().reentrant_rejected, 2);
        manager.checkin(sa).unwrap();
    }

    #[test]
    fn test_delete() {
        let manager = manager();
        let sa = manager.create_and_checkout().unwrap();
        let id = sa.id();
        manager.checkin(sa).unwrap();

        manager.delete(&id).unwrap();
        assert!(manager.is_empty());
        assert!(manager.delete(&id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_delete_does_not_create() {
        let manager = manager();
        let err = manager.delete(&IkeSaId::responder(0x4, 0)).unwrap_err();
        assert!(err.is_not_found());
        assert!(manager.is_empty());
    }

    #[test]
    fn test_checkin_foreign_sa() {
        let a = manager();
        let b = manager();
        let sa = a.create_and_checkout().unwrap();
        let status = sa.status().clone();

        assert!(b.checkin(sa).unwrap_err().is_not_found());
        assert_eq!(status.summary().state, IkeState::Deleted);
        // the SA is gone from the manager it came from
        assert!(a.is_empty());
    }

    #[test]
    fn test_checkout_by_hosts() {
        let manager = manager();
        let mut sa = manager.create_and_checkout().unwrap();
        sa.set_hosts(HostPair::new(ip("10.0.0.1"), ip("192.0.2.1")));
        manager.checkin(sa).unwrap();

        let sa = manager
            .checkout_by_hosts(ip("0.0.0.0"), ip("192.0.2.1"))
            .unwrap();
        assert_eq!(sa.hosts().local, ip("10.0.0.1"));
        manager.checkin(sa).unwrap();

        assert!(manager
            .checkout_by_hosts(ip("10.0.0.1"), ip("192.0.2.2"))
            .unwrap_err()
            .is_not_found());
        assert!(matches!(
            manager.checkout_by_hosts(ip("0.0.0.0"), ip("::")),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_admission_denied() {
        let manager = manager().with_admission_control(HalfOpenLimit(1));
        let first = manager.checkout(&IkeSaId::responder(0x1, 0)).unwrap();
        let err = manager.checkout(&IkeSaId::responder(0x2, 0)).unwrap_err();
        assert!(matches!(err, Error::AdmissionDenied(_)));
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.metrics().snapshot().admission_denied, 1);
        manager.checkin(first.into_inner()).unwrap();
    }

    #[test]
    fn test_spi_collision_retries() {
        let next = std::sync::atomic::AtomicU64::new(0);
        // 0, 7, 7, 8, ...
        let alloc = move || match next.fetch_add(1, Ordering::Relaxed) {
            0 => 0,
            1 | 2 => 7,
            n => n + 5,
        };
        let manager = manager().with_spi_allocator(alloc);

        let a = manager.create_and_checkout().unwrap();
        let b = manager.create_and_checkout().unwrap();
        assert_eq!(a.id().initiator_spi(), 7);
        assert_eq!(b.id().initiator_spi(), 8);
    }

    #[test]
    fn test_spi_allocation_exhausted() {
        let config = ManagerConfig::builder()
            .with_max_spi_attempts(3)
            .build()
            .unwrap();
        let manager = IkeSaManager::new(config).with_spi_allocator(|| 0u64);
        assert_eq!(
            manager.create_and_checkout().unwrap_err(),
            Error::SpiAllocation { attempts: 3 }
        );
    }

    #[test]
    fn test_log_status_filters_by_name() {
        let manager = manager();
        for name in ["a", "b", "a"] {
            let mut sa = manager.create_and_checkout().unwrap();
            sa.set_name(Some(name.to_string()));
            manager.checkin(sa).unwrap();
        }
        // one checked out SA is still reported
        let held = manager.create_and_checkout().unwrap();

        let mut records: Vec<StatusRecord> = Vec::new();
        manager.log_status(Some(&mut records), Some("a"));
        assert_eq!(records.len(), 2);

        let mut all: Vec<StatusRecord> = Vec::new();
        manager.log_status(Some(&mut all), None);
        assert_eq!(all.len(), 4);

        manager.log_status(None, None);
        manager.checkin(held).unwrap();
    }

    #[test]
    fn test_destroy_refuses_new_work() {
        let manager = manager();
        let sa = manager.create_and_checkout().unwrap();
        let id = sa.id();
        manager.checkin(sa).unwrap();

        manager.destroy();
        assert!(manager.is_empty());
        assert_eq!(manager.module_state(), ModuleState::Stopped);
        assert_eq!(manager.create_and_checkout().unwrap_err(), Error::ShuttingDown);
        assert!(manager.checkout(&id).unwrap_err().is_not_found());
        assert!(manager
            .checkout(&IkeSaId::responder(0x77, 0))
            .unwrap_err()
            .is_not_found());
        manager.destroy();
    }

    #[test]
    fn test_security_module_shutdown() {
        let mut manager = manager();
        assert_eq!(SecurityModule::state(&manager), ModuleState::Running);
        manager.shutdown().unwrap();
        assert_eq!(SecurityModule::state(&manager), ModuleState::Stopped);
    }
}
