//! Index over the SA arena
//!
//! Slots live in a [`Slab`]; lookup maps hold slab keys. All of this sits
//! behind the manager's table lock and is only ever touched briefly.

use super::entry::{Entry, Ticket};
use super::status::StatusHandle;
use super::{HostPair, IkeSaId};
use slab::Slab;
use std::collections::HashMap;
use std::hash::Hash;
use std::net::IpAddr;
use std::sync::Arc;

/// Index keys of one SA plus its entry
///
/// The keys mirror the SA as of its last checkin.
#[derive(Debug)]
pub(super) struct Slot {
    pub(super) serial: u64,
    pub(super) id: IkeSaId,
    pub(super) hosts: HostPair,
    pub(super) name: Option<String>,
    pub(super) status: StatusHandle,
    pub(super) entry: Arc<Entry>,
}

#[derive(Debug, Default)]
pub(super) struct Table {
    slots: Slab<Slot>,
    /// Initiator SPI to slots
    by_spi: HashMap<u64, Vec<usize>>,
    by_hosts: HashMap<HostPair, Vec<usize>>,
    by_name: HashMap<String, Vec<usize>>,
    /// Every non-zero SPI in use, either side, with a use count
    live_spis: HashMap<u64, usize>,
    next_serial: u64,
    half_open: usize,
    pub(super) draining: bool,
    pub(super) stopped: bool,
}

impl Table {
    pub(super) fn new() -> Self {
        Self::default()
    }

    /// Add a freshly created SA; returns slot and serial
    pub(super) fn insert(
        &mut self,
        id: IkeSaId,
        status: StatusHandle,
        entry: Arc<Entry>,
    ) -> (usize, u64) {
        self.next_serial += 1;
        let serial = self.next_serial;
        let hosts = HostPair::unspecified();
        let key = self.slots.insert(Slot {
            serial,
            id,
            hosts,
            name: None,
            status,
            entry,
        });

        self.index_id(key, &id);
        multimap_add(&mut self.by_hosts, hosts, key);
        (key, serial)
    }

    /// Slot a ticket refers to, if it still exists
    pub(super) fn get(&self, ticket: &Ticket) -> Option<&Slot> {
        self.slots
            .get(ticket.slot)
            .filter(|slot| slot.serial == ticket.serial)
    }

    /// Slot for an SA id
    ///
    /// A half-open id matches any entry with the same initiator SPI and
    /// role. A complete id matches its exact SPI pair, or else the
    /// initiator's own half-open entry still waiting for the responder SPI.
    pub(super) fn find_by_id(&self, id: &IkeSaId) -> Option<usize> {
        let candidates = self.by_spi.get(&id.initiator_spi())?;

        if id.is_half_open() {
            return candidates
                .iter()
                .copied()
                .find(|&key| self.slots[key].id.is_initiator() == id.is_initiator());
        }

        candidates
            .iter()
            .copied()
            .find(|&key| self.slots[key].id == *id)
            .or_else(|| {
                if !id.is_initiator() {
                    return None;
                }
                candidates.iter().copied().find(|&key| {
                    let stored = &self.slots[key].id;
                    stored.is_initiator() && stored.is_half_open()
                })
            })
    }

    /// First slot whose hosts satisfy the lookup
    pub(super) fn find_by_hosts(&self, local: &IpAddr, remote: &IpAddr) -> Option<usize> {
        if !local.is_unspecified() && !remote.is_unspecified() {
            return self
                .by_hosts
                .get(&HostPair::new(*local, *remote))
                .and_then(|keys| keys.first().copied());
        }
        self.slots
            .iter()
            .find(|(_, slot)| slot.hosts.matches(local, remote))
            .map(|(key, _)| key)
    }

    pub(super) fn slot(&self, key: usize) -> Option<&Slot> {
        self.slots.get(key)
    }

    pub(super) fn contains_spi(&self, spi: u64) -> bool {
        self.live_spis.contains_key(&spi)
    }

    /// Bring the index keys of a slot in line with its SA
    ///
    /// Returns whether the SPI pair changed.
    pub(super) fn reindex(
        &mut self,
        key: usize,
        id: IkeSaId,
        hosts: HostPair,
        name: Option<&str>,
    ) -> bool {
        let Some(slot) = self.slots.get(key) else {
            return false;
        };
        let old_id = slot.id;
        let old_hosts = slot.hosts;
        let old_name = slot.name.clone();

        let rekeyed = old_id != id;
        if rekeyed {
            self.unindex_id(key, &old_id);
            self.index_id(key, &id);
        }
        if old_hosts != hosts {
            multimap_remove(&mut self.by_hosts, &old_hosts, key);
            multimap_add(&mut self.by_hosts, hosts, key);
        }
        if old_name.as_deref() != name {
            if let Some(old) = &old_name {
                multimap_remove(&mut self.by_name, old, key);
            }
            if let Some(new) = name {
                multimap_add(&mut self.by_name, new.to_string(), key);
            }
        }

        let slot = &mut self.slots[key];
        slot.id = id;
        slot.hosts = hosts;
        slot.name = name.map(str::to_string);
        rekeyed
    }

    /// Drop a slot from the arena and every index
    pub(super) fn remove(&mut self, key: usize) -> Option<Slot> {
        let slot = self.slots.try_remove(key)?;
        self.unindex_id(key, &slot.id);
        multimap_remove(&mut self.by_hosts, &slot.hosts, key);
        if let Some(name) = &slot.name {
            multimap_remove(&mut self.by_name, name, key);
        }
        Some(slot)
    }

    pub(super) fn ids(&self) -> Vec<IkeSaId> {
        self.slots.iter().map(|(_, slot)| slot.id).collect()
    }

    pub(super) fn ids_by_name(&self, name: &str) -> Vec<IkeSaId> {
        self.by_name
            .get(name)
            .map(|keys| keys.iter().map(|&key| self.slots[key].id).collect())
            .unwrap_or_default()
    }

    /// `(id, name, status)` of every SA, optionally filtered by name
    pub(super) fn status_snapshot(
        &self,
        name: Option<&str>,
    ) -> Vec<(IkeSaId, Option<String>, StatusHandle)> {
        self.slots
            .iter()
            .filter(|(_, slot)| name.map_or(true, |n| slot.name.as_deref() == Some(n)))
            .map(|(_, slot)| (slot.id, slot.name.clone(), slot.status.clone()))
            .collect()
    }

    pub(super) fn entries(&self) -> Vec<Arc<Entry>> {
        self.slots
            .iter()
            .map(|(_, slot)| Arc::clone(&slot.entry))
            .collect()
    }

    /// Empty the table, returning every slot
    pub(super) fn drain(&mut self) -> Vec<Slot> {
        self.by_spi.clear();
        self.by_hosts.clear();
        self.by_name.clear();
        self.live_spis.clear();
        self.half_open = 0;
        self.slots.drain().collect()
    }

    pub(super) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(super) fn half_open(&self) -> usize {
        self.half_open
    }

    fn index_id(&mut self, key: usize, id: &IkeSaId) {
        multimap_add(&mut self.by_spi, id.initiator_spi(), key);
        for spi in [id.initiator_spi(), id.responder_spi()] {
            if spi != 0 {
                *self.live_spis.entry(spi).or_insert(0) += 1;
            }
        }
        if id.is_half_open() {
            self.half_open += 1;
        }
    }

    fn unindex_id(&mut self, key: usize, id: &IkeSaId) {
        multimap_remove(&mut self.by_spi, &id.initiator_spi(), key);
        for spi in [id.initiator_spi(), id.responder_spi()] {
            if spi == 0 {
                continue;
            }
            if let Some(count) = self.live_spis.get_mut(&spi) {
                *count -= 1;
                if *count == 0 {
                    self.live_spis.remove(&spi);
                }
            }
        }
        if id.is_half_open() {
            self.half_open -= 1;
        }
    }
}

fn multimap_add<K: Hash + Eq>(map: &mut HashMap<K, Vec<usize>>, key: K, slot: usize) {
    let slots = map.entry(key).or_default();
    if !slots.contains(&slot) {
        slots.push(slot);
    }
}

fn multimap_remove<K: Hash + Eq>(map: &mut HashMap<K, Vec<usize>>, key: &K, slot: usize) {
    if let Some(slots) = map.get_mut(key) {
        slots.retain(|&s| s != slot);
        if slots.is_empty() {
            map.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sa::status::SaSummary;
    use crate::ikev2::IkeState;

    fn status() -> StatusHandle {
        StatusHandle::new(SaSummary {
            state: IkeState::Idle,
            hosts: HostPair::unspecified(),
            child_sas: 0,
        })
    }

    fn insert(table: &mut Table, id: IkeSaId) -> usize {
        table.insert(id, status(), Arc::new(Entry::checked_out())).0
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_half_open_initiator_matches_response() {
        let mut table = Table::new();
        let key = insert(&mut table, IkeSaId::initiator(0x1, 0));

        assert_eq!(table.find_by_id(&IkeSaId::initiator(0x1, 0x2)), Some(key));
        assert_eq!(table.find_by_id(&IkeSaId::initiator(0x1, 0)), Some(key));
        // responder-role lookups never see the initiator's entry
        assert_eq!(table.find_by_id(&IkeSaId::responder(0x1, 0)), None);
        assert_eq!(table.find_by_id(&IkeSaId::responder(0x1, 0x2)), None);
    }

    #[test]
    fn test_reindex_moves_keys() {
        let mut table = Table::new();
        let key = insert(&mut table, IkeSaId::initiator(0x1, 0));
        assert_eq!(table.half_open(), 1);

        let hosts = HostPair::new(ip("10.0.0.1"), ip("10.0.0.2"));
        assert!(table.reindex(key, IkeSaId::initiator(0x1, 0x2), hosts, Some("gw")));
        assert_eq!(table.half_open(), 0);
        assert!(table.contains_spi(0x2));
        assert_eq!(table.ids_by_name("gw"), vec![IkeSaId::initiator(0x1, 0x2)]);
        assert_eq!(table.find_by_hosts(&ip("10.0.0.1"), &ip("10.0.0.2")), Some(key));
        assert_eq!(table.find_by_hosts(&ip("0.0.0.0"), &ip("10.0.0.2")), Some(key));

        assert!(!table.reindex(key, IkeSaId::initiator(0x1, 0x2), hosts, None));
        assert!(table.ids_by_name("gw").is_empty());
    }

    #[test]
    fn test_remove_clears_indexes() {
        let mut table = Table::new();
        let key = insert(&mut table, IkeSaId::responder(0x7, 0));
        table.reindex(key, IkeSaId::responder(0x7, 0x8), HostPair::unspecified(), Some("x"));

        assert!(table.remove(key).is_some());
        assert!(table.remove(key).is_none());
        assert_eq!(table.len(), 0);
        assert!(!table.contains_spi(0x7));
        assert!(!table.contains_spi(0x8));
        assert!(table.ids_by_name("x").is_empty());
        assert_eq!(table.find_by_id(&IkeSaId::responder(0x7, 0x8)), None);
    }

    #[test]
    fn test_stale_ticket() {
        let mut table = Table::new();
        let (slot, serial) = table.insert(
            IkeSaId::initiator(0x1, 0),
            status(),
            Arc::new(Entry::checked_out()),
        );
        table.remove(slot);
        let (reused, _) = table.insert(
            IkeSaId::initiator(0x3, 0),
            status(),
            Arc::new(Entry::checked_out()),
        );
        assert_eq!(reused, slot);

        let stale = Ticket {
            manager_id: 0,
            slot,
            serial,
        };
        assert!(table.get(&stale).is_none());
    }
}
