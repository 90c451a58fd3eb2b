//! Concurrency properties of the IKE_SA manager
//!
//! These tests drive one manager from many threads and check the
//! exclusivity, wake-up and shutdown guarantees of checkout/checkin.

use fynx_ike::{Checkout, HostPair, IkeSaId, IkeSaManager, ManagerConfig};
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

fn manager() -> Arc<IkeSaManager> {
    Arc::new(IkeSaManager::new(ManagerConfig::default()))
}

fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

/// At most one thread holds an SA at any time
#[test]
fn test_mutual_exclusion() {
    const THREADS: usize = 8;
    const ROUNDS: usize = 200;

    let manager = manager();
    let sa = manager.create_and_checkout().unwrap();
    let id = sa.id();
    manager.checkin(sa).unwrap();

    let held = Arc::new(AtomicBool::new(false));
    let total = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(THREADS));

    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let manager = Arc::clone(&manager);
            let held = Arc::clone(&held);
            let total = Arc::clone(&total);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..ROUNDS {
                    let mut sa = manager.checkout(&id).unwrap().into_inner();
                    assert!(!held.swap(true, Ordering::SeqCst), "SA held twice");
                    sa.add_child_sa(total.fetch_add(1, Ordering::SeqCst) as u32);
                    held.store(false, Ordering::SeqCst);
                    manager.checkin(sa).unwrap();
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    let sa = manager.checkout(&id).unwrap().into_inner();
    assert_eq!(sa.child_sa_spis().len(), THREADS * ROUNDS);
    manager.checkin(sa).unwrap();

    let snapshot = manager.metrics().snapshot();
    assert_eq!(snapshot.checkouts_total, (THREADS * ROUNDS + 1) as u64);
}

/// The first responder lookup creates; a concurrent one waits and then
/// sees the same SA
#[test]
fn test_responder_created_once() {
    let manager = manager();
    let id = IkeSaId::responder(0xA1, 0);

    let first = manager.checkout(&id).unwrap();
    assert!(first.is_created());

    let (tx, rx) = mpsc::channel();
    let waiter = {
        let manager = Arc::clone(&manager);
        thread::spawn(move || {
            let checkout = manager.checkout(&id).unwrap();
            tx.send(()).unwrap();
            checkout
        })
    };

    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    assert_eq!(manager.len(), 1);

    let mut sa = first.into_inner();
    sa.set_name(Some("first".to_string()));
    manager.checkin(sa).unwrap();

    match waiter.join().unwrap() {
        Checkout::Existing(sa) => {
            assert_eq!(sa.name(), Some("first"));
            manager.checkin(sa).unwrap();
        }
        Checkout::Created(_) => panic!("second lookup created another SA"),
    }
    assert_eq!(manager.len(), 1);
    assert_eq!(manager.metrics().snapshot().responder_sa_created, 1);
}

/// Threads blocked on an SA that gets deleted return not-found
#[test]
fn test_delete_wakes_waiters() {
    const WAITERS: usize = 4;

    let manager = manager();
    let sa = manager.create_and_checkout().unwrap();
    let id = sa.id();

    let waiters: Vec<_> = (0..WAITERS)
        .map(|_| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || manager.checkout(&id).map(Checkout::into_inner))
        })
        .collect();

    thread::sleep(Duration::from_millis(100));
    manager.checkin_and_delete(sa).unwrap();

    for waiter in waiters {
        let err = waiter.join().unwrap().unwrap_err();
        assert!(err.is_not_found());
    }
    assert!(manager.is_empty());
}

/// Waiters are served one per checkin and all eventually get the SA
#[test]
fn test_waiters_served_in_turn() {
    const WAITERS: usize = 6;

    let manager = manager();
    let sa = manager.create_and_checkout().unwrap();
    let id = sa.id();
    let served = Arc::new(AtomicUsize::new(0));

    let waiters: Vec<_> = (0..WAITERS)
        .map(|_| {
            let manager = Arc::clone(&manager);
            let served = Arc::clone(&served);
            thread::spawn(move || {
                let sa = manager.checkout(&id).unwrap().into_inner();
                served.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(5));
                manager.checkin(sa).unwrap();
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(50));
    assert_eq!(served.load(Ordering::SeqCst), 0);
    manager.checkin(sa).unwrap();

    for waiter in waiters {
        waiter.join().unwrap();
    }
    assert_eq!(served.load(Ordering::SeqCst), WAITERS);
}

/// Host lookups never return an SA whose hosts don't match, even while
/// other threads keep moving SAs between address pairs
#[test]
fn test_hosts_lookup_never_mismatches() {
    const SAS: usize = 4;
    const ROUNDS: usize = 300;

    let manager = manager();
    let pairs = [
        HostPair::new(ip("10.0.0.1"), ip("192.0.2.1")),
        HostPair::new(ip("10.0.0.1"), ip("192.0.2.2")),
    ];

    let ids: Vec<IkeSaId> = (0..SAS)
        .map(|i| {
            let mut sa = manager.create_and_checkout().unwrap();
            sa.set_hosts(pairs[i % 2]);
            let id = sa.id();
            manager.checkin(sa).unwrap();
            id
        })
        .collect();

    thread::scope(|s| {
        for &id in &ids {
            let manager = &manager;
            s.spawn(move || {
                for round in 0..ROUNDS {
                    let mut sa = manager.checkout(&id).unwrap().into_inner();
                    sa.set_hosts(pairs[round % 2]);
                    manager.checkin(sa).unwrap();
                }
            });
        }
        for pair in pairs {
            let manager = &manager;
            s.spawn(move || {
                for _ in 0..ROUNDS {
                    match manager.checkout_by_hosts(ip("0.0.0.0"), pair.remote) {
                        Ok(sa) => {
                            assert_eq!(sa.hosts().remote, pair.remote);
                            manager.checkin(sa).unwrap();
                        }
                        Err(e) => assert!(e.is_not_found()),
                    }
                }
            });
        }
    });

    assert_eq!(manager.len(), SAS);
}

/// destroy waits for the holder, turns away waiters and leaves nothing
#[test]
fn test_destroy_blocks_until_checked_in() {
    let manager = manager();
    for _ in 0..3 {
        let sa = manager.create_and_checkout().unwrap();
        manager.checkin(sa).unwrap();
    }
    let held = manager.create_and_checkout().unwrap();
    let held_id = held.id();

    let waiter = {
        let manager = Arc::clone(&manager);
        thread::spawn(move || manager.checkout(&held_id).map(Checkout::into_inner))
    };
    thread::sleep(Duration::from_millis(50));

    let (tx, rx) = mpsc::channel();
    let destroyer = {
        let manager = Arc::clone(&manager);
        thread::spawn(move || {
            manager.destroy();
            tx.send(()).unwrap();
        })
    };

    assert!(waiter.join().unwrap().unwrap_err().is_not_found());
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());

    manager.checkin(held).unwrap();
    rx.recv_timeout(Duration::from_secs(5)).unwrap();
    destroyer.join().unwrap();

    assert!(manager.is_empty());
    assert!(manager.list_ids().is_empty());
    let snapshot = manager.metrics().snapshot();
    assert_eq!(snapshot.ike_sa_active, 0);
    assert_eq!(snapshot.ike_sa_deleted, 4);
}

/// Operations on different SAs do not wait for each other
#[test]
fn test_independent_sas_do_not_block() {
    let manager = manager();
    let a = manager.create_and_checkout().unwrap();
    let b = manager.create_and_checkout().unwrap();
    let b_id = b.id();
    manager.checkin(b).unwrap();

    let other = {
        let manager = Arc::clone(&manager);
        thread::spawn(move || {
            let sa = manager.checkout(&b_id).unwrap().into_inner();
            manager.checkin(sa).unwrap();
        })
    };
    other.join().unwrap();
    manager.checkin(a).unwrap();
    assert_eq!(manager.metrics().snapshot().checkouts_contended, 0);
}

/// An SA handed to another thread blocks its original holder's next
/// checkout until the new holder checks it in
#[test]
fn test_checkout_waits_for_handed_off_sa() {
    let manager = manager();
    let sa = manager.create_and_checkout().unwrap();
    let id = sa.id();
    let checked_in = Arc::new(AtomicBool::new(false));

    let holder = {
        let manager = Arc::clone(&manager);
        let checked_in = Arc::clone(&checked_in);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            checked_in.store(true, Ordering::SeqCst);
            manager.checkin(sa).unwrap();
        })
    };

    let sa = manager.checkout(&id).unwrap().into_inner();
    assert!(checked_in.load(Ordering::SeqCst));
    assert_eq!(sa.id(), id);
    manager.checkin(sa).unwrap();
    holder.join().unwrap();
    assert_eq!(manager.metrics().snapshot().checkouts_contended, 1);
}

/// A holder that panics with the SA drops it; waiters and destroy are
/// released instead of blocking forever
#[test]
fn test_panicking_holder_releases_sa() {
    let manager = manager();
    let sa = manager.create_and_checkout().unwrap();
    let id = sa.id();

    let (tx, rx) = mpsc::channel();
    let waiter = {
        let manager = Arc::clone(&manager);
        thread::spawn(move || {
            let result = manager.checkout(&id).map(Checkout::into_inner);
            tx.send(()).unwrap();
            result
        })
    };
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

    let holder = thread::spawn(move || {
        let _sa = sa;
        panic!("handler failed");
    });
    assert!(holder.join().is_err());

    rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(waiter.join().unwrap().unwrap_err().is_not_found());
    assert!(manager.checkout(&id).unwrap_err().is_not_found());
    assert!(manager.is_empty());
    assert_eq!(manager.metrics().snapshot().ike_sa_active, 0);

    let (tx, rx) = mpsc::channel();
    let destroyer = {
        let manager = Arc::clone(&manager);
        thread::spawn(move || {
            manager.destroy();
            tx.send(()).unwrap();
        })
    };
    rx.recv_timeout(Duration::from_secs(5)).unwrap();
    destroyer.join().unwrap();
}

/// Dropping a held SA while destroy waits for it lets destroy finish
#[test]
fn test_destroy_finishes_when_holder_drops_sa() {
    let manager = manager();
    let held = manager.create_and_checkout().unwrap();

    let (tx, rx) = mpsc::channel();
    let destroyer = {
        let manager = Arc::clone(&manager);
        thread::spawn(move || {
            manager.destroy();
            tx.send(()).unwrap();
        })
    };
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

    drop(held);
    rx.recv_timeout(Duration::from_secs(5)).unwrap();
    destroyer.join().unwrap();
    assert!(manager.is_empty());
}

/// Once deleted, an SA is not found by its hosts either
#[test]
fn test_hosts_lookup_after_delete() {
    let manager = manager();
    let mut sa = manager.create_and_checkout().unwrap();
    sa.set_hosts(HostPair::new(ip("10.0.0.1"), ip("192.0.2.1")));
    manager.checkin(sa).unwrap();

    let sa = manager
        .checkout_by_hosts(ip("10.0.0.1"), ip("192.0.2.1"))
        .unwrap();
    manager.checkin_and_delete(sa).unwrap();

    let err = manager
        .checkout_by_hosts(ip("10.0.0.1"), ip("192.0.2.1"))
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(manager
        .checkout_by_hosts(ip("0.0.0.0"), ip("192.0.2.1"))
        .unwrap_err()
        .is_not_found());
}

/// A host lookup blocked on an SA that gets deleted returns not-found, even
/// if another SA took over the same hosts meanwhile
#[test]
fn test_hosts_waiter_sees_delete() {
    let manager = manager();
    let hosts = HostPair::new(ip("10.0.0.1"), ip("192.0.2.1"));
    let mut sa = manager.create_and_checkout().unwrap();
    sa.set_hosts(hosts);
    manager.checkin(sa).unwrap();

    let other = manager.create_and_checkout().unwrap();
    let other_id = other.id();
    manager.checkin(other).unwrap();

    let held = manager.checkout_by_hosts(hosts.local, hosts.remote).unwrap();
    let (tx, rx) = mpsc::channel();
    let waiter = {
        let manager = Arc::clone(&manager);
        thread::spawn(move || {
            let result = manager.checkout_by_hosts(hosts.local, hosts.remote);
            tx.send(()).unwrap();
            result
        })
    };
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

    let mut other = manager.checkout(&other_id).unwrap().into_inner();
    other.set_hosts(hosts);
    manager.checkin(other).unwrap();
    manager.checkin_and_delete(held).unwrap();

    match waiter.join().unwrap() {
        Err(e) => assert!(e.is_not_found()),
        Ok(sa) => panic!("waiter got {} instead of not-found", sa.id()),
    }
    assert_eq!(manager.list_ids(), vec![other_id]);
    let sa = manager.checkout_by_hosts(hosts.local, hosts.remote).unwrap();
    assert_eq!(sa.id(), other_id);
    manager.checkin(sa).unwrap();
}
