//! Per-SA exclusivity
//!
//! An [`Entry`] is the rendezvous point for threads that want the same SA.
//! The SA lives inside the entry while checked in and is moved out to the
//! holder on checkout.

use super::IkeSa;
use parking_lot::{Condvar, Mutex};
use std::thread::{self, ThreadId};

/// Stable handle from an SA back to its table slot
///
/// `serial` tells a reused slab slot apart from the one the SA came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ticket {
    pub(crate) manager_id: u64,
    pub(crate) slot: usize,
    pub(crate) serial: u64,
}

#[derive(Debug)]
struct EntryState {
    sa: Option<IkeSa>,
    checked_out: bool,
    owner: Option<ThreadId>,
    /// Threads blocked in `acquire`
    waiting: u32,
    /// Set by a checkin that woke a waiter, cleared by that waiter
    handoff: bool,
    /// Shutdown: waiters leave empty-handed
    driveout: bool,
    deleted: bool,
}

/// Outcome of [`Entry::acquire`]
#[derive(Debug)]
pub(super) enum Acquire {
    Acquired { sa: IkeSa, waited: bool },
    /// Deleted or driven out
    Gone,
    /// The calling thread already holds it
    Reentrant,
}

#[derive(Debug)]
pub(super) struct Entry {
    state: Mutex<EntryState>,
    cond: Condvar,
}

impl Entry {
    /// New entry whose SA is held by the calling thread
    pub(super) fn checked_out() -> Self {
        Self {
            state: Mutex::new(EntryState {
                sa: None,
                checked_out: true,
                owner: Some(thread::current().id()),
                waiting: 0,
                handoff: false,
                driveout: false,
                deleted: false,
            }),
            cond: Condvar::new(),
        }
    }

    /// Take the SA, blocking while another thread holds it
    ///
    /// Waiters are served one per checkin; a newcomer never takes an SA
    /// that was just handed to a woken waiter.
    pub(super) fn acquire(&self, detect_reentrant: bool) -> Acquire {
        let mut st = self.state.lock();
        if st.deleted || st.driveout {
            return Acquire::Gone;
        }

        let mut waited = false;
        if st.checked_out || st.handoff {
            if detect_reentrant && st.checked_out && st.owner == Some(thread::current().id()) {
                return Acquire::Reentrant;
            }

            st.waiting += 1;
            waited = true;
            loop {
                self.cond.wait(&mut st);
                if st.deleted || st.driveout {
                    st.waiting -= 1;
                    // the drainer waits for `waiting` to reach zero
                    self.cond.notify_all();
                    return Acquire::Gone;
                }
                if st.handoff && !st.checked_out {
                    st.handoff = false;
                    break;
                }
            }
            st.waiting -= 1;
        }

        match st.sa.take() {
            Some(sa) => {
                st.checked_out = true;
                st.owner = Some(thread::current().id());
                Acquire::Acquired { sa, waited }
            }
            None => Acquire::Gone,
        }
    }

    /// Put the SA back and wake the next waiter
    pub(super) fn release(&self, sa: IkeSa) {
        let mut st = self.state.lock();
        st.sa = Some(sa);
        st.checked_out = false;
        st.owner = None;

        if st.driveout {
            self.cond.notify_all();
        } else if st.waiting > 0 {
            st.handoff = true;
            self.cond.notify_one();
        }
    }

    /// Mark deleted; every waiter leaves with nothing
    pub(super) fn mark_deleted(&self) -> Option<IkeSa> {
        let mut st = self.state.lock();
        st.deleted = true;
        st.checked_out = false;
        st.owner = None;
        st.handoff = false;
        self.cond.notify_all();
        st.sa.take()
    }

    /// Turn current and future waiters away
    pub(super) fn drive_out(&self) {
        let mut st = self.state.lock();
        st.driveout = true;
        self.cond.notify_all();
    }

    /// Block until nobody holds or waits for the SA, then take it for good
    ///
    /// Returns `None` if the holder deleted it meanwhile.
    pub(super) fn wait_drained(&self) -> Option<IkeSa> {
        let mut st = self.state.lock();
        while !st.deleted && (st.checked_out || st.waiting > 0) {
            self.cond.wait(&mut st);
        }
        st.deleted = true;
        st.sa.take()
    }

    /// Take whatever is stored without waiting (manager drop)
    pub(super) fn take_now(&self) -> Option<IkeSa> {
        let mut st = self.state.lock();
        st.deleted = true;
        self.cond.notify_all();
        st.sa.take()
    }
}
