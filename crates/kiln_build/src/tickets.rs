//! Per-directory compilation tickets.
//!
//! A build for any identifier serializes against all other builds targeting
//! the same directory, so that concurrent requests for sibling files merge
//! into one compiled unit instead of racing into separate compiles. Unrelated
//! directories hold distinct tickets and build fully in parallel.
//!
//! Table mutation (lookup-or-create) happens under a short table-wide mutex;
//! the per-scope ticket itself is acquired outside that mutex and is held for
//! the whole expensive build pass.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};

/// The long-held exclusive lock for one directory scope.
///
/// Implemented as a manually released flag rather than a `MutexGuard` so the
/// handle can be held across ownership boundaries and released from a drop
/// guard.
pub struct Ticket {
    busy: Mutex<bool>,
    cond: Condvar,
}

impl Ticket {
    fn new() -> Self {
        Self {
            busy: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    /// Blocks until the ticket is free, then takes it.
    pub fn lock(&self) {
        let mut busy = self.busy.lock().unwrap();
        while *busy {
            busy = self.cond.wait(busy).unwrap();
        }
        *busy = true;
    }

    /// Releases the ticket and wakes one waiter.
    pub fn unlock(&self) {
        let mut busy = self.busy.lock().unwrap();
        *busy = false;
        drop(busy);
        self.cond.notify_one();
    }
}

struct TicketSlot {
    ticket: Arc<Ticket>,
    claims: usize,
}

/// Lazily populated table of per-directory tickets.
///
/// Entries are claim-counted: at most one ticket exists per scope key at any
/// instant, and the entry is removed when the last claimant releases it.
#[derive(Default)]
pub struct TicketTable {
    entries: Mutex<HashMap<String, TicketSlot>>,
}

impl TicketTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the ticket for `key`, creating it on first contention.
    ///
    /// The second component is `true` when this call created the entry.
    /// Every successful `acquire` must be paired with one [`release`](Self::release).
    pub fn acquire(&self, key: &str) -> (Arc<Ticket>, bool) {
        let mut entries = self.entries.lock().unwrap();
        if let Some(slot) = entries.get_mut(key) {
            slot.claims += 1;
            return (slot.ticket.clone(), false);
        }
        let ticket = Arc::new(Ticket::new());
        entries.insert(
            key.to_string(),
            TicketSlot {
                ticket: ticket.clone(),
                claims: 1,
            },
        );
        (ticket, true)
    }

    /// Drops one claim on `key`, removing the entry when none remain.
    pub fn release(&self, key: &str) {
        let mut entries = self.entries.lock().unwrap();
        if let Some(slot) = entries.get_mut(key) {
            slot.claims -= 1;
            if slot.claims == 0 {
                entries.remove(key);
            }
        }
    }

    /// Number of live scope entries.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Returns `true` when no scope is being built.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn acquire_creates_then_reuses() {
        let table = TicketTable::new();
        let (a, created_a) = table.acquire("/site");
        let (b, created_b) = table.acquire("/site");
        assert!(created_a);
        assert!(!created_b);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn entry_removed_after_last_release() {
        let table = TicketTable::new();
        table.acquire("/site");
        table.acquire("/site");
        table.release("/site");
        assert_eq!(table.len(), 1);
        table.release("/site");
        assert!(table.is_empty());
    }

    #[test]
    fn distinct_scopes_get_distinct_tickets() {
        let table = TicketTable::new();
        let (a, _) = table.acquire("/site");
        let (b, _) = table.acquire("/admin");
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn ticket_serializes_holders() {
        let ticket = Arc::new(Ticket::new());
        let counter = Arc::new(Mutex::new(0u32));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let ticket = ticket.clone();
            let counter = counter.clone();
            handles.push(thread::spawn(move || {
                ticket.lock();
                {
                    let mut guard = counter.lock().unwrap();
                    *guard += 1;
                }
                ticket.unlock();
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(*counter.lock().unwrap(), 8);
    }
}
