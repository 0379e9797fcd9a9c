//! Per-receiver locks.
//!
//! Confirmations of a receiver's operations and reads of its statement take
//! the same lock, so a statement is always a single point in that receiver's
//! history. Since an operation's receiver never changes, locking the
//! receiver also serializes every confirmation of a given operation id.
//!
//! Receivers are never deleted, so the table only grows with the number of
//! receivers that have had an operation confirmed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use advance_types::ReceiverId;

/// Table of one mutex per receiver.
pub struct ReceiverLocks {
    slots: Mutex<HashMap<ReceiverId, Arc<Mutex<()>>>>,
}

impl ReceiverLocks {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Run `f` while holding the lock for `receiver_id`.
    ///
    /// The guarded data is `()`, so a poisoned lock carries no broken state
    /// and is simply taken over.
    pub fn with_lock<T>(&self, receiver_id: ReceiverId, f: impl FnOnce() -> T) -> T {
        let slot = self.slot(receiver_id);
        let _guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    /// Number of receivers with a lock slot.
    pub fn tracked(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn slot(&self, receiver_id: ReceiverId) -> Arc<Mutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(receiver_id).or_default())
    }
}

impl Default for ReceiverLocks {
    fn default() -> Self {
        Self::new()
    }
}
