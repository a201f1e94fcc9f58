//! Correlation table for in-flight calls.
//!
//! Every outstanding call owns one entry: a one-shot sender keyed by its
//! correlation id. All operations take the same lock, so an id maps to at
//! most one entry and a drain is atomic with respect to registration.
//!
//! A drain leaves the table closed until `reopen` is called. Registrations
//! that arrive while it is closed are rejected with `ConnectionClosed`
//! rather than parked on a connection that will never answer.

use crate::error::ClientError;
use muxrpc_protocol::ResultFrame;
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::oneshot;

/// Outcome handed to a waiting call.
pub type Delivery = Result<ResultFrame, ClientError>;

struct TableState {
    entries: HashMap<u64, oneshot::Sender<Delivery>>,
    open: bool,
}

/// Maps correlation ids to waiting calls.
pub struct PendingCallTable {
    state: Mutex<TableState>,
}

impl PendingCallTable {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TableState {
                entries: HashMap::new(),
                open: true,
            }),
        }
    }

    /// Registers a call and returns the receiving half of its slot.
    pub fn register(&self, id: u64) -> Result<oneshot::Receiver<Delivery>, ClientError> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(ClientError::ConnectionClosed);
        }
        if state.entries.contains_key(&id) {
            return Err(ClientError::DuplicateCallId(id));
        }

        let (tx, rx) = oneshot::channel();
        state.entries.insert(id, tx);
        Ok(rx)
    }

    /// Removes the entry for `id` and hands it `result`.
    ///
    /// Returns whether an entry existed. Results for unknown ids are dropped.
    pub fn deliver(&self, id: u64, result: Delivery) -> bool {
        let slot = self.state.lock().entries.remove(&id);
        match slot {
            Some(tx) => {
                // The caller may have given up already
                let _ = tx.send(result);
                true
            }
            None => false,
        }
    }

    /// Removes the entry for `id` without delivering anything.
    pub fn remove(&self, id: u64) -> bool {
        self.state.lock().entries.remove(&id).is_some()
    }

    /// Fails every pending call with `ConnectionClosed` and closes the table.
    ///
    /// Returns the number of calls failed.
    pub fn drain_all(&self) -> usize {
        let mut state = self.state.lock();
        state.open = false;

        let drained = std::mem::take(&mut state.entries);
        let count = drained.len();
        for (_, tx) in drained {
            let _ = tx.send(Err(ClientError::ConnectionClosed));
        }
        count
    }

    /// Accepts registrations again after a drain.
    pub fn reopen(&self) {
        self.state.lock().open = true;
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }

    /// Returns the number of pending calls.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PendingCallTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Removes an entry when the call owning it stops waiting.
///
/// Covers send failure, timeout, cancellation and a dropped call future.
/// After a delivery the entry is already gone and the removal is a no-op.
pub(crate) struct PendingGuard<'a> {
    table: &'a PendingCallTable,
    id: u64,
}

impl<'a> PendingGuard<'a> {
    pub(crate) fn new(table: &'a PendingCallTable, id: u64) -> Self {
        Self { table, id }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.table.remove(self.id) {
            tracing::debug!("Abandoned call id={} removed from pending table", self.id);
        }
    }
}
