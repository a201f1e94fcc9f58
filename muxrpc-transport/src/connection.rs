//! Connection and observer traits.

use crate::error::TransportError;
use bytes::Bytes;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// A persistent, ordered, message-oriented connection.
///
/// `send` may be called concurrently from many tasks. Observer callbacks are
/// delivered from a single reader context, one event at a time, in arrival
/// order.
pub trait Connection: Send + Sync {
    /// Queues one complete frame for delivery to the peer.
    fn send(&self, frame: Bytes) -> Result<(), TransportError>;

    /// Returns whether the connection is established.
    fn is_connected(&self) -> bool;

    /// Returns whether the connection has been closed.
    fn is_closed(&self) -> bool;

    /// Registers an observer for connect, close and data events.
    fn subscribe(&self, observer: Arc<dyn ConnectionObserver>);
}

/// Receives lifecycle and data events from a connection.
///
/// Callbacks run on the connection's reader context and must not block.
pub trait ConnectionObserver: Send + Sync {
    fn on_connect(&self, _conn: &dyn Connection) {}

    fn on_close(&self, _conn: &dyn Connection, _reason: Option<&TransportError>) {}

    fn on_data(&self, _conn: &dyn Connection, _frame: Bytes) {}
}

/// Lifecycle state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LinkState {
    /// Created, not yet connected.
    Idle = 0,
    /// Established; frames may be sent.
    Connected = 1,
    /// Closed; no further events are delivered.
    Closed = 2,
}

impl LinkState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => LinkState::Idle,
            1 => LinkState::Connected,
            _ => LinkState::Closed,
        }
    }
}

/// Atomic holder for a `LinkState`.
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(LinkState::Idle as u8))
    }

    pub(crate) fn get(&self) -> LinkState {
        LinkState::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Moves `Idle` to `Connected`. Returns false if not idle.
    pub(crate) fn open(&self) -> bool {
        self.0
            .compare_exchange(
                LinkState::Idle as u8,
                LinkState::Connected as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// Moves to `Closed`. Returns false if already closed.
    pub(crate) fn close(&self) -> bool {
        self.0.swap(LinkState::Closed as u8, Ordering::SeqCst) != LinkState::Closed as u8
    }

    /// Maps the current state to the error `send` should report, if any.
    pub(crate) fn check_sendable(&self) -> Result<(), TransportError> {
        match self.get() {
            LinkState::Connected => Ok(()),
            LinkState::Idle => Err(TransportError::NotConnected),
            LinkState::Closed => Err(TransportError::Closed),
        }
    }
}

/// Registered observers of one connection.
#[derive(Default)]
pub(crate) struct ObserverSet {
    observers: RwLock<Vec<Arc<dyn ConnectionObserver>>>,
}

impl ObserverSet {
    pub(crate) fn add(&self, observer: Arc<dyn ConnectionObserver>) {
        self.observers.write().push(observer);
    }

    // Callbacks run on a snapshot so an observer may subscribe others.
    fn snapshot(&self) -> Vec<Arc<dyn ConnectionObserver>> {
        self.observers.read().clone()
    }

    pub(crate) fn connected(&self, conn: &dyn Connection) {
        for observer in self.snapshot() {
            observer.on_connect(conn);
        }
    }

    pub(crate) fn closed(&self, conn: &dyn Connection, reason: Option<&TransportError>) {
        for observer in self.snapshot() {
            observer.on_close(conn, reason);
        }
    }

    pub(crate) fn data(&self, conn: &dyn Connection, frame: Bytes) {
        for observer in self.snapshot() {
            observer.on_data(conn, frame.clone());
        }
    }
}
