//! In-process connection pair.
//!
//! Both ends start idle. `connect` on an end starts its reader task and fires
//! `on_connect`; frames sent to an idle peer queue until the peer connects.
//! `close` on either end closes both.

use crate::connection::{Connection, ConnectionObserver, LinkState, ObserverSet, StateCell};
use crate::error::TransportError;
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::{Arc, OnceLock, Weak};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// One end of an in-process connection.
pub struct MemoryConnection {
    state: StateCell,
    observers: ObserverSet,
    inbound_tx: mpsc::UnboundedSender<Bytes>,
    inbound_rx: Mutex<Option<mpsc::UnboundedReceiver<Bytes>>>,
    peer: OnceLock<Weak<MemoryConnection>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl MemoryConnection {
    /// Creates two connected ends.
    pub fn pair() -> (Arc<Self>, Arc<Self>) {
        let a = Arc::new(Self::new());
        let b = Arc::new(Self::new());
        let _ = a.peer.set(Arc::downgrade(&b));
        let _ = b.peer.set(Arc::downgrade(&a));
        (a, b)
    }

    fn new() -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        Self {
            state: StateCell::new(),
            observers: ObserverSet::default(),
            inbound_tx,
            inbound_rx: Mutex::new(Some(inbound_rx)),
            peer: OnceLock::new(),
            reader: Mutex::new(None),
        }
    }

    /// Marks this end connected and starts delivering inbound frames.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(self: &Arc<Self>) -> Result<(), TransportError> {
        let mut rx = self
            .inbound_rx
            .lock()
            .take()
            .ok_or(TransportError::Closed)?;
        if !self.state.open() {
            return Err(TransportError::Closed);
        }

        self.observers.connected(&**self);

        let conn = self.clone();
        let reader = tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                conn.observers.data(&*conn, frame);
            }
        });
        *self.reader.lock() = Some(reader);
        Ok(())
    }

    /// Closes both ends.
    pub fn close(&self) {
        self.shutdown();
        if let Some(peer) = self.peer() {
            peer.shutdown();
        }
    }

    fn shutdown(&self) {
        if !self.state.close() {
            return;
        }
        if let Some(reader) = self.reader.lock().take() {
            reader.abort();
        }
        self.observers.closed(self, None);
    }

    fn peer(&self) -> Option<Arc<MemoryConnection>> {
        self.peer.get().and_then(Weak::upgrade)
    }

    pub fn state(&self) -> LinkState {
        self.state.get()
    }
}

impl Connection for MemoryConnection {
    fn send(&self, frame: Bytes) -> Result<(), TransportError> {
        self.state.check_sendable()?;
        let peer = self.peer().ok_or(TransportError::Closed)?;
        if peer.is_closed() {
            return Err(TransportError::Closed);
        }
        peer.inbound_tx
            .send(frame)
            .map_err(|_| TransportError::Closed)
    }

    fn is_connected(&self) -> bool {
        self.state.get() == LinkState::Connected
    }

    fn is_closed(&self) -> bool {
        self.state.get() == LinkState::Closed
    }

    fn subscribe(&self, observer: Arc<dyn ConnectionObserver>) {
        self.observers.add(observer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Forward(mpsc::UnboundedSender<Bytes>);

    impl ConnectionObserver for Forward {
        fn on_data(&self, _conn: &dyn Connection, frame: Bytes) {
            let _ = self.0.send(frame);
        }
    }

    struct Echo;

    impl ConnectionObserver for Echo {
        fn on_data(&self, conn: &dyn Connection, frame: Bytes) {
            conn.send(frame).unwrap();
        }
    }

    #[tokio::test]
    async fn test_pair_delivers_in_order() {
        let (a, b) = MemoryConnection::pair();
        let (tx, mut rx) = mpsc::unbounded_channel();
        b.subscribe(Arc::new(Forward(tx)));

        a.connect().unwrap();
        // Queued until b connects
        a.send(Bytes::from_static(b"1")).unwrap();
        b.connect().unwrap();
        a.send(Bytes::from_static(b"2")).unwrap();

        assert_eq!(&rx.recv().await.unwrap()[..], b"1");
        assert_eq!(&rx.recv().await.unwrap()[..], b"2");
    }

    #[tokio::test]
    async fn test_reply_on_delivering_connection() {
        let (a, b) = MemoryConnection::pair();
        let (tx, mut rx) = mpsc::unbounded_channel();
        a.subscribe(Arc::new(Forward(tx)));
        b.subscribe(Arc::new(Echo));
        a.connect().unwrap();
        b.connect().unwrap();

        a.send(Bytes::from_static(b"ping")).unwrap();
        assert_eq!(&rx.recv().await.unwrap()[..], b"ping");
    }

    #[tokio::test]
    async fn test_close_closes_both_ends() {
        let (a, b) = MemoryConnection::pair();
        a.connect().unwrap();
        b.connect().unwrap();
        assert!(a.is_connected());

        b.close();
        assert!(a.is_closed());
        assert!(b.is_closed());
        assert!(matches!(
            a.send(Bytes::from_static(b"x")),
            Err(TransportError::Closed)
        ));
        assert!(matches!(a.connect(), Err(TransportError::Closed)));
    }

    #[test]
    fn test_send_while_idle() {
        let (a, _b) = MemoryConnection::pair();
        assert!(matches!(
            a.send(Bytes::from_static(b"x")),
            Err(TransportError::NotConnected)
        ));
    }
}
