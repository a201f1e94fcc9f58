//! Connection readiness signal.

use crate::error::ClientError;
use muxrpc_transport::LinkState;
use tokio::sync::watch;

/// Tracks connect/close transitions for callers waiting on them.
///
/// Backed by a `watch` cell, so every waiter observes a transition, and a
/// waiter that subscribes after the transition sees it immediately.
pub struct Readiness {
    tx: watch::Sender<LinkState>,
}

impl Readiness {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(LinkState::Idle);
        Self { tx }
    }

    pub fn mark_connected(&self) {
        self.tx.send_replace(LinkState::Connected);
    }

    pub fn mark_closed(&self) {
        self.tx.send_replace(LinkState::Closed);
    }

    pub fn state(&self) -> LinkState {
        *self.tx.borrow()
    }

    /// Waits until the connection is connected.
    ///
    /// Fails with `ConnectionClosed` if it closes first.
    pub async fn wait_connected(&self) -> Result<(), ClientError> {
        let mut rx = self.tx.subscribe();
        let state = *rx
            .wait_for(|state| *state != LinkState::Idle)
            .await
            .map_err(|_| ClientError::ConnectionClosed)?;

        match state {
            LinkState::Connected => Ok(()),
            _ => Err(ClientError::ConnectionClosed),
        }
    }

    /// Waits until the connection is closed.
    pub async fn wait_closed(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|state| *state == LinkState::Closed).await;
    }
}

impl Default for Readiness {
    fn default() -> Self {
        Self::new()
    }
}
