//! Translates connection events into pending-table operations.

use crate::error::ClientError;
use crate::pending::PendingCallTable;
use crate::readiness::Readiness;
use bytes::Bytes;
use muxrpc_protocol::{peek_id, ResultFrame};
use muxrpc_transport::{Connection, ConnectionObserver, TransportError};
use std::sync::Arc;

/// Connection observer for the calling side.
///
/// - connect: reopens the pending table and fires the connected signal
/// - close: fails every pending call, then fires the closed signal
/// - data: decodes a result frame and delivers it to its call
pub struct ClientBridge {
    pending: Arc<PendingCallTable>,
    readiness: Arc<Readiness>,
}

impl ClientBridge {
    pub fn new(pending: Arc<PendingCallTable>, readiness: Arc<Readiness>) -> Self {
        Self { pending, readiness }
    }
}

impl ConnectionObserver for ClientBridge {
    fn on_connect(&self, _conn: &dyn Connection) {
        self.pending.reopen();
        self.readiness.mark_connected();
    }

    fn on_close(&self, _conn: &dyn Connection, reason: Option<&TransportError>) {
        let drained = self.pending.drain_all();
        match reason {
            Some(e) => tracing::debug!("Connection closed ({}), failed {} pending calls", e, drained),
            None => tracing::debug!("Connection closed, failed {} pending calls", drained),
        }
        self.readiness.mark_closed();
    }

    fn on_data(&self, _conn: &dyn Connection, frame: Bytes) {
        match ResultFrame::decode(&frame) {
            Ok(result) => {
                let id = result.id;
                if !self.pending.deliver(id, Ok(result)) {
                    tracing::debug!("No pending call for id={}, dropping result", id);
                }
            }
            Err(e) => match peek_id(&frame) {
                Some(id) if id != 0 => {
                    tracing::warn!("Malformed result frame for id={}: {}", id, e);
                    self.pending.deliver(id, Err(ClientError::Protocol(e)));
                }
                _ => tracing::warn!("Dropping malformed result frame: {}", e),
            },
        }
    }
}
