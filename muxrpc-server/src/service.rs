//! Call dispatch for the serving side.
//!
//! A `Service` owns the handler registry and the request/response codecs.
//! `serve` attaches it to a connection; every inbound call frame is then
//! dispatched on the connection's reader task and answered on the same
//! connection with exactly one result frame.

use crate::error::ServerError;
use crate::options::ServiceOptions;
use crate::registry::{Handler, HandlerRegistry};
use bytes::Bytes;
use muxrpc_protocol::{peek_id, BoxError, CallContext, CallFrame, ResultFrame, MAX_ERROR_LEN};
use muxrpc_transport::{Connection, ConnectionObserver, TransportError};
use std::sync::Arc;
use tokio::sync::watch;

/// Decodes call-frame body bytes into an application request.
pub type DecodeFn<Req> = Arc<dyn Fn(&CallContext, &[u8]) -> Result<Req, BoxError> + Send + Sync>;

/// Encodes an application response into result-frame body bytes.
pub type EncodeFn<Resp> = Arc<dyn Fn(&CallContext, &Resp) -> Result<Bytes, BoxError> + Send + Sync>;

/// Serving side of muxrpc.
///
/// Cheap to clone; clones share the registry and the stop signal.
pub struct Service<Req, Resp> {
    inner: Arc<ServiceInner<Req, Resp>>,
}

struct ServiceInner<Req, Resp> {
    registry: HandlerRegistry<Req, Resp>,
    decode: DecodeFn<Req>,
    encode: EncodeFn<Resp>,
    options: ServiceOptions<Resp>,
    stopped: watch::Sender<bool>,
}

impl<Req, Resp> Clone for Service<Req, Resp> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<Req: 'static, Resp: 'static> Service<Req, Resp> {
    pub fn new<D, E>(decode: D, encode: E, options: ServiceOptions<Resp>) -> Self
    where
        D: Fn(&CallContext, &[u8]) -> Result<Req, BoxError> + Send + Sync + 'static,
        E: Fn(&CallContext, &Resp) -> Result<Bytes, BoxError> + Send + Sync + 'static,
    {
        let (stopped, _) = watch::channel(false);
        Self {
            inner: Arc::new(ServiceInner {
                registry: HandlerRegistry::new(),
                decode: Arc::new(decode),
                encode: Arc::new(encode),
                options,
                stopped,
            }),
        }
    }

    /// Registers `handler` for `operation`, replacing any previous one.
    pub fn register<H>(&self, operation: impl Into<String>, handler: H) -> Result<(), ServerError>
    where
        H: Handler<Req, Resp> + 'static,
    {
        self.inner.registry.register(operation, handler)
    }

    /// Removes the handler for `operation`. Returns whether one existed.
    pub fn unregister(&self, operation: &str) -> bool {
        self.inner.registry.unregister(operation)
    }

    pub fn registry(&self) -> &HandlerRegistry<Req, Resp> {
        &self.inner.registry
    }

    /// Answers calls arriving on `conn`.
    pub fn serve(&self, conn: &dyn Connection) {
        conn.subscribe(Arc::new(ServiceBridge::new(self.clone())));
    }

    /// Dispatches one inbound frame and returns the encoded reply.
    ///
    /// Malformed frames are answered too, keyed by the id salvaged from the
    /// first 8 bytes (0 when fewer are present).
    pub fn handle(&self, frame: &Bytes) -> Result<Bytes, ServerError> {
        let (_ctx, reply) = self.respond(frame);
        Ok(reply.encode()?.freeze())
    }

    fn respond(&self, frame: &Bytes) -> (CallContext, ResultFrame) {
        let (ctx, outcome) = match CallFrame::decode(frame) {
            Ok(call) => {
                let mut ctx = CallContext::new(call.operation.clone()).with_call_id(call.id);
                let outcome = self.dispatch(&mut ctx, call);
                (ctx, outcome)
            }
            Err(e) => {
                let id = peek_id(frame).unwrap_or(0);
                tracing::warn!("Malformed call frame (id={}): {}", id, e);
                (CallContext::new("").with_call_id(id), Err(ServerError::Protocol(e)))
            }
        };

        let reply = match &outcome {
            Ok(body) => ResultFrame::ok(ctx.call_id(), body.clone()),
            Err(e) => {
                (self.inner.options.error_handler)(&ctx, e);
                ResultFrame::err(ctx.call_id(), clip_error(e.to_string()))
            }
        };

        for finalizer in &self.inner.options.finalizer {
            finalizer(&ctx, outcome.as_ref().err());
        }

        (ctx, reply)
    }

    /// Sends `reply` on `conn`.
    ///
    /// A reply the connection refuses while still open (too large for the
    /// frame limit, say) is replaced by an error result for the same call.
    fn send_reply(&self, conn: &dyn Connection, ctx: &CallContext, reply: ResultFrame) {
        let err = match reply.encode() {
            Ok(bytes) => match conn.send(bytes.freeze()) {
                Ok(()) => return,
                Err(TransportError::Closed) | Err(TransportError::NotConnected) => {
                    tracing::debug!("Dropping reply id={}: connection closed", ctx.call_id());
                    return;
                }
                Err(e) => ServerError::Transport(e),
            },
            Err(e) => ServerError::Protocol(e),
        };

        tracing::warn!("Failed to send reply id={}: {}", ctx.call_id(), err);
        (self.inner.options.error_handler)(ctx, &err);

        let sent = ResultFrame::err(ctx.call_id(), clip_error(err.to_string()))
            .encode()
            .map_err(ServerError::from)
            .and_then(|bytes| Ok(conn.send(bytes.freeze())?));
        if let Err(e) = sent {
            tracing::warn!("Failed to send error reply id={}: {}", ctx.call_id(), e);
        }
    }

    fn dispatch(&self, ctx: &mut CallContext, call: CallFrame) -> Result<Bytes, ServerError> {
        let options = &self.inner.options;
        for before in &options.before {
            before(&mut *ctx, &call.body);
        }

        let request = (self.inner.decode)(&*ctx, &call.body).map_err(ServerError::Decode)?;

        let handler = self
            .inner
            .registry
            .get(&call.operation)
            .ok_or_else(|| ServerError::HandlerNotFound(call.operation.clone()))?;

        tracing::debug!("Dispatching {} id={}", call.operation, call.id);
        let response = handler.call(ctx, request).map_err(ServerError::Handler)?;

        for after in &options.after {
            after(&mut *ctx, &response);
        }

        (self.inner.encode)(&*ctx, &response).map_err(ServerError::Encode)
    }

    /// Waits until `stop` is called.
    pub async fn run(&self) {
        let mut rx = self.inner.stopped.subscribe();
        let _ = rx.wait_for(|stopped| *stopped).await;
    }

    /// Wakes every `run` waiter. Idempotent.
    pub fn stop(&self) {
        if !self.inner.stopped.send_replace(true) {
            tracing::info!("Service stopping");
        }
    }

    pub fn is_stopped(&self) -> bool {
        *self.inner.stopped.borrow()
    }
}

/// Shortens an error message to fit the result frame's 16-bit length.
fn clip_error(message: String) -> String {
    if message.len() <= MAX_ERROR_LEN {
        return message;
    }
    let mut end = MAX_ERROR_LEN - 3;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &message[..end])
}

/// Connection observer for the serving side.
pub struct ServiceBridge<Req, Resp> {
    service: Service<Req, Resp>,
}

impl<Req, Resp> ServiceBridge<Req, Resp> {
    pub fn new(service: Service<Req, Resp>) -> Self {
        Self { service }
    }
}

impl<Req: 'static, Resp: 'static> ConnectionObserver for ServiceBridge<Req, Resp> {
    fn on_connect(&self, _conn: &dyn Connection) {
        tracing::debug!("Serving new connection");
    }

    fn on_close(&self, _conn: &dyn Connection, reason: Option<&TransportError>) {
        if let Some(e) = reason {
            tracing::debug!("Served connection closed: {}", e);
        }
    }

    fn on_data(&self, conn: &dyn Connection, frame: Bytes) {
        let (ctx, reply) = self.service.respond(&frame);
        self.service.send_reply(conn, &ctx, reply);
    }
}
