//! Call dispatch.

use crate::error::ClientError;
use crate::lifecycle::ClientBridge;
use crate::options::ClientOptions;
use crate::pending::{Delivery, PendingCallTable, PendingGuard};
use crate::readiness::Readiness;
use bytes::Bytes;
use muxrpc_protocol::{BoxError, CallContext, CallFrame, ResultFrame};
use muxrpc_transport::Connection;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// Encodes an application request into call-frame body bytes.
pub type EncodeFn<Req> = Arc<dyn Fn(&CallContext, &Req) -> Result<Bytes, BoxError> + Send + Sync>;

/// Decodes result-frame body bytes into an application response.
pub type DecodeFn<Resp> = Arc<dyn Fn(&CallContext, &[u8]) -> Result<Resp, BoxError> + Send + Sync>;

/// Calling side of a muxrpc connection.
///
/// Cheap to clone; clones share the connection and the pending table.
pub struct Client<Req, Resp> {
    inner: Arc<ClientInner<Req, Resp>>,
}

struct ClientInner<Req, Resp> {
    conn: Arc<dyn Connection>,
    pending: Arc<PendingCallTable>,
    readiness: Arc<Readiness>,
    encode: EncodeFn<Req>,
    decode: DecodeFn<Resp>,
    options: ClientOptions<Req>,
}

impl<Req, Resp> Clone for Client<Req, Resp> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<Req, Resp> Client<Req, Resp> {
    /// Creates a client and subscribes it to `conn`'s events.
    pub fn new<E, D>(
        conn: Arc<dyn Connection>,
        encode: E,
        decode: D,
        options: ClientOptions<Req>,
    ) -> Self
    where
        E: Fn(&CallContext, &Req) -> Result<Bytes, BoxError> + Send + Sync + 'static,
        D: Fn(&CallContext, &[u8]) -> Result<Resp, BoxError> + Send + Sync + 'static,
    {
        let pending = Arc::new(PendingCallTable::new());
        let readiness = Arc::new(Readiness::new());

        // Subscribing late must not lose a transition that already happened
        if conn.is_closed() {
            pending.drain_all();
            readiness.mark_closed();
        } else if conn.is_connected() {
            readiness.mark_connected();
        }
        conn.subscribe(Arc::new(ClientBridge::new(
            pending.clone(),
            readiness.clone(),
        )));

        Self {
            inner: Arc::new(ClientInner {
                conn,
                pending,
                readiness,
                encode: Arc::new(encode),
                decode: Arc::new(decode),
                options,
            }),
        }
    }

    /// Calls `operation` with `request`, using the configured request timeout.
    pub async fn invoke(&self, operation: &str, request: &Req) -> Result<Resp, ClientError> {
        self.call(
            operation,
            request,
            self.inner.options.request_timeout,
            std::future::pending(),
        )
        .await
    }

    /// Calls `operation`, failing with `Timeout` after `timeout`.
    pub async fn invoke_with_timeout(
        &self,
        operation: &str,
        request: &Req,
        timeout: Duration,
    ) -> Result<Resp, ClientError> {
        self.call(operation, request, Some(timeout), std::future::pending())
            .await
    }

    /// Calls `operation`, failing with `Cancelled` if `cancel` completes first.
    pub async fn invoke_until<F>(
        &self,
        operation: &str,
        request: &Req,
        cancel: F,
    ) -> Result<Resp, ClientError>
    where
        F: Future<Output = ()>,
    {
        self.call(
            operation,
            request,
            self.inner.options.request_timeout,
            cancel,
        )
        .await
    }

    /// Returns a handle bound to one operation.
    pub fn endpoint(&self, operation: impl Into<String>) -> Endpoint<Req, Resp> {
        Endpoint {
            client: self.clone(),
            operation: operation.into(),
        }
    }

    /// Waits until the connection is established.
    pub async fn wait_connected(&self) -> Result<(), ClientError> {
        if self.inner.conn.is_connected() {
            return Ok(());
        }
        self.inner.readiness.wait_connected().await
    }

    /// Waits until the connection is closed.
    pub async fn wait_closed(&self) {
        if self.inner.conn.is_closed() {
            return;
        }
        self.inner.readiness.wait_closed().await
    }

    /// Returns the number of calls awaiting a result.
    pub fn pending_count(&self) -> usize {
        self.inner.pending.len()
    }

    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.inner.conn
    }

    async fn call<F>(
        &self,
        operation: &str,
        request: &Req,
        timeout: Option<Duration>,
        cancel: F,
    ) -> Result<Resp, ClientError>
    where
        F: Future<Output = ()>,
    {
        let mut ctx = CallContext::new(operation);
        let result = self.run_call(&mut ctx, request, timeout, cancel).await;

        let err = result.as_ref().err();
        for finalizer in &self.inner.options.finalizer {
            finalizer(&ctx, err);
        }
        result
    }

    async fn run_call<F>(
        &self,
        ctx: &mut CallContext,
        request: &Req,
        timeout: Option<Duration>,
        cancel: F,
    ) -> Result<Resp, ClientError>
    where
        F: Future<Output = ()>,
    {
        let options = &self.inner.options;
        for before in &options.before {
            before(&mut *ctx, request);
        }

        let body = (self.inner.encode)(&*ctx, request)
            .map_err(|e| self.observe(&*ctx, ClientError::Encode(e)))?;

        let response = self
            .round_trip(ctx, body, timeout, cancel)
            .await
            .map_err(|e| self.observe(&*ctx, e))?;

        for after in &options.after {
            after(&mut *ctx, &response);
        }

        (self.inner.decode)(&*ctx, &response)
            .map_err(|e| self.observe(&*ctx, ClientError::Decode(e)))
    }

    /// Sends one call frame and waits for its result body.
    async fn round_trip<F>(
        &self,
        ctx: &mut CallContext,
        body: Bytes,
        timeout: Option<Duration>,
        cancel: F,
    ) -> Result<Bytes, ClientError>
    where
        F: Future<Output = ()>,
    {
        let id = self.inner.options.ids.next_id();
        ctx.set_call_id(id);

        let frame = CallFrame::new(id, ctx.operation(), body).encode()?;

        let rx = self.inner.pending.register(id)?;
        let _guard = PendingGuard::new(&self.inner.pending, id);

        tracing::debug!("Sending call id={} op={} ({} bytes)", id, ctx.operation(), frame.len());
        self.inner.conn.send(frame.freeze())?;

        let result = Self::await_result(rx, timeout, cancel).await?;
        tracing::debug!("Call id={} got result", id);

        match result.error_message() {
            Some(message) => Err(ClientError::Remote(message)),
            None => Ok(result.body),
        }
    }

    async fn await_result<F>(
        rx: oneshot::Receiver<Delivery>,
        timeout: Option<Duration>,
        cancel: F,
    ) -> Result<ResultFrame, ClientError>
    where
        F: Future<Output = ()>,
    {
        let deadline = async {
            match timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            delivery = rx => delivery.unwrap_or(Err(ClientError::ConnectionClosed)),
            _ = deadline => Err(ClientError::Timeout),
            _ = cancel => Err(ClientError::Cancelled),
        }
    }

    fn observe(&self, ctx: &CallContext, err: ClientError) -> ClientError {
        (self.inner.options.error_handler)(ctx, &err);
        err
    }
}

/// A client handle bound to one operation name.
pub struct Endpoint<Req, Resp> {
    client: Client<Req, Resp>,
    operation: String,
}

impl<Req, Resp> Endpoint<Req, Resp> {
    pub async fn call(&self, request: &Req) -> Result<Resp, ClientError> {
        self.client.invoke(&self.operation, request).await
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl<Req, Resp> Clone for Endpoint<Req, Resp> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            operation: self.operation.clone(),
        }
    }
}
