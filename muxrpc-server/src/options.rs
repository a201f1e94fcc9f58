//! Service hooks.

use crate::error::ServerError;
use muxrpc_protocol::CallContext;
use std::sync::Arc;

/// Runs on the raw request body before it is decoded.
pub type BeforeHook = Arc<dyn Fn(&mut CallContext, &[u8]) + Send + Sync>;

/// Runs on the handler's response before it is encoded.
pub type AfterHook<Resp> = Arc<dyn Fn(&mut CallContext, &Resp) + Send + Sync>;

/// Runs once for every inbound frame, after the reply is built.
pub type FinalizerHook = Arc<dyn Fn(&CallContext, Option<&ServerError>) + Send + Sync>;

/// Observes every dispatch error before it is turned into an error reply.
pub type ErrorHandler = Arc<dyn Fn(&CallContext, &ServerError) + Send + Sync>;

/// Hooks for a `Service`.
pub struct ServiceOptions<Resp> {
    pub(crate) before: Vec<BeforeHook>,
    pub(crate) after: Vec<AfterHook<Resp>>,
    pub(crate) finalizer: Vec<FinalizerHook>,
    pub(crate) error_handler: ErrorHandler,
}

impl<Resp> ServiceOptions<Resp> {
    pub fn new() -> Self {
        Self {
            before: Vec::new(),
            after: Vec::new(),
            finalizer: Vec::new(),
            error_handler: Arc::new(log_error),
        }
    }

    pub fn before(mut self, hook: impl Fn(&mut CallContext, &[u8]) + Send + Sync + 'static) -> Self {
        self.before.push(Arc::new(hook));
        self
    }

    pub fn after(mut self, hook: impl Fn(&mut CallContext, &Resp) + Send + Sync + 'static) -> Self {
        self.after.push(Arc::new(hook));
        self
    }

    pub fn finalizer(
        mut self,
        hook: impl Fn(&CallContext, Option<&ServerError>) + Send + Sync + 'static,
    ) -> Self {
        self.finalizer.push(Arc::new(hook));
        self
    }

    /// Replaces the error observer. The default logs at debug level.
    pub fn error_handler(
        mut self,
        handler: impl Fn(&CallContext, &ServerError) + Send + Sync + 'static,
    ) -> Self {
        self.error_handler = Arc::new(handler);
        self
    }
}

impl<Resp> Default for ServiceOptions<Resp> {
    fn default() -> Self {
        Self::new()
    }
}

fn log_error(ctx: &CallContext, err: &ServerError) {
    tracing::debug!(
        "Dispatch of {} id={} failed: {}",
        ctx.operation(),
        ctx.call_id(),
        err
    );
}
