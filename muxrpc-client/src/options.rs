//! Client hooks and settings.

use crate::error::ClientError;
use muxrpc_protocol::{CallContext, IdGenerator};
use std::sync::Arc;
use std::time::Duration;

/// Runs before the request is encoded.
pub type BeforeHook<Req> = Arc<dyn Fn(&mut CallContext, &Req) + Send + Sync>;

/// Runs on the raw response bytes before they are decoded.
pub type AfterHook = Arc<dyn Fn(&mut CallContext, &[u8]) + Send + Sync>;

/// Runs once at the end of every call, successful or not.
pub type FinalizerHook = Arc<dyn Fn(&CallContext, Option<&ClientError>) + Send + Sync>;

/// Observes every error before it is returned to the caller.
pub type ErrorHandler = Arc<dyn Fn(&CallContext, &ClientError) + Send + Sync>;

/// Hooks and settings for a `Client`.
pub struct ClientOptions<Req> {
    pub(crate) before: Vec<BeforeHook<Req>>,
    pub(crate) after: Vec<AfterHook>,
    pub(crate) finalizer: Vec<FinalizerHook>,
    pub(crate) error_handler: ErrorHandler,
    pub(crate) request_timeout: Option<Duration>,
    pub(crate) ids: IdGenerator,
}

impl<Req> ClientOptions<Req> {
    pub fn new() -> Self {
        Self {
            before: Vec::new(),
            after: Vec::new(),
            finalizer: Vec::new(),
            error_handler: Arc::new(log_error),
            request_timeout: None,
            ids: IdGenerator::new(),
        }
    }

    /// Adds a hook run on the context and request before encoding.
    pub fn before(mut self, hook: impl Fn(&mut CallContext, &Req) + Send + Sync + 'static) -> Self {
        self.before.push(Arc::new(hook));
        self
    }

    /// Adds a hook run on the context and raw response before decoding.
    pub fn after(mut self, hook: impl Fn(&mut CallContext, &[u8]) + Send + Sync + 'static) -> Self {
        self.after.push(Arc::new(hook));
        self
    }

    /// Adds a hook run at the end of every call.
    pub fn finalizer(
        mut self,
        hook: impl Fn(&CallContext, Option<&ClientError>) + Send + Sync + 'static,
    ) -> Self {
        self.finalizer.push(Arc::new(hook));
        self
    }

    /// Replaces the error observer. The default logs at debug level.
    pub fn error_handler(
        mut self,
        handler: impl Fn(&CallContext, &ClientError) + Send + Sync + 'static,
    ) -> Self {
        self.error_handler = Arc::new(handler);
        self
    }

    /// Fails calls with `Timeout` when no result arrives in time.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Uses `ids` as the source of correlation ids.
    pub fn with_id_generator(mut self, ids: IdGenerator) -> Self {
        self.ids = ids;
        self
    }
}

impl<Req> Default for ClientOptions<Req> {
    fn default() -> Self {
        Self::new()
    }
}

fn log_error(ctx: &CallContext, err: &ClientError) {
    tracing::debug!(
        "Call {} id={} failed: {}",
        ctx.operation(),
        ctx.call_id(),
        err
    );
}
