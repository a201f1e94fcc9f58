//! Operation name to handler mapping.

use crate::error::ServerError;
use dashmap::DashMap;
use muxrpc_protocol::{BoxError, CallContext};
use std::sync::Arc;

/// Handles calls for one operation.
///
/// Implemented for any `Fn(&CallContext, Req) -> Result<Resp, BoxError>`.
pub trait Handler<Req, Resp>: Send + Sync {
    fn call(&self, ctx: &CallContext, request: Req) -> Result<Resp, BoxError>;
}

impl<Req, Resp, F> Handler<Req, Resp> for F
where
    F: Fn(&CallContext, Req) -> Result<Resp, BoxError> + Send + Sync,
{
    fn call(&self, ctx: &CallContext, request: Req) -> Result<Resp, BoxError> {
        self(ctx, request)
    }
}

/// Concurrent registry of handlers keyed by operation name.
pub struct HandlerRegistry<Req, Resp> {
    handlers: DashMap<String, Arc<dyn Handler<Req, Resp>>>,
}

impl<Req: 'static, Resp: 'static> HandlerRegistry<Req, Resp> {
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
        }
    }

    /// Registers `handler` under `name`, replacing any previous handler.
    pub fn register<H>(&self, name: impl Into<String>, handler: H) -> Result<(), ServerError>
    where
        H: Handler<Req, Resp> + 'static,
    {
        let name = name.into();
        if name.is_empty() {
            return Err(ServerError::EmptyOperationName);
        }
        if self.handlers.insert(name.clone(), Arc::new(handler)).is_some() {
            tracing::debug!("Replaced handler for operation {}", name);
        }
        Ok(())
    }

    /// Removes the handler for `name`. Returns whether one was registered.
    pub fn unregister(&self, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }
        self.handlers.remove(name).is_some()
    }

    /// Returns the handler for `name`.
    ///
    /// The handler is cloned out of the map so no shard lock is held while
    /// it runs.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Handler<Req, Resp>>> {
        self.handlers.get(name).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Returns the registered operation names, sorted.
    pub fn operations(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<Req: 'static, Resp: 'static> Default for HandlerRegistry<Req, Resp> {
    fn default() -> Self {
        Self::new()
    }
}
