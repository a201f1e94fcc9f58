//! Per-call context passed through hooks.

use std::collections::HashMap;

/// Context of one call, threaded through before/after/finalizer hooks on
/// both the calling and the serving side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallContext {
    operation: String,
    call_id: u64,
    metadata: HashMap<String, String>,
}

impl CallContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            ..Default::default()
        }
    }

    pub fn with_call_id(mut self, call_id: u64) -> Self {
        self.call_id = call_id;
        self
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Correlation id of the call, or 0 before one is allocated.
    pub fn call_id(&self) -> u64 {
        self.call_id
    }

    pub fn set_call_id(&mut self, call_id: u64) {
        self.call_id = call_id;
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.metadata.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.metadata.remove(key)
    }

    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }
}
