//! Recording doubles for tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::contract::{ErrorRecord, Metadata};
use crate::diff::{AssertPolicy, DiffEvent};
use crate::errors::MissingSide;
use crate::transport::{status, ServiceClient};

/// Collects every difference routed to its hook.
#[derive(Debug, Clone, Default)]
pub struct DiffRecorder {
    events: Arc<Mutex<Vec<DiffEvent>>>,
}

impl DiffRecorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy whose difference hook feeds this recorder.
    #[must_use]
    pub fn policy(&self) -> AssertPolicy {
        let events = Arc::clone(&self.events);
        AssertPolicy::new().with_on_diff(move |e| events.lock().push(e.clone()))
    }

    /// Everything recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<DiffEvent> {
        self.events.lock().clone()
    }

    /// Paths recorded so far, sorted.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.events.lock().iter().map(|e| e.path.clone()).collect();
        paths.sort();
        paths
    }

    /// The recorded event at `path`.
    #[must_use]
    pub fn at(&self, path: &str) -> Option<DiffEvent> {
        self.events.lock().iter().find(|e| e.path == path).cloned()
    }

    /// Paths recorded with the given missing side.
    #[must_use]
    pub fn missed_on(&self, side: MissingSide) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.missed_key_on == Some(side))
            .map(|e| e.path.clone())
            .collect()
    }

    /// Forgets everything recorded.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

/// A service client answering from a fixed table and counting calls.
#[derive(Debug, Default)]
pub struct StaticClient {
    replies: HashMap<String, Result<Value, ErrorRecord>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl StaticClient {
    /// Creates a client with no answers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `method` with `reply`.
    #[must_use]
    pub fn replying(mut self, method: impl Into<String>, reply: Value) -> Self {
        self.replies.insert(method.into(), Ok(reply));
        self
    }

    /// Fails `method` with `error`.
    #[must_use]
    pub fn failing(mut self, method: impl Into<String>, error: ErrorRecord) -> Self {
        self.replies.insert(method.into(), Err(error));
        self
    }

    /// Calls received, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ServiceClient for StaticClient {
    async fn call(
        &self,
        method: &str,
        args: Value,
        _metadata: Metadata,
        _call_options: Value,
    ) -> Result<Value, ErrorRecord> {
        self.calls.lock().push((method.to_string(), args));
        self.replies.get(method).cloned().unwrap_or_else(|| {
            Err(ErrorRecord::new(
                status::UNIMPLEMENTED,
                format!("no answer for `{method}`"),
            ))
        })
    }
}
