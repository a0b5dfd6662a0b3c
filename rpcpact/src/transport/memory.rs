//! In-process reference transport.
//!
//! Calls go through the method codec on the way in and out, as they would on
//! a real wire. A registered implementation answers in place of the installed
//! mock handler, which is how a provider's real service is plugged in.

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{
    status, HandlerTable, MethodDescriptor, ServiceClient, ServiceDescriptor, Transport,
};
use crate::contract::{ErrorRecord, Metadata};
use crate::errors::TransportError;

/// A real (non-mock) method implementation.
pub type Implementation =
    Arc<dyn Fn(Value, Metadata) -> BoxFuture<'static, Result<Value, ErrorRecord>> + Send + Sync>;

#[derive(Default)]
struct MemoryState {
    handlers: HandlerTable,
    implementations: HashMap<(String, String), Implementation>,
    running: bool,
    clients_closed: bool,
}

/// Transport that dispatches calls in-process.
#[derive(Clone)]
pub struct InMemoryTransport {
    services: Arc<Vec<ServiceDescriptor>>,
    state: Arc<RwLock<MemoryState>>,
    calls: Arc<AtomicUsize>,
}

impl InMemoryTransport {
    /// Creates a transport serving `services`.
    #[must_use]
    pub fn new(services: Vec<ServiceDescriptor>) -> Self {
        Self {
            services: Arc::new(services),
            state: Arc::new(RwLock::new(MemoryState::default())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Plugs in a real implementation for a method.
    #[must_use]
    pub fn implement<F, Fut>(self, service: &str, method: &str, f: F) -> Self
    where
        F: Fn(Value, Metadata) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ErrorRecord>> + Send + 'static,
    {
        let implementation: Implementation = Arc::new(move |args, metadata| f(args, metadata).boxed());
        self.state
            .write()
            .implementations
            .insert((service.to_string(), method.to_string()), implementation);
        self
    }

    /// Whether the server is accepting calls.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state.read().running
    }

    /// Number of calls that reached dispatch.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for InMemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryTransport")
            .field("services", &self.services)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    fn services(&self) -> Vec<ServiceDescriptor> {
        self.services.as_ref().clone()
    }

    fn client(&self, service: &str) -> Result<Arc<dyn ServiceClient>, TransportError> {
        let descriptor = self
            .services
            .iter()
            .find(|s| s.path == service)
            .ok_or_else(|| TransportError::Lifecycle(format!("unknown service `{service}`")))?;

        Ok(Arc::new(MemoryClient {
            service: service.to_string(),
            methods: descriptor
                .methods
                .iter()
                .map(|m| (m.name.clone(), m.clone()))
                .collect(),
            state: Arc::clone(&self.state),
            calls: Arc::clone(&self.calls),
        }))
    }

    fn load_handlers(&self, table: HandlerTable) -> Result<(), TransportError> {
        let mut state = self.state.write();
        if state.running {
            return Err(TransportError::Lifecycle(
                "handlers must be loaded before the server starts".to_string(),
            ));
        }
        state.handlers = table;
        Ok(())
    }

    async fn start(&self) -> Result<(), TransportError> {
        self.state.write().running = true;
        tracing::debug!(services = self.services.len(), "In-memory transport started");
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), TransportError> {
        self.state.write().running = false;
        tracing::debug!("In-memory transport stopped");
        Ok(())
    }

    fn close_clients(&self) {
        self.state.write().clients_closed = true;
    }
}

/// Client handed out by [`InMemoryTransport`].
pub struct MemoryClient {
    service: String,
    methods: BTreeMap<String, MethodDescriptor>,
    state: Arc<RwLock<MemoryState>>,
    calls: Arc<AtomicUsize>,
}

enum Route {
    Real(Implementation),
    Mock(super::MockHandler),
}

#[async_trait]
impl ServiceClient for MemoryClient {
    async fn call(
        &self,
        method: &str,
        args: Value,
        metadata: Metadata,
        _call_options: Value,
    ) -> Result<Value, ErrorRecord> {
        let descriptor = self.methods.get(method).ok_or_else(|| {
            ErrorRecord::new(
                status::UNIMPLEMENTED,
                format!("method `{method}` is not defined on `{}`", self.service),
            )
        })?;

        let route = {
            let state = self.state.read();
            if state.clients_closed {
                return Err(ErrorRecord::new(status::UNAVAILABLE, "client is closed"));
            }
            if !state.running {
                return Err(ErrorRecord::new(status::UNAVAILABLE, "server is not running"));
            }
            let key = (self.service.clone(), method.to_string());
            if let Some(real) = state.implementations.get(&key) {
                Route::Real(Arc::clone(real))
            } else if let Some(mock) = state.handlers.get(&self.service).and_then(|m| m.get(method)) {
                Route::Mock(Arc::clone(mock))
            } else {
                return Err(ErrorRecord::new(
                    status::UNIMPLEMENTED,
                    format!("{} has no handler", descriptor.path),
                ));
            }
        };

        self.calls.fetch_add(1, Ordering::SeqCst);
        let internal = |e: TransportError| ErrorRecord::new(status::INTERNAL, e.to_string());
        let decoded = descriptor.codec.normalize_request(&args).map_err(internal)?;

        let reply = match route {
            Route::Real(real) => real(decoded, metadata).await?,
            Route::Mock(mock) => mock(decoded, metadata).map_err(super::HandlerError::into_error_record)?,
        };

        descriptor.codec.normalize_reply(&reply).map_err(internal)
    }
}
