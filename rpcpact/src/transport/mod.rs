//! The RPC transport seam.
//!
//! Serving, dispatch and wire encoding belong to the transport. The engine
//! only needs to enumerate services, normalize payloads the way the wire
//! would, install mock handlers, call the real method path and drive the
//! server lifecycle.

mod codec;
mod memory;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::contract::{ErrorRecord, Metadata};
use crate::errors::{TransportError, UnexpectedCallError};

pub use codec::{JsonCodec, MessageSchema, SchemaCodec};
pub use memory::{Implementation, InMemoryTransport, MemoryClient};

/// Status codes used when the transport itself fails a call.
pub mod status {
    /// Unknown error.
    pub const UNKNOWN: i64 = 2;
    /// Deadline exceeded.
    pub const DEADLINE_EXCEEDED: i64 = 4;
    /// Method not implemented.
    pub const UNIMPLEMENTED: i64 = 12;
    /// Internal error.
    pub const INTERNAL: i64 = 13;
    /// Service unavailable.
    pub const UNAVAILABLE: i64 = 14;
}

/// Why a mock handler refused a call.
#[derive(Debug, Clone, Error)]
pub enum HandlerError {
    /// The declared execution raises this error.
    #[error("{0}")]
    Declared(ErrorRecord),
    /// No execution matches the live arguments.
    #[error("{0}")]
    Unexpected(#[from] UnexpectedCallError),
}

impl HandlerError {
    /// The error a client observes for this failure.
    #[must_use]
    pub fn into_error_record(self) -> ErrorRecord {
        match self {
            Self::Declared(record) => record,
            Self::Unexpected(err) => ErrorRecord::new(status::UNKNOWN, err.to_string()),
        }
    }
}

/// Synchronous mock implementation of one method.
pub type MockHandler = Arc<dyn Fn(Value, Metadata) -> Result<Value, HandlerError> + Send + Sync>;

/// Service path to method name to mock handler.
pub type HandlerTable = BTreeMap<String, BTreeMap<String, MockHandler>>;

/// Wire round trip for one method's request and reply messages.
pub trait MethodCodec: Send + Sync {
    /// Serializes then deserializes a request message.
    fn normalize_request(&self, args: &Value) -> Result<Value, TransportError>;

    /// Serializes then deserializes a reply message.
    fn normalize_reply(&self, reply: &Value) -> Result<Value, TransportError>;
}

/// One method exposed by a service.
#[derive(Clone)]
pub struct MethodDescriptor {
    /// Method name as used in contracts.
    pub name: String,
    /// Fully-qualified method path, used as the method identifier.
    pub path: String,
    /// The method's wire codec.
    pub codec: Arc<dyn MethodCodec>,
}

impl std::fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// A service and its method table.
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    /// Service path, e.g. `helloworld.Greeter`.
    pub path: String,
    /// Methods in declaration order.
    pub methods: Vec<MethodDescriptor>,
}

impl ServiceDescriptor {
    /// Creates a service with no methods.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            methods: Vec::new(),
        }
    }

    /// Adds a method; its path is `/{service}/{Method}`.
    #[must_use]
    pub fn method(mut self, name: impl Into<String>, codec: Arc<dyn MethodCodec>) -> Self {
        let name = name.into();
        let path = format!("/{}/{}", self.path, upper_first(&name));
        self.methods.push(MethodDescriptor { name, path, codec });
        self
    }

    /// Looks up a method by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|m| m.name == name)
    }
}

fn upper_first(name: &str) -> String {
    let mut chars = name.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// The client-side call path of one service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ServiceClient: Send + Sync {
    /// Invokes `method` and returns its reply or the error it raised.
    async fn call(
        &self,
        method: &str,
        args: Value,
        metadata: Metadata,
        call_options: Value,
    ) -> Result<Value, ErrorRecord>;
}

/// The RPC transport the engine drives.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Services the transport serves.
    fn services(&self) -> Vec<ServiceDescriptor>;

    /// The client for one service.
    fn client(&self, service: &str) -> Result<Arc<dyn ServiceClient>, TransportError>;

    /// Installs mock handlers. Called once, before `start`.
    fn load_handlers(&self, table: HandlerTable) -> Result<(), TransportError>;

    /// Starts accepting calls.
    async fn start(&self) -> Result<(), TransportError>;

    /// Stops the server.
    async fn shutdown(&self) -> Result<(), TransportError>;

    /// Closes all clients.
    fn close_clients(&self);
}
