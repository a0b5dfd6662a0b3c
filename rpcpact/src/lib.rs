//! # rpcpact
//!
//! Consumer-driven contract testing for RPC services.
//!
//! A consumer declares the exchanges it relies on, replays them against mock
//! handlers and emits a contract document. A provider loads that document,
//! replays every declared request against its real implementation and
//! structurally verifies what comes back:
//!
//! - **Recording**: declared executions are served by fingerprint-matched mock handlers
//! - **Verification**: observed requests and replies are diffed against declarations
//! - **Evolution rules**: removed fields break, added fields are forgiven by default
//! - **Exchange**: contracts travel as JSON files or through a broker
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rpcpact::prelude::*;
//!
//! // Record on the consumer side
//! let mut consumer = Consumer::new(transport, "greeter_consumer", "greeter_provider")
//!     .with_output_file("contracts/greeter.json");
//! consumer.initialize(contract_json).await?;
//! consumer.exec_and_clearup(ServiceFilter::new(), &ExecOptions::new()).await?;
//!
//! // Verify on the provider side
//! let mut provider = Provider::new(real_transport, "greeter_consumer", "greeter_provider");
//! provider.initialize(PathBuf::from("contracts/greeter.json")).await?;
//! provider.exec_and_clearup(ServiceFilter::new(), &ExecOptions::new()).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod collector;
pub mod config;
pub mod contract;
pub mod diff;
pub mod errors;
pub mod observability;
pub mod register;
pub mod registry;
pub mod testing;
pub mod transport;

#[cfg(feature = "broker")]
pub mod broker;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::collector::{Collector, Consumer, Provider};
    pub use crate::config::{BrokerConfig, CollectorConfig, ReplayConfig};
    pub use crate::contract::{
        ContractDocument, ContractSource, ErrorRecord, Exchange, Execution, Metadata,
        ReplyRecord, RequestRecord,
    };
    pub use crate::diff::{AssertOpts, AssertPolicy, DiffEvent};
    pub use crate::errors::{
        DeclarationError, MissingSide, PactError, TransportError, UnexpectedCallError,
        VerificationError,
    };
    pub use crate::registry::{ExecOptions, Filter, ServiceFilter};
    pub use crate::transport::{
        InMemoryTransport, JsonCodec, MessageSchema, SchemaCodec, ServiceClient,
        ServiceDescriptor, Transport,
    };

    #[cfg(feature = "broker")]
    pub use crate::broker::BrokerClient;
}
