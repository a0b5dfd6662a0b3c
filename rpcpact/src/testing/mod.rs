//! Testing utilities for contract runs.
//!
//! This module provides:
//! - Sample services, schema revisions and a sample contract
//! - Recording doubles for differences and service calls
//! - Assertions over replay results

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_execution_count, assert_observed_reply, assert_replies_match_declarations,
    assert_verification_failed, observed,
};
pub use fixtures::{
    consumer_transport, greeter_service, nest_message_service, provider_transport,
    sample_contract, NestMessageVersion, CONSUMER, GREETER, NEST_MESSAGE, PROVIDER,
    SAMPLE_EXECUTIONS,
};
pub use mocks::{DiffRecorder, StaticClient};
