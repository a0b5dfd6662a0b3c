//! Collectors: the recording and verifying roles.
//!
//! This module provides:
//! - [`Collector`], which binds transport services to suites and replays them
//! - [`Consumer`], which records against mock handlers and emits contracts
//! - [`Provider`], which replays contracts against real services

mod base;
mod consumer;
mod integration_tests;
mod provider;

pub use base::{validate_name, Collector};
pub use consumer::{finalize_consumer, Consumer, ConsumerSinks};
pub use provider::{finalize_provider, Provider};
