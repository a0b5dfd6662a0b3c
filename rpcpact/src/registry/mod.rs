//! Execution registries.
//!
//! This module provides:
//! - Include/exclude filter normalization
//! - `Picker`, the named collection every layer fans out over
//! - `Interaction`, the per-method registry of recorded executions
//! - `Suite`, the per-service registry of interactions

mod filter;
mod interaction;
mod picker;
mod suite;

pub use filter::{Filter, ServiceFilter, ServiceSelection};
pub use interaction::{CallFn, ExecOptions, Interaction};
pub(crate) use interaction::Pending;
pub use picker::Picker;
pub use suite::Suite;
pub(crate) use suite::PendingService;
