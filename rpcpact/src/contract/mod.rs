//! Contract documents.
//!
//! This module provides:
//! - The canonical document model (executions, exchanges, error records)
//! - Normalization of hand-written shorthand contracts
//! - Request fingerprinting
//! - Contract sources (document, JSON text, file)

mod document;
mod fingerprint;
mod normalize;
mod source;

pub use document::{
    ContractDocument, Contracts, ErrorRecord, Exchange, Execution, Metadata, MethodContract,
    ReplyRecord, RequestRecord, ServiceContract,
};
pub use fingerprint::{canonical_json, Fingerprint};
pub use normalize::{normalize_contracts, normalize_document};
pub use source::ContractSource;
