//! Test assertions for replay results.

use serde_json::Value;

use crate::contract::{ContractDocument, Exchange};
use crate::errors::{MissingSide, PactError};

/// Asserts that a run failed verification at `path`.
pub fn assert_verification_failed<T: std::fmt::Debug>(
    result: &Result<T, PactError>,
    path: &str,
    missed_key_on: Option<MissingSide>,
) {
    let err = match result {
        Err(PactError::Verification(err)) => err,
        other => panic!("Expected a verification failure at `{path}`, got {other:?}"),
    };
    assert_eq!(err.path, path, "Unexpected failure path: {err}");
    assert_eq!(
        err.missed_key_on, missed_key_on,
        "Unexpected missing side: {err}"
    );
}

/// Asserts how many executions a method holds in `document`.
pub fn assert_execution_count(document: &ContractDocument, service: &str, method: &str, expected: usize) {
    let actual = document.executions(service, method).len();
    assert_eq!(
        actual, expected,
        "Expected {expected} executions for {service}.{method}, got {actual}"
    );
}

/// Returns the observed exchange of one execution, panicking if it is absent.
#[must_use]
pub fn observed(document: &ContractDocument, service: &str, method: &str, index: usize) -> Exchange {
    document
        .executions(service, method)
        .get(index)
        .and_then(|e| e.expectation.clone())
        .unwrap_or_else(|| panic!("No observed exchange for {service}.{method}[{index}]"))
}

/// Asserts the observed reply payload of one execution.
pub fn assert_observed_reply(
    document: &ContractDocument,
    service: &str,
    method: &str,
    index: usize,
    expected: &Value,
) {
    let exchange = observed(document, service, method, index);
    assert_eq!(
        exchange.reply.reply.as_ref(),
        Some(expected),
        "Unexpected reply for {service}.{method}[{index}]"
    );
}

/// Asserts that every execution's observed reply equals its declared reply.
pub fn assert_replies_match_declarations(document: &ContractDocument) {
    for (service, methods) in &document.contracts {
        for (method, contract) in methods {
            for (index, execution) in contract.executions.iter().enumerate() {
                let exchange = observed(document, service, method, index);
                assert_eq!(
                    exchange.reply, execution.reply,
                    "Observed reply differs from declaration for {service}.{method}[{index}]"
                );
            }
        }
    }
}
