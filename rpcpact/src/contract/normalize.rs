//! Normalization of raw contract documents.
//!
//! Contracts are authored by hand, so a method entry may be written in any of
//! the shorthand forms below. They are all folded into `{executions: [...]}`
//! with every missing request/reply field defaulted.
//!
//! ```text
//! sayHello: { executions: [ {...}, {...} ] }
//! sayHello: { executions: {...} }
//! sayHello: [ {...}, {...} ]
//! sayHello: {...}
//! ```

use serde_json::{Map, Value};

use super::document::{ContractDocument, Contracts, Execution, MethodContract, ServiceContract};
use crate::diff::AssertOpts;
use crate::errors::{DeclarationError, PactError};

/// Normalizes a whole raw document.
pub fn normalize_document(raw: Value) -> Result<ContractDocument, PactError> {
    let Value::Object(mut map) = raw else {
        return Err(DeclarationError::malformed("contract document must be an object").into());
    };

    let consumer = take_string(&mut map, "consumer")?;
    let provider = take_string(&mut map, "provider")?;
    let assert_opts = match map.remove("assertOpts") {
        None | Some(Value::Null) => None,
        Some(v) => Some(serde_json::from_value::<AssertOpts>(v)?),
    };
    let contracts = match map.remove("contracts") {
        None | Some(Value::Null) => Contracts::new(),
        Some(v) => normalize_contracts(v)?,
    };

    Ok(ContractDocument {
        consumer,
        provider,
        assert_opts,
        contracts,
    })
}

/// Normalizes a `service -> method -> executions` mapping.
pub fn normalize_contracts(raw: Value) -> Result<Contracts, PactError> {
    let Value::Object(services) = raw else {
        return Err(DeclarationError::malformed("`contracts` must be an object").into());
    };

    let mut contracts = Contracts::new();
    for (service, methods) in services {
        let Value::Object(methods) = methods else {
            return Err(DeclarationError::malformed(format!(
                "contract for service `{service}` must be an object"
            ))
            .into());
        };

        let mut suite = ServiceContract::new();
        for (method, entry) in methods {
            let executions = normalize_method(entry).map_err(|reason| {
                DeclarationError::malformed(format!("{service}.{method}: {reason}"))
            })?;
            suite.insert(method, MethodContract { executions });
        }
        contracts.insert(service, suite);
    }
    Ok(contracts)
}

fn normalize_method(entry: Value) -> Result<Vec<Execution>, String> {
    let list = match entry {
        Value::Object(mut obj) if obj.contains_key("executions") => {
            match obj.remove("executions").unwrap_or(Value::Null) {
                Value::Array(items) => items,
                Value::Null => Vec::new(),
                single => vec![single],
            }
        }
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        single => vec![single],
    };

    list.into_iter()
        .map(|item| serde_json::from_value::<Execution>(item).map_err(|e| e.to_string()))
        .collect()
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> Result<String, PactError> {
    match map.remove(key) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(DeclarationError::malformed(format!(
            "`{key}` must be a string, got {other}"
        ))
        .into()),
    }
}
