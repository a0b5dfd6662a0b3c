//! The canonical contract document and its records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::diff::AssertOpts;

/// Call metadata attached to a request.
pub type Metadata = BTreeMap<String, String>;

/// Method name to its recorded executions.
pub type ServiceContract = BTreeMap<String, MethodContract>;

/// Service path to its method contracts.
pub type Contracts = BTreeMap<String, ServiceContract>;

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// The request half of an exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRecord {
    /// Call arguments.
    #[serde(default)]
    pub args: Value,
    /// Call metadata.
    #[serde(default)]
    pub metadata: Metadata,
    /// Client-side call options.
    #[serde(default = "empty_object")]
    pub call_options: Value,
}

impl Default for RequestRecord {
    fn default() -> Self {
        Self {
            args: Value::Null,
            metadata: Metadata::new(),
            call_options: empty_object(),
        }
    }
}

impl RequestRecord {
    /// Creates a request with the given arguments.
    #[must_use]
    pub fn new(args: Value) -> Self {
        Self {
            args,
            ..Default::default()
        }
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// The reply half of an exchange. By convention only one side is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplyRecord {
    /// The reply payload.
    #[serde(default)]
    pub reply: Option<Value>,
    /// The error raised instead of a reply.
    #[serde(default)]
    pub error: Option<ErrorRecord>,
}

impl ReplyRecord {
    /// A successful reply.
    #[must_use]
    pub fn ok(reply: Value) -> Self {
        Self {
            reply: Some(reply),
            error: None,
        }
    }

    /// A failed call.
    #[must_use]
    pub fn err(error: ErrorRecord) -> Self {
        Self {
            reply: None,
            error: Some(error),
        }
    }

    /// Builds a record from the outcome of a call.
    #[must_use]
    pub fn from_result(result: Result<Value, ErrorRecord>) -> Self {
        match result {
            Ok(v) => Self::ok(v),
            Err(e) => Self::err(e),
        }
    }
}

/// An RPC error reduced to a plain field map.
///
/// Kept as a map rather than a fixed struct so verification can narrow it to
/// any subset of fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorRecord(Map<String, Value>);

impl ErrorRecord {
    /// Creates an error record with a status code and details text.
    #[must_use]
    pub fn new(code: i64, details: impl Into<String>) -> Self {
        let mut map = Map::new();
        map.insert("code".to_string(), Value::from(code));
        map.insert("details".to_string(), Value::String(details.into()));
        Self(map)
    }

    /// Wraps an existing field map.
    #[must_use]
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Adds or replaces a field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    /// The status code, if any.
    #[must_use]
    pub fn code(&self) -> Option<i64> {
        self.0.get("code").and_then(Value::as_i64)
    }

    /// The details text, if any.
    #[must_use]
    pub fn details(&self) -> Option<&str> {
        self.0.get("details").and_then(Value::as_str)
    }

    /// Field names present on this error.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Returns a copy reduced to the named fields.
    #[must_use]
    pub fn pick<S: AsRef<str>>(&self, fields: &[S]) -> Self {
        let map = fields
            .iter()
            .filter_map(|f| {
                let f = f.as_ref();
                self.0.get(f).map(|v| (f.to_string(), v.clone()))
            })
            .collect();
        Self(map)
    }

    /// Borrow the underlying field map.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl std::fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.code(), self.details()) {
            (Some(code), Some(details)) => write!(f, "{code} {details}"),
            (Some(code), None) => write!(f, "{code}"),
            (None, Some(details)) => f.write_str(details),
            (None, None) => write!(f, "{}", Value::Object(self.0.clone())),
        }
    }
}

impl std::error::Error for ErrorRecord {}

/// A request paired with its reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    /// The request.
    #[serde(default)]
    pub request: RequestRecord,
    /// The reply.
    #[serde(default)]
    pub reply: ReplyRecord,
}

/// One recorded exchange plus what was observed when it was replayed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    /// The declared request.
    #[serde(default)]
    pub request: RequestRecord,
    /// The declared reply.
    #[serde(default)]
    pub reply: ReplyRecord,
    /// The observed exchange, populated by replay.
    #[serde(default)]
    pub expectation: Option<Exchange>,
}

impl Execution {
    /// Declares an execution that returns `reply`.
    #[must_use]
    pub fn returning(args: Value, reply: Value) -> Self {
        Self {
            request: RequestRecord::new(args),
            reply: ReplyRecord::ok(reply),
            expectation: None,
        }
    }

    /// Declares an execution that fails with `error`.
    #[must_use]
    pub fn failing(args: Value, error: ErrorRecord) -> Self {
        Self {
            request: RequestRecord::new(args),
            reply: ReplyRecord::err(error),
            expectation: None,
        }
    }

    /// The declared half as an exchange view.
    #[must_use]
    pub fn declared(&self) -> Exchange {
        Exchange {
            request: self.request.clone(),
            reply: self.reply.clone(),
        }
    }
}

/// All executions recorded for one method.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodContract {
    /// Executions in declaration order.
    #[serde(default)]
    pub executions: Vec<Execution>,
}

/// The canonical contract exchanged between consumer and provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractDocument {
    /// Consumer name.
    #[serde(default)]
    pub consumer: String,
    /// Provider name.
    #[serde(default)]
    pub provider: String,
    /// Policy the provider is expected to verify with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assert_opts: Option<AssertOpts>,
    /// Service path to method contracts.
    #[serde(default)]
    pub contracts: Contracts,
}

impl ContractDocument {
    /// Creates an empty document for a consumer/provider pair.
    #[must_use]
    pub fn new(consumer: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            consumer: consumer.into(),
            provider: provider.into(),
            assert_opts: None,
            contracts: Contracts::new(),
        }
    }

    /// Appends executions for a service method.
    #[must_use]
    pub fn with_executions(
        mut self,
        service: impl Into<String>,
        method: impl Into<String>,
        executions: Vec<Execution>,
    ) -> Self {
        self.contracts
            .entry(service.into())
            .or_default()
            .entry(method.into())
            .or_default()
            .executions
            .extend(executions);
        self
    }

    /// Executions declared for a service method.
    #[must_use]
    pub fn executions(&self, service: &str, method: &str) -> &[Execution] {
        self.contracts
            .get(service)
            .and_then(|s| s.get(method))
            .map_or(&[], |m| m.executions.as_slice())
    }

    /// Total number of executions across all services.
    #[must_use]
    pub fn execution_count(&self) -> usize {
        self.contracts
            .values()
            .flat_map(BTreeMap::values)
            .map(|m| m.executions.len())
            .sum()
    }

    /// Pretty JSON text, as written to contract files.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
