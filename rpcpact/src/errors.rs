//! Error types for contract recording and verification.
//!
//! The taxonomy mirrors the lifecycle of a contract run: declaration problems
//! are raised while interactions are registered, unexpected calls while the
//! mock handlers serve traffic, verification failures while replay results are
//! diffed, and transport failures while contracts are written or exchanged
//! with a broker.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::contract::ContractDocument;

/// The main error type for rpcpact operations.
#[derive(Debug, Error)]
pub enum PactError {
    /// An interaction or participant was declared incorrectly.
    #[error("{0}")]
    Declaration(#[from] DeclarationError),

    /// A mock handler received arguments matching no declared execution.
    #[error("{0}")]
    UnexpectedCall(#[from] UnexpectedCallError),

    /// An observed exchange did not satisfy its declaration.
    #[error("{0}")]
    Verification(#[from] VerificationError),

    /// A transport, broker or file operation failed.
    #[error("{0}")]
    Transport(#[from] TransportError),

    /// Replay succeeded but writing or publishing the contract failed.
    ///
    /// The computed document is carried along so the caller never loses it.
    #[error("contract computed but could not be finalized: {source}")]
    Finalize {
        /// The contract document produced by replay.
        document: Box<ContractDocument>,
        /// The write or publish failure.
        #[source]
        source: TransportError,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PactError {
    /// Returns the verification failure, if this is one.
    #[must_use]
    pub fn as_verification(&self) -> Option<&VerificationError> {
        match self {
            Self::Verification(err) => Some(err),
            _ => None,
        }
    }
}

/// Errors raised while declaring interactions or participants.
#[derive(Debug, Clone, Error)]
pub enum DeclarationError {
    /// Two executions of one method canonicalize to the same request.
    #[error("args: `{fingerprint}` already declared on {url}")]
    DuplicateFingerprint {
        /// The method identifier.
        url: String,
        /// The colliding fingerprint.
        fingerprint: String,
    },

    /// A consumer or provider name does not match the naming rule.
    #[error("{role} `{name}` should be made up of letters, numbers and(or) \"_\", start with letters, and not end with \"_\"")]
    InvalidName {
        /// "Consumer" or "Provider".
        role: String,
        /// The rejected name.
        name: String,
    },

    /// The contract names a service the transport does not expose.
    #[error("service `{service}` is not exposed by the transport")]
    UnknownService {
        /// The service path.
        service: String,
    },

    /// The contract names a method the service does not define.
    #[error("method `{method}` is not defined on service `{service}`")]
    UnknownMethod {
        /// The service path.
        service: String,
        /// The method name.
        method: String,
    },

    /// The contract document could not be interpreted.
    #[error("malformed contract: {reason}")]
    MalformedContract {
        /// What was wrong.
        reason: String,
    },
}

impl DeclarationError {
    /// Creates a duplicate fingerprint error.
    #[must_use]
    pub fn duplicate(url: impl Into<String>, fingerprint: impl Into<String>) -> Self {
        Self::DuplicateFingerprint {
            url: url.into(),
            fingerprint: fingerprint.into(),
        }
    }

    /// Creates an invalid participant name error.
    #[must_use]
    pub fn invalid_name(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self::InvalidName {
            role: role.into(),
            name: name.into(),
        }
    }

    /// Creates a malformed contract error.
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedContract {
            reason: reason.into(),
        }
    }
}

/// Raised when a mock is invoked with undeclared arguments.
#[derive(Debug, Clone, Error)]
#[error("Interaction with args on {url} `{fingerprint}` is not defined yet.")]
pub struct UnexpectedCallError {
    /// The method identifier.
    pub url: String,
    /// Fingerprint of the live arguments.
    pub fingerprint: String,
}

impl UnexpectedCallError {
    /// Creates a new unexpected call error.
    #[must_use]
    pub fn new(url: impl Into<String>, fingerprint: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            fingerprint: fingerprint.into(),
        }
    }
}

/// Which side of a comparison lacks a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingSide {
    /// The declared (expected) tree lacks the key.
    Expected,
    /// The observed (actual) tree lacks the key.
    Actual,
}

impl std::fmt::Display for MissingSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Expected => f.write_str("expected"),
            Self::Actual => f.write_str("actual"),
        }
    }
}

/// A structural verification failure.
#[derive(Debug, Clone, Error)]
#[error("{}", self.render())]
pub struct VerificationError {
    /// The method identifier.
    pub url: String,
    /// Field path of the first difference, empty for hook failures.
    pub path: String,
    /// Declared value at the path.
    pub expected: Option<serde_json::Value>,
    /// Observed value at the path.
    pub actual: Option<serde_json::Value>,
    /// Side missing the key, if the difference is a missing key.
    pub missed_key_on: Option<MissingSide>,
    /// Free-form message from an assertion hook.
    pub message: Option<String>,
}

impl VerificationError {
    /// Creates a verification error for a field difference.
    #[must_use]
    pub fn field(
        url: impl Into<String>,
        path: impl Into<String>,
        expected: Option<serde_json::Value>,
        actual: Option<serde_json::Value>,
        missed_key_on: Option<MissingSide>,
    ) -> Self {
        Self {
            url: url.into(),
            path: path.into(),
            expected,
            actual,
            missed_key_on,
            message: None,
        }
    }

    /// Creates a verification error raised by an assertion hook.
    #[must_use]
    pub fn custom(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            path: String::new(),
            expected: None,
            actual: None,
            missed_key_on: None,
            message: Some(message.into()),
        }
    }

    fn render(&self) -> String {
        if let Some(ref message) = self.message {
            return format!("{}: verify failed: {}", self.url, message);
        }

        let show = |v: &Option<serde_json::Value>| {
            v.as_ref()
                .map_or_else(|| "undefined".to_string(), ToString::to_string)
        };
        let mut out = format!("{}: verify failed on field `{}`", self.url, self.path);
        if let Some(side) = self.missed_key_on {
            out.push_str(&format!("\n    This field is missed in {side} data"));
        }
        out.push_str(&format!("\n    expected: {}", show(&self.expected)));
        out.push_str(&format!("\n    actual: {}", show(&self.actual)));
        out
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("url".to_string(), serde_json::json!(self.url));
        map.insert("path".to_string(), serde_json::json!(self.path));
        if let Some(ref v) = self.expected {
            map.insert("expected".to_string(), v.clone());
        }
        if let Some(ref v) = self.actual {
            map.insert("actual".to_string(), v.clone());
        }
        if let Some(side) = self.missed_key_on {
            map.insert("missedKeyOn".to_string(), serde_json::json!(side));
        }
        if let Some(ref m) = self.message {
            map.insert("message".to_string(), serde_json::json!(m));
        }
        map
    }
}

/// Errors from the transport, the broker or the filesystem.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// A broker request failed.
    #[error("broker {url} failed: {reason}")]
    Broker {
        /// The request URL.
        url: String,
        /// Why it failed.
        reason: String,
    },

    /// Every configured broker mirror failed.
    #[error("all brokers failed: {}", failures.join("; "))]
    AllBrokersFailed {
        /// One message per mirror.
        failures: Vec<String>,
    },

    /// Reading or writing a contract file failed.
    #[error("contract file {path}: {reason}")]
    Io {
        /// The file path.
        path: String,
        /// Why it failed.
        reason: String,
    },

    /// The method codec rejected a value.
    #[error("codec for {url} failed: {reason}")]
    Codec {
        /// The method identifier.
        url: String,
        /// Why it failed.
        reason: String,
    },

    /// The transport could not be started, stopped or configured.
    #[error("transport lifecycle error: {0}")]
    Lifecycle(String),
}

impl TransportError {
    /// Creates a broker error.
    #[must_use]
    pub fn broker(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Broker {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a file error.
    #[must_use]
    pub fn io(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Io {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a codec error.
    #[must_use]
    pub fn codec(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Codec {
            url: url.into(),
            reason: reason.into(),
        }
    }
}
