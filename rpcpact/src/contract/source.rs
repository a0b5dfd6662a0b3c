//! Where a contract comes from.

use serde_json::Value;
use std::path::PathBuf;

use super::document::ContractDocument;
use super::normalize::normalize_document;
use crate::errors::{PactError, TransportError};

/// A contract supplied as a document, raw JSON, JSON text or a file path.
#[derive(Debug, Clone)]
pub enum ContractSource {
    /// An already-built document.
    Document(ContractDocument),
    /// A raw JSON value, possibly using shorthand forms.
    Value(Value),
    /// JSON text.
    Json(String),
    /// A JSON file on disk.
    File(PathBuf),
}

impl ContractSource {
    /// Loads and normalizes the contract.
    pub async fn load(self) -> Result<ContractDocument, PactError> {
        match self {
            Self::Document(doc) => {
                // round trip so shorthand-free documents get the same defaults
                normalize_document(serde_json::to_value(doc)?)
            }
            Self::Value(value) => normalize_document(value),
            Self::Json(text) => normalize_document(serde_json::from_str(&text)?),
            Self::File(path) => {
                let text = tokio::fs::read_to_string(&path).await.map_err(|e| {
                    TransportError::io(path.display().to_string(), e.to_string())
                })?;
                tracing::debug!(path = %path.display(), "Loaded contract file");
                normalize_document(serde_json::from_str(&text)?)
            }
        }
    }
}

impl From<&str> for ContractSource {
    /// Text starting with `{` is JSON, anything else is a file path.
    fn from(s: &str) -> Self {
        if s.trim_start().starts_with('{') {
            Self::Json(s.to_string())
        } else {
            Self::File(PathBuf::from(s))
        }
    }
}

impl From<ContractDocument> for ContractSource {
    fn from(doc: ContractDocument) -> Self {
        Self::Document(doc)
    }
}

impl From<Value> for ContractSource {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<PathBuf> for ContractSource {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}
