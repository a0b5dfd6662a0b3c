//! Canonical request identity.
//!
//! Scalars identify themselves. Objects and arrays are first pushed through
//! the method codec, so two payloads that the wire would deliver identically
//! collide, and then rendered as JSON with sorted keys.

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::errors::TransportError;
use crate::transport::MethodCodec;

/// Canonical text identity of a request's arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Computes the fingerprint of `args` under `codec`.
    pub fn of(args: &Value, codec: &dyn MethodCodec) -> Result<Self, TransportError> {
        match args {
            Value::Object(_) | Value::Array(_) => {
                let normalized = codec.normalize_request(args)?;
                Ok(Self(canonical_json(&normalized)))
            }
            scalar => Ok(Self(canonical_json(scalar))),
        }
    }

    /// The canonical text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short hex digest, for log fields.
    #[must_use]
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.0.as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..8])
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Renders `value` as compact JSON with object keys sorted at every level.
#[must_use]
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
