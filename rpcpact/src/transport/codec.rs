//! Reference codecs.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::MethodCodec;
use crate::errors::TransportError;

/// Identity round trip through JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    fn round_trip(value: &Value) -> Result<Value, TransportError> {
        let text = serde_json::to_string(value)
            .map_err(|e| TransportError::codec("json", e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| TransportError::codec("json", e.to_string()))
    }
}

impl MethodCodec for JsonCodec {
    fn normalize_request(&self, args: &Value) -> Result<Value, TransportError> {
        Self::round_trip(args)
    }

    fn normalize_reply(&self, reply: &Value) -> Result<Value, TransportError> {
        Self::round_trip(reply)
    }
}

/// Shape of a message, enough to emulate a schema-driven wire round trip.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageSchema {
    /// A scalar field, filled with `default` when absent.
    Scalar {
        /// Value decoded for an absent field.
        default: Option<Value>,
    },
    /// A nested message with named fields.
    Message(BTreeMap<String, MessageSchema>),
    /// A repeated field.
    Repeated(Box<MessageSchema>),
}

impl MessageSchema {
    /// A scalar with no default.
    #[must_use]
    pub fn scalar() -> Self {
        Self::Scalar { default: None }
    }

    /// A scalar decoded as `default` when absent.
    #[must_use]
    pub fn scalar_with_default(default: Value) -> Self {
        Self::Scalar {
            default: Some(default),
        }
    }

    /// A message with the given fields.
    #[must_use]
    pub fn message<'a>(fields: impl IntoIterator<Item = (&'a str, MessageSchema)>) -> Self {
        Self::Message(
            fields
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    /// A repeated field of `item`.
    #[must_use]
    pub fn repeated(item: MessageSchema) -> Self {
        Self::Repeated(Box::new(item))
    }

    /// Projects `value` onto this schema, dropping unknown fields.
    pub fn project(&self, value: &Value) -> Result<Value, String> {
        match (self, value) {
            (_, Value::Null) => Ok(Value::Null),
            (Self::Scalar { .. }, v) => Ok(v.clone()),
            (Self::Message(fields), Value::Object(obj)) => {
                let mut out = Map::new();
                for (name, schema) in fields {
                    match obj.get(name) {
                        Some(v) => {
                            out.insert(name.clone(), schema.project(v)?);
                        }
                        None => {
                            if let Self::Scalar { default: Some(d) } = schema {
                                out.insert(name.clone(), d.clone());
                            }
                        }
                    }
                }
                Ok(Value::Object(out))
            }
            (Self::Repeated(item), Value::Array(items)) => items
                .iter()
                .map(|v| item.project(v))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            (Self::Message(_), other) => Err(format!("expected a message, got {other}")),
            (Self::Repeated(_), other) => Err(format!("expected a list, got {other}")),
        }
    }
}

/// Codec that projects requests and replies onto message schemas.
#[derive(Debug, Clone)]
pub struct SchemaCodec {
    request: MessageSchema,
    reply: MessageSchema,
}

impl SchemaCodec {
    /// Creates a codec from request and reply schemas.
    #[must_use]
    pub fn new(request: MessageSchema, reply: MessageSchema) -> Self {
        Self { request, reply }
    }
}

impl MethodCodec for SchemaCodec {
    fn normalize_request(&self, args: &Value) -> Result<Value, TransportError> {
        self.request
            .project(args)
            .map_err(|e| TransportError::codec("request schema", e))
    }

    fn normalize_reply(&self, reply: &Value) -> Result<Value, TransportError> {
        self.reply
            .project(reply)
            .map_err(|e| TransportError::codec("reply schema", e))
    }
}
