//! Recursive structural comparison of declared and observed trees.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

use crate::errors::{MissingSide, VerificationError};

/// A value together with its JSON type name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedValue {
    /// The value, `None` when the key is absent.
    pub val: Option<Value>,
    /// JSON type name, `undefined` when absent.
    #[serde(rename = "type")]
    pub kind: String,
}

impl TypedValue {
    fn of(value: Option<&Value>) -> Self {
        Self {
            val: value.cloned(),
            kind: type_name(value).to_string(),
        }
    }
}

/// One difference found while comparing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffEvent {
    /// Dotted/bracketed field path.
    pub path: String,
    /// Method identifier.
    pub url: String,
    /// Declared side.
    pub expected: TypedValue,
    /// Observed side.
    pub actual: TypedValue,
    /// Which side lacks the key, for missing-key differences.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missed_key_on: Option<MissingSide>,
}

impl DiffEvent {
    /// Converts the event into a verification failure.
    #[must_use]
    pub fn into_verification_error(self) -> VerificationError {
        VerificationError::field(
            self.url,
            self.path,
            self.expected.val,
            self.actual.val,
            self.missed_key_on,
        )
    }
}

/// Compares `expected` against `actual`, reporting differences to `sink`.
///
/// With `trim_uncovered`, keys present only in `actual` are removed from it
/// instead of being reported.
pub fn diff(
    expected: &Value,
    actual: &mut Value,
    trim_uncovered: bool,
    url: &str,
    path: &str,
    sink: &mut dyn FnMut(DiffEvent),
) {
    if *expected == *actual {
        return;
    }

    match (expected, actual) {
        (Value::Array(exp), Value::Array(act)) => {
            if exp.len() != act.len() {
                sink(mismatch(url, path, Some(expected), Some(&Value::Array(act.clone())), None));
                return;
            }
            for (i, (e, a)) in exp.iter().zip(act.iter_mut()).enumerate() {
                diff(e, a, trim_uncovered, url, &format!("{path}[{i}]"), sink);
            }
        }
        (Value::Object(exp), Value::Object(act)) => {
            let keys: BTreeSet<String> = exp.keys().chain(act.keys()).cloned().collect();
            for key in keys {
                let child = join(path, &key);
                match (exp.get(&key), act.contains_key(&key)) {
                    (None, true) => {
                        if trim_uncovered {
                            act.remove(&key);
                        } else {
                            sink(mismatch(
                                url,
                                &child,
                                None,
                                act.get(&key),
                                Some(MissingSide::Expected),
                            ));
                        }
                    }
                    (Some(e), false) => {
                        sink(mismatch(url, &child, Some(e), None, Some(MissingSide::Actual)));
                    }
                    (Some(e), true) => {
                        if let Some(a) = act.get_mut(&key) {
                            diff(e, a, trim_uncovered, url, &child, sink);
                        }
                    }
                    (None, false) => {}
                }
            }
        }
        (exp, act) => sink(mismatch(url, path, Some(exp), Some(&*act), None)),
    }
}

fn mismatch(
    url: &str,
    path: &str,
    expected: Option<&Value>,
    actual: Option<&Value>,
    missed_key_on: Option<MissingSide>,
) -> DiffEvent {
    DiffEvent {
        path: path.to_string(),
        url: url.to_string(),
        expected: TypedValue::of(expected),
        actual: TypedValue::of(actual),
        missed_key_on,
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn type_name(value: Option<&Value>) -> &'static str {
    match value {
        None => "undefined",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "boolean",
        Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Array(_)) => "array",
        Some(Value::Object(_)) => "object",
    }
}
