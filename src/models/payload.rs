//! Decoded response payload
//!
//! A thin wrapper over `serde_json::Value` with member, index and dotted
//! path access, plus typed extraction into caller structs

use super::envelope::json_type_name;
use crate::utils::error::{DecodeError, Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::ops::{Deref, Index};

/// The `response` member of a successful envelope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(Value);

impl Payload {
    /// Member of an object payload
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Element of an array payload
    pub fn at(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// Follow a dotted path such as `venues.0.name`
    ///
    /// Numeric segments index into arrays; every other segment is an object
    /// key. Returns `None` as soon as a segment does not resolve.
    pub fn path(&self, path: &str) -> Option<&Value> {
        if path.is_empty() {
            return Some(&self.0);
        }

        path.split('.').try_fold(&self.0, |node, segment| match node {
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            Value::Object(map) => map.get(segment),
            _ => None,
        })
    }

    /// String at a dotted path
    pub fn str_at(&self, path: &str) -> Option<&str> {
        self.path(path).and_then(Value::as_str)
    }

    /// Integer at a dotted path
    pub fn i64_at(&self, path: &str) -> Option<i64> {
        self.path(path).and_then(Value::as_i64)
    }

    /// Float at a dotted path
    pub fn f64_at(&self, path: &str) -> Option<f64> {
        self.path(path).and_then(Value::as_f64)
    }

    /// Boolean at a dotted path
    pub fn bool_at(&self, path: &str) -> Option<bool> {
        self.path(path).and_then(Value::as_bool)
    }

    /// Array at a dotted path
    pub fn array_at(&self, path: &str) -> Option<&Vec<Value>> {
        self.path(path).and_then(Value::as_array)
    }

    /// Number of members or elements; scalars have length 0
    pub fn len(&self) -> usize {
        match &self.0 {
            Value::Array(items) => items.len(),
            Value::Object(map) => map.len(),
            _ => 0,
        }
    }

    /// Whether the payload has no members or elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Move a member out as its own payload
    ///
    /// This is how endpoint wrappers unwrap their field, e.g. `take("venue")`
    /// on the payload of `venues/{id}`.
    pub fn take(self, key: &str) -> Result<Payload> {
        match self.0 {
            Value::Object(mut map) => map
                .remove(key)
                .map(Payload)
                .ok_or_else(|| Error::Decode(DecodeError::MissingMember(key.to_string()))),
            other => Err(Error::Decode(DecodeError::NotAnObject(json_type_name(&other)))),
        }
    }

    /// Deserialize the whole payload into a caller type
    pub fn deserialize<T: DeserializeOwned>(self) -> Result<T> {
        serde_path_to_error::deserialize(self.0).map_err(|e| shape_error("", e))
    }

    /// Deserialize one member into a caller type
    pub fn field<T: DeserializeOwned>(self, key: &str) -> Result<T> {
        let member = self.take(key)?;
        serde_path_to_error::deserialize(member.0).map_err(|e| shape_error(key, e))
    }

    /// Borrow the underlying JSON value
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Unwrap into the underlying JSON value
    pub fn into_value(self) -> Value {
        self.0
    }
}

fn shape_error(prefix: &str, e: serde_path_to_error::Error<serde_json::Error>) -> Error {
    let inner = e.path().to_string();
    let path = match inner.as_str() {
        "." if prefix.is_empty() => inner.clone(),
        "." => prefix.to_string(),
        _ if prefix.is_empty() || inner.starts_with('[') => format!("{}{}", prefix, inner),
        _ => format!("{}.{}", prefix, inner),
    };
    Error::Decode(DecodeError::Shape {
        path,
        message: e.into_inner().to_string(),
    })
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload(value)
    }
}

impl From<Payload> for Value {
    fn from(payload: Payload) -> Self {
        payload.0
    }
}

impl Deref for Payload {
    type Target = Value;

    fn deref(&self) -> &Value {
        &self.0
    }
}

impl Index<&str> for Payload {
    type Output = Value;

    /// Missing members index to `null`
    fn index(&self, key: &str) -> &Value {
        &self.0[key]
    }
}

impl Index<usize> for Payload {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        &self.0[index]
    }
}
