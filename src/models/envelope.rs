//! Response envelope
//!
//! Every body the API returns is wrapped as `{"meta": {...}, "response": {...}}`

use super::payload::Payload;
use crate::utils::error::{ApiError, DecodeError};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// The `meta` member of an envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    /// HTTP-like status the service reports
    #[serde(deserialize_with = "code_from_number_or_string")]
    pub code: i64,
    /// Error type (present on failures)
    #[serde(rename = "errorType", default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Human readable error detail (present on failures)
    #[serde(rename = "errorDetail", default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl Meta {
    /// Whether the reported code signals a failure
    pub fn is_error(&self) -> bool {
        self.code >= 400
    }

    /// Convert into the matching API error
    pub fn into_api_error(self) -> ApiError {
        ApiError::new(self.code, self.error_type, self.error_detail)
    }
}

// The service has been seen sending `"code": "400"`; `400.0` is accepted too
fn code_from_number_or_string<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Code {
        Number(i64),
        Float(f64),
        Text(String),
    }

    match Code::deserialize(deserializer)? {
        Code::Number(n) => Ok(n),
        Code::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
        Code::Float(f) => Err(serde::de::Error::custom(format!("invalid meta code '{}'", f))),
        Code::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid meta code '{}'", s))),
    }
}

/// A decoded response envelope
#[derive(Debug, Clone)]
pub struct Envelope {
    pub meta: Meta,
    pub response: Option<Value>,
}

impl Envelope {
    /// Parse a body into an envelope; `response` may be absent
    pub fn parse(text: &str) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Split an already parsed body into an envelope
    pub fn from_value(value: Value) -> Result<Self, DecodeError> {
        let mut object = match value {
            Value::Object(map) => map,
            other => return Err(DecodeError::NotAnObject(json_type_name(&other))),
        };

        let meta = object
            .remove("meta")
            .ok_or_else(|| DecodeError::MissingMember("meta".to_string()))?;
        let meta: Meta = serde_path_to_error::deserialize(meta).map_err(|e| DecodeError::Shape {
            path: format!("meta.{}", e.path()),
            message: e.inner().to_string(),
        })?;

        Ok(Self {
            meta,
            response: object.remove("response"),
        })
    }

    /// The `response` member as a payload
    pub fn into_payload(self) -> Result<Payload, DecodeError> {
        self.response
            .map(Payload::from)
            .ok_or_else(|| DecodeError::MissingMember("response".to_string()))
    }
}

/// Parse a successful body and return its `response` member
pub fn decode(text: &str) -> Result<Payload, DecodeError> {
    Envelope::parse(text)?.into_payload()
}

/// Name of a JSON value's type, for error messages
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_venue() {
        let payload = decode(r#"{"meta":{"code":200},"response":{"venue":{"name":"X"}}}"#).unwrap();
        assert_eq!(payload.get("venue").and_then(|v| v.get("name")).and_then(|n| n.as_str()), Some("X"));
    }

    #[test]
    fn test_decode_rejects_non_object() {
        let err = decode("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, DecodeError::NotAnObject("array")));
    }

    #[test]
    fn test_decode_requires_meta() {
        let err = decode(r#"{"response":{}}"#).unwrap_err();
        assert!(matches!(err, DecodeError::MissingMember(ref m) if m == "meta"));
    }

    #[test]
    fn test_decode_requires_response() {
        let err = decode(r#"{"meta":{"code":200}}"#).unwrap_err();
        assert!(matches!(err, DecodeError::MissingMember(ref m) if m == "response"));
    }

    #[test]
    fn test_decode_invalid_json() {
        assert!(matches!(decode("not json").unwrap_err(), DecodeError::Json(_)));
    }

    #[test]
    fn test_meta_code_as_string() {
        let envelope = Envelope::parse(r#"{"meta":{"code":"404","errorType":"not_found"}}"#).unwrap();
        assert_eq!(envelope.meta.code, 404);
        assert!(envelope.meta.is_error());
        assert!(envelope.response.is_none());
    }

    #[test]
    fn test_meta_code_as_integral_float() {
        let envelope = Envelope::parse(r#"{"meta":{"code":400.0}}"#).unwrap();
        assert_eq!(envelope.meta.code, 400);

        let err = Envelope::parse(r#"{"meta":{"code":400.5}}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Shape { .. }));
    }

    #[test]
    fn test_meta_code_malformed() {
        let err = Envelope::parse(r#"{"meta":{"code":"teapot"}}"#).unwrap_err();
        match err {
            DecodeError::Shape { path, .. } => assert!(path.starts_with("meta")),
            other => panic!("Expected shape error, got {:?}", other),
        }
    }

    #[test]
    fn test_meta_into_api_error() {
        let envelope = Envelope::parse(
            r#"{"meta":{"code":400,"errorType":"param_error","errorDetail":"Must provide ll"},"response":{}}"#,
        )
        .unwrap();
        let err = envelope.meta.into_api_error();
        assert_eq!(err.code, 400);
        assert_eq!(err.error_type.as_deref(), Some("param_error"));
        assert_eq!(err.detail.as_deref(), Some("Must provide ll"));
    }
}
