//! Error handling module
//!
//! Defines the error taxonomy returned by every client call

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Discriminant of an API error, keyed by the `meta.code` the service reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApiErrorKind {
    /// 400
    BadRequest,
    /// 401
    Unauthorized,
    /// 404
    NotFound,
    /// 405
    MethodNotAllowed,
    /// 500
    InternalServerError,
    /// 502
    BadGateway,
    /// 503
    ServiceUnavailable,
    /// 504
    GatewayTimeout,
    /// Any other code
    Generic,
}

impl ApiErrorKind {
    /// Map a reported status code to its kind
    pub fn from_code(code: i64) -> Self {
        match code {
            400 => ApiErrorKind::BadRequest,
            401 => ApiErrorKind::Unauthorized,
            404 => ApiErrorKind::NotFound,
            405 => ApiErrorKind::MethodNotAllowed,
            500 => ApiErrorKind::InternalServerError,
            502 => ApiErrorKind::BadGateway,
            503 => ApiErrorKind::ServiceUnavailable,
            504 => ApiErrorKind::GatewayTimeout,
            _ => ApiErrorKind::Generic,
        }
    }

    /// Get kind name string
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiErrorKind::BadRequest => "bad_request",
            ApiErrorKind::Unauthorized => "unauthorized",
            ApiErrorKind::NotFound => "not_found",
            ApiErrorKind::MethodNotAllowed => "method_not_allowed",
            ApiErrorKind::InternalServerError => "internal_server_error",
            ApiErrorKind::BadGateway => "bad_gateway",
            ApiErrorKind::ServiceUnavailable => "service_unavailable",
            ApiErrorKind::GatewayTimeout => "gateway_timeout",
            ApiErrorKind::Generic => "error",
        }
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error the remote API reported through the envelope `meta` object
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("Foursquare API error ({kind}, code {code}): {}", .detail.as_deref().unwrap_or("no detail"))]
pub struct ApiError {
    /// Kind derived from `code`
    pub kind: ApiErrorKind,
    /// `meta.code`
    pub code: i64,
    /// `meta.errorType`
    #[serde(rename = "type")]
    pub error_type: Option<String>,
    /// `meta.errorDetail`
    pub detail: Option<String>,
}

impl ApiError {
    /// Build an error from the fields of an envelope `meta` object
    pub fn new(code: i64, error_type: Option<String>, detail: Option<String>) -> Self {
        Self {
            kind: ApiErrorKind::from_code(code),
            code,
            error_type,
            detail,
        }
    }

    /// Whether the error is an authentication failure
    pub fn is_unauthorized(&self) -> bool {
        self.kind == ApiErrorKind::Unauthorized
    }

    /// Whether the service reported a 5xx condition
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.code)
    }
}

/// Failure to obtain a classifiable response from the remote
#[derive(Error, Debug)]
pub enum TransportError {
    /// HTTP client error (connect, TLS, timeout, body read)
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote answered with a non-success status and no envelope; `body` is kept whole
    #[error("Unexpected HTTP status {status} ({} byte body)", body.len())]
    UnexpectedStatus { status: u16, body: String },

    /// The transport raised an error but still carried the response
    #[error("Transport rejected request with HTTP {status}")]
    WithResponse { status: u16, body: String },

    /// Any other transport failure
    #[error("Transport failure: {0}")]
    Other(String),
}

impl TransportError {
    /// Whether the failure was a client-side timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Http(e) if e.is_timeout())
    }
}

/// Malformed or unexpectedly shaped JSON
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Body is not valid JSON
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Top level of the body is not an object
    #[error("Expected a JSON object at the top level, found {0}")]
    NotAnObject(&'static str),

    /// A member the caller required is absent
    #[error("Missing member '{0}'")]
    MissingMember(String),

    /// A member could not be converted into the requested type
    #[error("Cannot deserialize '{path}': {message}")]
    Shape { path: String, message: String },
}

/// Application error types
#[derive(Error, Debug)]
pub enum Error {
    /// No response was obtained
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The remote explicitly rejected the request
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Response body could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Invalid or unknown configuration option
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// The API error, when the remote rejected the request
    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            Error::Api(e) => Some(e),
            _ => None,
        }
    }

    /// The API error kind, when the remote rejected the request
    pub fn api_kind(&self) -> Option<ApiErrorKind> {
        self.as_api().map(|e| e.kind)
    }

    /// Get error category string
    pub fn category(&self) -> &'static str {
        match self {
            Error::Transport(_) => "transport_error",
            Error::Api(_) => "api_error",
            Error::Decode(_) => "decode_error",
            Error::Config(_) => "configuration_error",
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(TransportError::Http(e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decode(DecodeError::Json(e))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error context extension trait
pub trait ErrorContext<T> {
    /// Add decode error context
    fn decode_context(self, path: &str) -> Result<T>;

    /// Add configuration error context
    fn config_context(self, message: &str) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn decode_context(self, path: &str) -> Result<T> {
        self.map_err(|e| {
            Error::Decode(DecodeError::Shape {
                path: path.to_string(),
                message: e.to_string(),
            })
        })
    }

    fn config_context(self, message: &str) -> Result<T> {
        self.map_err(|e| Error::Config(format!("{}: {}", message, e)))
    }
}
