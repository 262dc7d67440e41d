//! Request engine
//!
//! Builds authenticated request URLs, runs them through the transport, and
//! turns the response into a payload or a classified error

use super::transport::{HttpMethod, HttpRequest, HttpResponse, Transport};
use crate::config::Configuration;
use crate::models::{Envelope, Payload};
use crate::utils::error::{Error, Result, TransportError};
use crate::utils::logging::{redact_url, truncate_body, MAX_LOGGED_BODY};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::sync::Arc;
use tracing::{debug, debug_span, warn, Instrument};
use uuid::Uuid;

/// Query parameter carrying the user access token
pub const OAUTH_TOKEN_PARAM: &str = "oauth_token";

/// Query parameter carrying the API version date
pub const VERSION_PARAM: &str = "v";

/// Characters left as-is in the request path: unreserved, sub-delims, `:`, `@` and `/`
const PATH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/')
    .remove(b':')
    .remove(b'@')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=');

/// Characters left as-is in query keys and values; `,` stays readable in `ll`
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b',');

/// One API call, built per request and never persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub method: HttpMethod,
    pub path: String,
    /// Query parameters in insertion order; duplicates are kept
    pub params: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    /// Return the body untouched instead of decoding it
    pub raw: bool,
}

impl RequestDescriptor {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: Vec::new(),
            headers: Vec::new(),
            raw: false,
        }
    }

    /// Append one query parameter
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    /// Append query parameters
    pub fn params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Append one request header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn raw(mut self, raw: bool) -> Self {
        self.raw = raw;
        self
    }
}

/// Result of a successful call
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Undecoded body, for raw requests
    Raw(String),
    /// The `response` member of the envelope
    Payload(Payload),
}

impl Outcome {
    /// The decoded payload, decoding a raw body if necessary
    pub fn into_payload(self) -> Result<Payload> {
        match self {
            Outcome::Payload(payload) => Ok(payload),
            Outcome::Raw(body) => Ok(crate::models::decode(&body)?),
        }
    }

    /// The body as text; decoded payloads are serialized back to JSON
    pub fn into_raw(self) -> Result<String> {
        match self {
            Outcome::Raw(body) => Ok(body),
            Outcome::Payload(payload) => Ok(serde_json::to_string(&payload)?),
        }
    }
}

/// Authentication (and version) parameters appended to every request
///
/// An access token is sent alone as `oauth_token`; without one the
/// application credentials are sent instead.
pub fn authentication_params(config: &Configuration) -> Vec<(String, String)> {
    let mut params = Vec::new();

    match config.access_token.as_deref() {
        Some(token) if !token.is_empty() => {
            params.push((OAUTH_TOKEN_PARAM.to_string(), token.to_string()));
        }
        _ => {
            if let Some(client_id) = &config.client_id {
                params.push(("client_id".to_string(), client_id.clone()));
            }
            if let Some(client_secret) = &config.client_secret {
                params.push(("client_secret".to_string(), client_secret.clone()));
            }
        }
    }

    if let Some(version) = &config.api_version {
        params.push((VERSION_PARAM.to_string(), version.clone()));
    }

    params
}

/// Merge caller parameters with the authentication parameters
///
/// Caller keys keep their order and multiplicity, except keys the
/// authentication parameters set, which are replaced.
pub fn merge_params(
    mut params: Vec<(String, String)>,
    auth: Vec<(String, String)>,
) -> Vec<(String, String)> {
    params.retain(|(key, _)| !auth.iter().any(|(auth_key, _)| auth_key == key));
    params.extend(auth);
    params
}

/// Percent-encode a request path, keeping `/` separators
pub fn encode_path(path: &str) -> String {
    utf8_percent_encode(path.trim_start_matches('/'), PATH_ENCODE_SET).to_string()
}

/// Serialize parameters as `k1=v1&k2=v2` in order
pub fn encode_query(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                utf8_percent_encode(key, QUERY_ENCODE_SET),
                utf8_percent_encode(value, QUERY_ENCODE_SET)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Absolute URL for a path and its (already merged) parameters
pub fn build_url(endpoint: &str, path: &str, params: &[(String, String)]) -> String {
    let base = format!("{}/{}", endpoint.trim_end_matches('/'), encode_path(path));
    if params.is_empty() {
        base
    } else {
        format!("{}?{}", base, encode_query(params))
    }
}

/// Turn a failed response into an error
///
/// A body with a readable `meta` becomes an `ApiError` keyed by
/// `meta.code`; anything else is a transport failure.
pub fn classify(status: u16, body: &str) -> Error {
    match Envelope::parse(body) {
        Ok(envelope) => Error::Api(envelope.meta.into_api_error()),
        Err(e) => {
            debug!(
                "HTTP {} body carries no envelope ({}): {}",
                status,
                e,
                truncate_body(body, MAX_LOGGED_BODY)
            );
            Error::Transport(TransportError::UnexpectedStatus {
                status,
                body: body.to_string(),
            })
        }
    }
}

/// Turn a transport response into the call outcome
pub fn handle_response(response: HttpResponse, raw: bool) -> Result<Outcome> {
    if !response.is_success() {
        return Err(classify(response.status, &response.body));
    }

    if raw {
        return Ok(Outcome::Raw(response.body));
    }

    let envelope = Envelope::parse(&response.body)?;
    if envelope.meta.is_error() {
        return Err(Error::Api(envelope.meta.into_api_error()));
    }

    Ok(Outcome::Payload(envelope.into_payload()?))
}

/// Request engine bound to one configuration and one transport
#[derive(Clone)]
pub struct RequestEngine {
    config: Configuration,
    transport: Arc<dyn Transport>,
}

impl RequestEngine {
    pub fn new(config: Configuration, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Build the HTTP request for a descriptor without sending it
    pub fn build(&self, descriptor: &RequestDescriptor) -> HttpRequest {
        let params = merge_params(descriptor.params.clone(), authentication_params(&self.config));

        let mut headers: Vec<(String, String)> = descriptor
            .headers
            .iter()
            .filter(|(name, _)| !name.eq_ignore_ascii_case("user-agent"))
            .cloned()
            .collect();
        headers.push(("User-Agent".to_string(), self.config.user_agent.clone()));

        HttpRequest {
            method: descriptor.method,
            url: build_url(&self.config.endpoint, &descriptor.path, &params),
            headers,
        }
    }

    /// Perform one round trip
    pub async fn execute(&self, descriptor: RequestDescriptor) -> Result<Outcome> {
        let request = self.build(&descriptor);
        let span = debug_span!(
            "api_request",
            request_id = %Uuid::new_v4(),
            method = %request.method,
            path = %descriptor.path,
        );

        async move {
            debug!("Sending request: {} {}", request.method, redact_url(&request.url));

            let response = match self.transport.send(request).await {
                Ok(response) => response,
                Err(TransportError::WithResponse { status, body }) => {
                    warn!("Transport rejected request with HTTP {}", status);
                    return Err(classify(status, &body));
                }
                Err(e) => {
                    warn!("Transport failure: {}", e);
                    return Err(Error::Transport(e));
                }
            };

            debug!(
                "Received HTTP {}: {}",
                response.status,
                truncate_body(&response.body, MAX_LOGGED_BODY)
            );

            let outcome = handle_response(response, descriptor.raw);
            if let Err(e) = &outcome {
                debug!("Request failed: {}", e);
            }
            outcome
        }
        .instrument(span)
        .await
    }
}

impl std::fmt::Debug for RequestEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestEngine")
            .field("endpoint", &self.config.endpoint)
            .finish_non_exhaustive()
    }
}
