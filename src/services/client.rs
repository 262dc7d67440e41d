//! Foursquare API client
//!
//! The facade endpoint wrappers are written against: four HTTP primitives
//! over a private configuration snapshot

use super::request::{Outcome, RequestDescriptor, RequestEngine};
use super::transport::{HttpMethod, ReqwestTransport, Transport};
use crate::config::{settings, Configuration};
use crate::models::Payload;
use crate::utils::error::Result;
use std::sync::Arc;
use tracing::debug;

/// Foursquare v2 API client
#[derive(Debug, Clone)]
pub struct Client {
    engine: RequestEngine,
}

impl Client {
    /// Create a client from the shared default configuration
    pub fn new() -> Result<Self> {
        Self::from_config(settings::snapshot())
    }

    /// Create a client whose options are merged over the shared defaults
    ///
    /// The shared defaults are not modified. Unknown option names are
    /// rejected.
    pub fn with_options<I, K, V>(overrides: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Option<String>>,
    {
        let config = settings::snapshot().apply_overrides(overrides)?;
        Self::from_config(config)
    }

    /// Create a client from an explicit configuration using the reqwest transport
    pub fn from_config(config: Configuration) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a client with a caller-supplied transport
    pub fn with_transport(config: Configuration, transport: Arc<dyn Transport>) -> Self {
        debug!("Creating API client for {}", config.endpoint);
        Self {
            engine: RequestEngine::new(config, transport),
        }
    }

    /// This client's configuration
    pub fn config(&self) -> &Configuration {
        self.engine.config()
    }

    /// Options of this client's configuration
    pub fn options(&self) -> settings::Options {
        self.engine.config().options()
    }

    /// Perform a request described by `descriptor`
    pub async fn execute(&self, descriptor: RequestDescriptor) -> Result<Outcome> {
        self.engine.execute(descriptor).await
    }

    async fn call<I, K, V>(&self, method: HttpMethod, path: &str, params: I, raw: bool) -> Result<Outcome>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let descriptor = RequestDescriptor::new(method, path).params(params).raw(raw);
        self.execute(descriptor).await
    }

    /// Perform an HTTP GET request
    pub async fn get<I, K, V>(&self, path: &str, params: I) -> Result<Payload>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.call(HttpMethod::Get, path, params, false).await?.into_payload()
    }

    /// Perform an HTTP POST request
    pub async fn post<I, K, V>(&self, path: &str, params: I) -> Result<Payload>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.call(HttpMethod::Post, path, params, false).await?.into_payload()
    }

    /// Perform an HTTP PUT request
    pub async fn put<I, K, V>(&self, path: &str, params: I) -> Result<Payload>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.call(HttpMethod::Put, path, params, false).await?.into_payload()
    }

    /// Perform an HTTP DELETE request
    pub async fn delete<I, K, V>(&self, path: &str, params: I) -> Result<Payload>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.call(HttpMethod::Delete, path, params, false).await?.into_payload()
    }

    /// Perform an HTTP GET request and return the undecoded body
    pub async fn get_raw<I, K, V>(&self, path: &str, params: I) -> Result<String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.call(HttpMethod::Get, path, params, true).await?.into_raw()
    }

    /// Perform an HTTP POST request and return the undecoded body
    pub async fn post_raw<I, K, V>(&self, path: &str, params: I) -> Result<String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.call(HttpMethod::Post, path, params, true).await?.into_raw()
    }

    /// Perform an HTTP PUT request and return the undecoded body
    pub async fn put_raw<I, K, V>(&self, path: &str, params: I) -> Result<String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.call(HttpMethod::Put, path, params, true).await?.into_raw()
    }

    /// Perform an HTTP DELETE request and return the undecoded body
    pub async fn delete_raw<I, K, V>(&self, path: &str, params: I) -> Result<String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.call(HttpMethod::Delete, path, params, true).await?.into_raw()
    }
}

/// A client built from the shared default configuration
///
/// Equivalent to [`Client::new`]; each call takes a fresh snapshot, so
/// changes made through `configure` apply to clients created afterwards.
pub fn client() -> Result<Client> {
    Client::new()
}

/// No query parameters
pub const NO_PARAMS: [(&str, &str); 0] = [];
