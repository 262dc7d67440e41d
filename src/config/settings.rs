//! Connection configuration
//!
//! Defines the configuration record, its defaults, and the process-wide
//! default instance that per-client configurations are merged over

use crate::utils::error::{Error, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockWriteGuard};
use tracing::{debug, warn};

/// By default, don't set a user access token
pub const DEFAULT_ACCESS_TOKEN: Option<&str> = None;

/// The endpoint used to authorize a user if none is set
pub const DEFAULT_AUTHORIZATION_ENDPOINT: &str = "https://foursquare.com/oauth2/authenticate";

/// By default, don't set a client id
pub const DEFAULT_CLIENT_ID: Option<&str> = None;

/// By default, don't set a client secret
pub const DEFAULT_CLIENT_SECRET: Option<&str> = None;

/// The endpoint used to connect if none is set
pub const DEFAULT_ENDPOINT: &str = "https://api.foursquare.com/v2";

/// By default, don't use a proxy server
pub const DEFAULT_PROXY: Option<&str> = None;

/// By default, don't pin an API version date
pub const DEFAULT_API_VERSION: Option<&str> = None;

/// Prefix of the environment variables read by [`Configuration::from_env`]
pub const ENV_PREFIX: &str = "SKITTLES_";

/// The user agent sent to the API endpoint if none is set
pub fn default_user_agent() -> String {
    format!("{} v{}", crate::NAME, crate::VERSION)
}

/// A configuration key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OptionKey {
    AccessToken,
    ApiVersion,
    AuthorizationEndpoint,
    ClientId,
    ClientSecret,
    Endpoint,
    Proxy,
    UserAgent,
}

impl OptionKey {
    /// Every valid key
    pub const ALL: [OptionKey; 8] = [
        OptionKey::AccessToken,
        OptionKey::ApiVersion,
        OptionKey::AuthorizationEndpoint,
        OptionKey::ClientId,
        OptionKey::ClientSecret,
        OptionKey::Endpoint,
        OptionKey::Proxy,
        OptionKey::UserAgent,
    ];

    /// Option name as used in override maps
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionKey::AccessToken => "access_token",
            OptionKey::ApiVersion => "api_version",
            OptionKey::AuthorizationEndpoint => "authorization_endpoint",
            OptionKey::ClientId => "client_id",
            OptionKey::ClientSecret => "client_secret",
            OptionKey::Endpoint => "endpoint",
            OptionKey::Proxy => "proxy",
            OptionKey::UserAgent => "user_agent",
        }
    }

    /// Parse an option name, rejecting unknown keys
    pub fn parse(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == name)
            .ok_or_else(|| Error::Config(format!("Unknown configuration option '{}'", name)))
    }

    fn env_var(&self) -> String {
        format!("{}{}", ENV_PREFIX, self.as_str().to_uppercase())
    }
}

/// Immutable snapshot of every option and its current value
pub type Options = BTreeMap<&'static str, Option<String>>;

/// Connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Configuration {
    /// OAuth2 access token of the acting user
    #[serde(default)]
    pub access_token: Option<String>,
    /// API version date (`YYYYMMDD`) sent as the `v` query parameter
    #[serde(default)]
    pub api_version: Option<String>,
    /// OAuth2 authorization endpoint
    #[serde(default = "default_authorization_endpoint")]
    pub authorization_endpoint: String,
    /// Application client id
    #[serde(default)]
    pub client_id: Option<String>,
    /// Application client secret
    #[serde(default)]
    pub client_secret: Option<String>,
    /// API base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Proxy server URL
    #[serde(default)]
    pub proxy: Option<String>,
    /// User-Agent header value
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_authorization_endpoint() -> String {
    DEFAULT_AUTHORIZATION_ENDPOINT.to_string()
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            access_token: DEFAULT_ACCESS_TOKEN.map(str::to_string),
            api_version: DEFAULT_API_VERSION.map(str::to_string),
            authorization_endpoint: default_authorization_endpoint(),
            client_id: DEFAULT_CLIENT_ID.map(str::to_string),
            client_secret: DEFAULT_CLIENT_SECRET.map(str::to_string),
            endpoint: default_endpoint(),
            proxy: DEFAULT_PROXY.map(str::to_string),
            user_agent: default_user_agent(),
        }
    }
}

impl Configuration {
    /// Reset all options to their defaults
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Snapshot of all options and their values
    pub fn options(&self) -> Options {
        OptionKey::ALL
            .into_iter()
            .map(|key| (key.as_str(), self.value(key)))
            .collect()
    }

    /// Current value of one option
    pub fn value(&self, key: OptionKey) -> Option<String> {
        match key {
            OptionKey::AccessToken => self.access_token.clone(),
            OptionKey::ApiVersion => self.api_version.clone(),
            OptionKey::AuthorizationEndpoint => Some(self.authorization_endpoint.clone()),
            OptionKey::ClientId => self.client_id.clone(),
            OptionKey::ClientSecret => self.client_secret.clone(),
            OptionKey::Endpoint => Some(self.endpoint.clone()),
            OptionKey::Proxy => self.proxy.clone(),
            OptionKey::UserAgent => Some(self.user_agent.clone()),
        }
    }

    /// Set one option; `None` restores the default for required options
    pub fn set(&mut self, key: OptionKey, value: Option<String>) {
        match key {
            OptionKey::AccessToken => self.access_token = value,
            OptionKey::ApiVersion => self.api_version = value,
            OptionKey::AuthorizationEndpoint => {
                self.authorization_endpoint = value.unwrap_or_else(default_authorization_endpoint)
            }
            OptionKey::ClientId => self.client_id = value,
            OptionKey::ClientSecret => self.client_secret = value,
            OptionKey::Endpoint => self.endpoint = value.unwrap_or_else(default_endpoint),
            OptionKey::Proxy => self.proxy = value,
            OptionKey::UserAgent => self.user_agent = value.unwrap_or_else(default_user_agent),
        }
    }

    /// Merge overrides over this configuration, producing a new one
    ///
    /// Unknown keys and values that break the configuration invariants are
    /// rejected; `self` is never modified.
    pub fn apply_overrides<I, K, V>(&self, overrides: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Option<String>>,
    {
        let mut merged = self.clone();
        for (name, value) in overrides {
            let key = OptionKey::parse(name.as_ref())?;
            merged.set(key, value.into());
        }
        merged.validate()?;
        Ok(merged)
    }

    /// Whether an access token is available
    pub fn is_authenticated(&self) -> bool {
        self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Validate configuration invariants
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(Error::Config("Endpoint cannot be empty".to_string()));
        }

        if !self.endpoint.starts_with("http") {
            return Err(Error::Config(format!(
                "Invalid endpoint format, should start with 'http': {}",
                self.endpoint
            )));
        }

        if self.user_agent.trim().is_empty() {
            return Err(Error::Config("User agent cannot be empty".to_string()));
        }

        if let Some(version) = &self.api_version {
            if version.len() != 8 || !version.chars().all(|c| c.is_ascii_digit()) {
                return Err(Error::Config(format!(
                    "Invalid API version '{}', expected YYYYMMDD",
                    version
                )));
            }
        }

        Ok(())
    }

    /// Load configuration from `SKITTLES_*` environment variables
    ///
    /// A `.env` file in the working directory is read first if present.
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = Self::default();
        for key in OptionKey::ALL {
            if let Ok(value) = std::env::var(key.env_var()) {
                debug!("Configuration option {} read from environment", key.as_str());
                config.set(key, Some(value));
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Build the URL a user visits to authorize this application
    pub fn authorize_url(&self, redirect_uri: &str) -> Result<String> {
        let client_id = self
            .client_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::Config("client_id is required to build an authorization URL".to_string()))?;

        let query = crate::services::request::encode_query(&[
            ("client_id".to_string(), client_id.to_string()),
            ("response_type".to_string(), "code".to_string()),
            ("redirect_uri".to_string(), redirect_uri.to_string()),
        ]);

        Ok(format!("{}?{}", self.authorization_endpoint, query))
    }
}

/// Today's date formatted as an API version (`YYYYMMDD`)
pub fn api_version_today() -> String {
    chrono::Local::now().format("%Y%m%d").to_string()
}

// Process-wide default configuration
static DEFAULT_CONFIGURATION: Lazy<RwLock<Configuration>> =
    Lazy::new(|| RwLock::new(Configuration::default()));

fn write_defaults() -> RwLockWriteGuard<'static, Configuration> {
    DEFAULT_CONFIGURATION.write().unwrap_or_else(|poisoned| {
        warn!("Default configuration lock was poisoned, recovering");
        poisoned.into_inner()
    })
}

/// Copy of the shared default configuration
pub fn snapshot() -> Configuration {
    match DEFAULT_CONFIGURATION.read() {
        Ok(config) => config.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// Options of the shared default configuration
pub fn options() -> Options {
    snapshot().options()
}

/// Mutate the shared default configuration
///
/// The closure works on a copy and no lock is held while it runs, so it may
/// read the shared defaults or build clients. The copy is stored once the
/// closure returns. Clients already constructed keep their own copy and are
/// unaffected. Concurrent `configure` calls are last-writer-wins.
pub fn configure<F, R>(mutator: F) -> R
where
    F: FnOnce(&mut Configuration) -> R,
{
    let mut config = snapshot();
    let result = mutator(&mut config);
    *write_defaults() = config;
    result
}

/// Reset the shared default configuration
pub fn reset() {
    write_defaults().reset();
}
