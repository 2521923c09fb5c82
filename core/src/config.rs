//! Client configuration.
//!
//! # Design
//! `ClientConfig` is plain data. It is loaded once by the process entry point
//! (`from_env`) and handed to `Client::new`, which freezes it behind an `Arc`
//! shared by every request. Nothing in the crate reads the environment on its
//! own.

use std::time::Duration;

use crate::auth::Credentials;

pub const DEFAULT_API_HOST: &str = "https://api.hubapi.com";

pub const ENV_API_HOST: &str = "HUBSPOT_API_HOST";
pub const ENV_API_KEY: &str = "HUBSPOT_API_KEY";
pub const ENV_OAUTH_TOKEN: &str = "HUBSPOT_OAUTH_TOKEN";

/// Bounds applied to every HTTP exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Whole round trip, from resolving the host to reading the last byte.
    pub total: Duration,
    /// Establishing the TCP connection.
    pub connect: Duration,
    /// Completing the TLS handshake.
    pub tls: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            total: Duration::from_secs(10),
            connect: Duration::from_secs(5),
            tls: Duration::from_secs(5),
        }
    }
}

/// Endpoint, credentials and timeouts for a `Client`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_host: String,
    pub api_key: Option<String>,
    pub oauth_token: Option<String>,
    pub timeouts: Timeouts,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_host: DEFAULT_API_HOST.to_string(),
            api_key: None,
            oauth_token: None,
            timeouts: Timeouts::default(),
        }
    }
}

impl ClientConfig {
    pub fn new(api_host: &str) -> Self {
        Self {
            api_host: api_host.to_string(),
            ..Self::default()
        }
    }

    /// Load `HUBSPOT_API_HOST`, `HUBSPOT_API_KEY` and `HUBSPOT_OAUTH_TOKEN`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable lookup. Empty values
    /// are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.is_empty());
        Self {
            api_host: get(ENV_API_HOST).unwrap_or_else(|| DEFAULT_API_HOST.to_string()),
            api_key: get(ENV_API_KEY),
            oauth_token: get(ENV_OAUTH_TOKEN),
            timeouts: Timeouts::default(),
        }
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }

    pub fn with_oauth_token(mut self, token: &str) -> Self {
        self.oauth_token = Some(token.to_string());
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// The single credential requests will carry. An API key wins over an
    /// OAuth token when both are set.
    pub fn credentials(&self) -> Credentials<'_> {
        if let Some(key) = non_empty(&self.api_key) {
            Credentials::ApiKey(key)
        } else if let Some(token) = non_empty(&self.oauth_token) {
            Credentials::OAuthToken(token)
        } else {
            Credentials::Anonymous
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
