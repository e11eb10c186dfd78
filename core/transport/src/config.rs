//! Client configuration for the helpdesk API.

use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

use deskbridge_common::{Error, Result};

use crate::retry::RetryConfig;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Environment variable holding the API root URL.
pub const ENV_BASE_URL: &str = "DESKBRIDGE_BASE_URL";
/// Environment variable holding the basic-auth username.
pub const ENV_USERNAME: &str = "DESKBRIDGE_USERNAME";
/// Environment variable holding the basic-auth password.
pub const ENV_PASSWORD: &str = "DESKBRIDGE_PASSWORD";
/// Environment variable holding an API token.
pub const ENV_TOKEN: &str = "DESKBRIDGE_TOKEN";

/// How requests authenticate against the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Auth {
    #[default]
    None,
    Basic {
        username: String,
        password: String,
    },
    Token {
        token: String,
    },
}

/// Connection settings for an [`HttpTransport`](crate::HttpTransport).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API root, e.g. `https://helpdesk.example.edu`.
    pub base_url: String,
    /// Credentials applied to every request.
    #[serde(default)]
    pub auth: Auth,
    /// Per-request timeout.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// User-Agent header value.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Backoff applied to rate-limited calls.
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    format!("deskbridge/{}", env!("CARGO_PKG_VERSION"))
}

impl ApiConfig {
    /// Create a configuration with defaults for everything but the base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth: Auth::None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: default_user_agent(),
            retry: RetryConfig::default(),
        }
    }

    /// Set credentials.
    pub fn with_auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }

    /// Set the rate-limit retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Load and validate a JSON configuration file.
    ///
    /// # Errors
    /// - I/O failure reading the file
    /// - Malformed JSON
    /// - Invalid base URL
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| Error::Serialization(format!("Invalid config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Build a configuration from `DESKBRIDGE_*` environment variables.
    ///
    /// A token takes precedence over a username/password pair.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let base_url = lookup(ENV_BASE_URL)
            .ok_or_else(|| Error::Config(format!("{} is not set", ENV_BASE_URL)))?;

        let auth = match (lookup(ENV_TOKEN), lookup(ENV_USERNAME), lookup(ENV_PASSWORD)) {
            (Some(token), _, _) => Auth::Token { token },
            (None, Some(username), Some(password)) => Auth::Basic { username, password },
            (None, Some(_), None) => {
                return Err(Error::Config(format!(
                    "{} is set but {} is not",
                    ENV_USERNAME, ENV_PASSWORD
                )))
            }
            _ => Auth::None,
        };

        let config = Self::new(base_url).with_auth(auth);
        config.validate()?;
        Ok(config)
    }

    /// Check the base URL parses and uses http(s).
    pub fn validate(&self) -> Result<()> {
        self.parsed_base_url().map(|_| ())
    }

    /// Parsed base URL.
    pub fn parsed_base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| Error::Config(format!("Invalid base URL '{}': {}", self.base_url, e)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(Error::Config(format!(
                "Unsupported URL scheme '{}' in base URL",
                other
            ))),
        }
    }
}
