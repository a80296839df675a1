//! Credentials and fetcher settings sourced from the environment.

use std::env;
use std::time::Duration;

pub const APP_ID_VAR: &str = "ADZUNA_APP_ID";
pub const API_KEY_VAR: &str = "ADZUNA_API_KEY";
pub const BASE_URL_VAR: &str = "ADZUNA_BASE_URL";
pub const COUNTRY_VAR: &str = "ADZUNA_COUNTRY";
pub const TIMEOUT_VAR: &str = "ADZUNA_TIMEOUT_SECS";

pub const DEFAULT_BASE_URL: &str = "https://api.adzuna.com/v1/api/jobs";
pub const DEFAULT_COUNTRY: &str = "gb";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("missing credential: set {0}")]
    MissingCredential(&'static str),

    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Opaque app id / key pair passed through to the provider as-is.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub app_id: String,
    pub api_key: String,
}

impl Credentials {
    pub fn new(app_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            api_key: api_key.into(),
        }
    }

    /// Reads `ADZUNA_APP_ID` and `ADZUNA_API_KEY`.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::resolve(env::var(APP_ID_VAR).ok(), env::var(API_KEY_VAR).ok())
    }

    /// Accepts credentials from any source (flags, env, a form). Blank values
    /// count as missing.
    pub fn resolve(
        app_id: Option<String>,
        api_key: Option<String>,
    ) -> Result<Self, ConfigurationError> {
        let present = |value: Option<String>, var| {
            value
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigurationError::MissingCredential(var))
        };
        Ok(Self::new(
            present(app_id, APP_ID_VAR)?,
            present(api_key, API_KEY_VAR)?,
        ))
    }
}

// Keep the key out of logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("api_key", &"***")
            .finish()
    }
}

/// Where and how the fetcher talks to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherConfig {
    pub base_url: String,
    /// Provider country code, e.g. `gb`. Also picks the salary currency symbol.
    pub country: String,
    pub timeout: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            country: DEFAULT_COUNTRY.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl FetcherConfig {
    /// Defaults overridden by `ADZUNA_BASE_URL`, `ADZUNA_COUNTRY` and
    /// `ADZUNA_TIMEOUT_SECS` when set.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&'static str) -> Option<String>,
    ) -> Result<Self, ConfigurationError> {
        let mut config = Self::default();
        let set = |var| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(base_url) = set(BASE_URL_VAR) {
            config.base_url = base_url;
        }
        if let Some(country) = set(COUNTRY_VAR) {
            config.country = country.to_lowercase();
        }
        if let Some(raw) = set(TIMEOUT_VAR) {
            let secs = raw
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or(ConfigurationError::Invalid {
                    var: TIMEOUT_VAR,
                    value: raw.clone(),
                })?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = country.into().to_lowercase();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
