//! Settings for the backend endpoint and the delivery policy.
//!
//! Sources are layered, later ones overriding earlier ones:
//! compiled defaults, then a TOML file, then `BINWATCH_` environment variables
//! (`BINWATCH_ENDPOINT__HOST=10.0.0.5`, `BINWATCH_DELIVERY__MAX_ATTEMPTS=3`).

use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File, Map};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::ports::RequestConfig;

/// Config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_NAME: &str = "binwatch";

const ENV_PREFIX: &str = "BINWATCH";

#[derive(thiserror::Error, Debug)]
/// Errors raised while loading or validating settings.
pub enum ConfigError {
    /// A source could not be read or deserialized.
    #[error("Failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
    /// A value is present but unusable.
    #[error("Invalid setting `{field}`: {reason}")]
    Invalid {
        /// Dotted key of the offending setting.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Where status documents are posted.
pub struct EndpointSettings {
    /// `http` or `https`.
    pub scheme: String,
    /// Backend host name or address.
    pub host: String,
    /// Backend port.
    pub port: u16,
    /// Path of the stats resource.
    pub path: String,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            scheme: "http".to_owned(),
            host: "192.168.0.115".to_owned(),
            port: 5000,
            path: "/api/current-stats".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// How hard the reporter tries before giving up on a reading.
pub struct DeliverySettings {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u32,
    /// Attempts per reading. `1` means no retry.
    pub max_attempts: u32,
    /// Delay before the first retry; doubled for every further retry.
    pub retry_backoff_ms: u32,
    /// Treat non-2xx responses as failed deliveries.
    pub reject_http_errors: bool,
    /// `User-Agent` sent with every request.
    pub user_agent: String,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_attempts: 1,
            retry_backoff_ms: 500,
            reject_http_errors: false,
            user_agent: "binwatch/0.1".to_owned(),
        }
    }
}

impl DeliverySettings {
    /// Per-request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.timeout_ms))
    }

    /// Base retry delay.
    #[must_use]
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(u64::from(self.retry_backoff_ms))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Complete reporter settings.
pub struct Settings {
    /// Backend endpoint.
    pub endpoint: EndpointSettings,
    /// Delivery policy.
    pub delivery: DeliverySettings,
}

impl Settings {
    /// Load settings from defaults, the config file and the process environment.
    ///
    /// With `path = None` the optional `binwatch.toml` in the working directory is used;
    /// an explicit path must exist.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when a source is unreadable or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, None)
    }

    /// Like [`Settings::load`], reading environment variables from `env` instead of the
    /// process environment when given.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when a source is unreadable or validation fails.
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let environment = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .source(env);

        let settings: Self = Config::builder()
            .add_source(Config::try_from(&Self::default())?)
            .add_source(file)
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Check every value the reporter relies on.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = &self.endpoint;
        if !matches!(endpoint.scheme.as_str(), "http" | "https") {
            return Err(invalid("endpoint.scheme", "must be http or https"));
        }
        if endpoint.host.trim().is_empty() {
            return Err(invalid("endpoint.host", "must not be empty"));
        }
        if endpoint.port == 0 {
            return Err(invalid("endpoint.port", "must not be zero"));
        }
        if !endpoint.path.starts_with('/') {
            return Err(invalid("endpoint.path", "must start with '/'"));
        }
        if self.delivery.max_attempts == 0 {
            return Err(invalid("delivery.max_attempts", "must be at least 1"));
        }
        if self.delivery.timeout_ms == 0 {
            return Err(invalid("delivery.timeout_ms", "must be positive"));
        }
        self.endpoint_url().map(|_| ())
    }

    /// Resolved backend URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the endpoint parts do not form a URL.
    pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
        let EndpointSettings {
            scheme,
            host,
            port,
            path,
        } = &self.endpoint;
        Url::parse(&format!("{scheme}://{}:{port}{path}", host.trim()))
            .map_err(|err| invalid("endpoint", err.to_string()))
    }

    /// Request configuration derived from these settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the endpoint URL is malformed.
    pub fn request_config(&self) -> Result<RequestConfig, ConfigError> {
        Ok(RequestConfig::post(
            self.endpoint_url()?,
            self.delivery.timeout(),
        ))
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}
