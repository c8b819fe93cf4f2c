//! Application configuration module
//!
//! Loads settings once at startup: `.env`, then an optional config file,
//! then `GATEWAY__`-prefixed environment overrides.

use crate::auth::{PatternError, RouteRule};
use crate::gateway::rewrite::{DEFAULT_IDENTITY_PARAM, DEFAULT_SENSITIVE_PATHS};
use serde::Deserialize;
use std::net::Ipv4Addr;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Missing required configuration value: {0}")]
    MissingVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Invalid route rule: {0}")]
    Pattern(#[from] PatternError),
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: Ipv4Addr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Ipv4Addr::new(0, 0, 0, 0),
            port: 8080,
        }
    }
}

/// Credential verification settings
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    pub secret: String,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Backend base URLs
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub manage_user: String,
    pub event_management: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            manage_user: "http://localhost:8081".to_string(),
            event_management: "http://localhost:8082".to_string(),
        }
    }
}

impl UpstreamConfig {
    pub fn manage_user_url(&self) -> Result<Url, ConfigError> {
        parse_upstream("upstreams.manage_user", &self.manage_user)
    }

    pub fn event_management_url(&self) -> Result<Url, ConfigError> {
        parse_upstream("upstreams.event_management", &self.event_management)
    }
}

fn parse_upstream(key: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidValue(format!("{key}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::InvalidValue(format!(
            "{key}: unsupported scheme '{other}'"
        ))),
    }
}

/// Identity injection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub sensitive_paths: Vec<String>,
    pub param: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            sensitive_paths: DEFAULT_SENSITIVE_PATHS.iter().map(|p| p.to_string()).collect(),
            param: DEFAULT_IDENTITY_PARAM.to_string(),
        }
    }
}

/// Complete application settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    pub upstreams: UpstreamConfig,
    pub identity: IdentityConfig,
    /// Ordered route authorization rules
    pub routes: Vec<RouteRule>,
}

impl Settings {
    /// Load settings from the config file named by `GATEWAY_CONFIG`
    /// (default `gateway.*`) and the environment
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists (ignore errors if file not found)
        let _ = dotenvy::dotenv();

        let path = std::env::var("GATEWAY_CONFIG").unwrap_or_else(|_| "gateway".to_string());
        let mut settings = Self::from_source(config::File::with_name(&path).required(false))?;

        settings.jwt.secret =
            resolve_secret(&settings.jwt.secret, std::env::var("JWT_SECRET").ok())?;
        settings.validate()?;

        Ok(settings)
    }

    /// Build settings from one source plus `GATEWAY__` environment overrides
    pub fn from_source<S>(source: S) -> Result<Self, ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let settings = config::Config::builder()
            .add_source(source)
            .add_source(config::Environment::with_prefix("GATEWAY").separator("__"))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Check values that deserialization alone cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.trim().is_empty() {
            return Err(ConfigError::MissingVar("jwt.secret".to_string()));
        }
        if self.identity.param.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "identity.param must not be empty".to_string(),
            ));
        }
        self.upstreams.manage_user_url()?;
        self.upstreams.event_management_url()?;
        Ok(())
    }
}

/// The configured secret wins; `JWT_SECRET` fills in when it is blank
fn resolve_secret(configured: &str, env: Option<String>) -> Result<String, ConfigError> {
    if !configured.trim().is_empty() {
        return Ok(configured.to_string());
    }
    env.filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingVar("JWT_SECRET".to_string()))
}
