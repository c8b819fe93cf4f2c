//! Application state management
//!
//! Immutable values built once at startup and shared by every request.

use crate::auth::{JwtDecoder, RouteAuthorizationIndex};
use crate::config::{ConfigError, Settings};
use crate::gateway::{GatewayFilter, IdentityRewriter};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Connect timeout for upstream calls
const UPSTREAM_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Backend base URLs
#[derive(Debug, Clone)]
pub struct Upstreams {
    pub manage_user: Url,
    pub event_management: Url,
}

/// Application state shared across all handlers
#[derive(Debug)]
pub struct AppState {
    /// Authentication and authorization gate
    pub gate: Arc<GatewayFilter>,

    /// Pooled HTTP client for forwarding
    pub http: reqwest::Client,

    pub upstreams: Upstreams,
}

impl AppState {
    /// Build the gate, client and upstream table from loaded settings
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let index = RouteAuthorizationIndex::new(settings.routes.clone())?;
        let rewriter = IdentityRewriter::new(
            settings.identity.sensitive_paths.clone(),
            settings.identity.param.clone(),
        );
        let gate = GatewayFilter::new(JwtDecoder::from_secret(&settings.jwt.secret), index, rewriter);

        let http = reqwest::Client::builder()
            .connect_timeout(UPSTREAM_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ConfigError::InvalidValue(format!("http client: {}", e)))?;

        Ok(Self {
            gate: Arc::new(gate),
            http,
            upstreams: Upstreams {
                manage_user: settings.upstreams.manage_user_url()?,
                event_management: settings.upstreams.event_management_url()?,
            },
        })
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::RouteRule;

    #[test]
    fn test_state_from_settings() {
        let mut settings = Settings::default();
        settings.jwt.secret = "x".to_string();
        settings.routes = vec![RouteRule::new("/manage/**", ["ROLE_ADMIN"])];

        let state = AppState::from_settings(&settings).unwrap();
        assert_eq!(state.gate.index().rules().len(), 1);
        assert_eq!(state.upstreams.manage_user.port(), Some(8081));
    }

    #[test]
    fn test_bad_rule_fails_startup() {
        let mut settings = Settings::default();
        settings.jwt.secret = "x".to_string();
        settings.routes = vec![RouteRule::new("/manage/{id", ["ROLE_ADMIN"])];

        let err = AppState::from_settings(&settings).unwrap_err();
        assert!(matches!(err, ConfigError::Pattern(_)));
    }
}
