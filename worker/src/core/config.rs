//! Worker configuration, resolved builder-call > environment variable >
//! built-in default — the same layering `AppConfig::load` uses in the
//! teacher repo, minus the CLI/file layers (out of scope here).

use std::env;

use super::constants::{
    DEFAULT_CONCURRENCY, DEFAULT_CONTROL_PLANE_TIMEOUT_SECS, DEFAULT_RETRY_COUNT,
    ENV_API_BASE_URL, ENV_API_KEY, ENV_ENDPOINT, ENV_OAUTH2_AUDIENCE, ENV_OAUTH2_CLIENT_ID,
    ENV_OAUTH2_CLIENT_SECRET, ENV_OAUTH2_SCOPES, ENV_OAUTH2_TOKEN_URL, ENV_TENANT_ID,
};

/// OAuth2 client-credentials configuration for the control-plane client.
///
/// Only the client-credentials grant is modeled; browser/authorization-code
/// flows are out of scope for this crate.
#[derive(Debug, Clone, Default)]
pub struct Oauth2Config {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub scopes: Vec<String>,
    pub audience: Option<String>,
}

impl Oauth2Config {
    /// Resolve from explicit fields, falling back to `GITHOOK_OAUTH2_*` env
    /// vars for any left empty. Returns `None` if no token URL is available
    /// from either source (OAuth2 is then simply unconfigured).
    pub fn resolve(explicit: Option<Oauth2Config>) -> Option<Oauth2Config> {
        let mut cfg = explicit.unwrap_or_default();
        if cfg.token_url.is_empty() {
            cfg.token_url = env::var(ENV_OAUTH2_TOKEN_URL).unwrap_or_default();
        }
        if cfg.client_id.is_empty() {
            cfg.client_id = env::var(ENV_OAUTH2_CLIENT_ID).unwrap_or_default();
        }
        if cfg.client_secret.is_empty() {
            cfg.client_secret = env::var(ENV_OAUTH2_CLIENT_SECRET).unwrap_or_default();
        }
        if cfg.scopes.is_empty()
            && let Ok(scopes) = env::var(ENV_OAUTH2_SCOPES)
        {
            cfg.scopes = scopes.split_whitespace().map(str::to_string).collect();
        }
        if cfg.audience.is_none() {
            cfg.audience = env::var(ENV_OAUTH2_AUDIENCE).ok();
        }
        if cfg.token_url.is_empty() {
            None
        } else {
            Some(cfg)
        }
    }
}

/// Builder-supplied overrides, prior to environment-variable and default
/// resolution. Every field mirrors a [`crate::WorkerBuilder`] setter.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub endpoint: Option<String>,
    pub api_base_url: Option<String>,
    pub api_key: Option<String>,
    pub oauth2: Option<Oauth2Config>,
    pub tenant_id: Option<String>,
    pub concurrency: Option<usize>,
    pub retry_count: Option<u32>,
    pub validate_topics: Option<bool>,
    pub default_driver_id: Option<String>,
}

/// Resolved worker configuration. Construct via [`crate::WorkerBuilder`].
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub endpoint: String,
    pub api_base_url: String,
    pub api_key: Option<String>,
    pub oauth2: Option<Oauth2Config>,
    pub tenant_id: String,
    pub concurrency: usize,
    pub retry_count: u32,
    pub validate_topics: bool,
    pub default_driver_id: Option<String>,
    pub control_plane_timeout_secs: u64,
}

impl WorkerConfig {
    /// Build from explicit values, falling back to environment variables
    /// for any left empty, then to built-in defaults.
    pub fn resolve(overrides: ConfigOverrides) -> Self {
        let endpoint = non_empty(overrides.endpoint).or_else(|| env::var(ENV_ENDPOINT).ok());
        let api_base_url =
            non_empty(overrides.api_base_url).or_else(|| env::var(ENV_API_BASE_URL).ok());
        let api_key = non_empty(overrides.api_key).or_else(|| env::var(ENV_API_KEY).ok());
        let tenant_id = non_empty(overrides.tenant_id).or_else(|| env::var(ENV_TENANT_ID).ok());

        Self {
            endpoint: endpoint.unwrap_or_default(),
            api_base_url: api_base_url.unwrap_or_default(),
            api_key,
            oauth2: Oauth2Config::resolve(overrides.oauth2),
            tenant_id: tenant_id.unwrap_or_default(),
            concurrency: overrides.concurrency.unwrap_or(DEFAULT_CONCURRENCY).max(1),
            retry_count: overrides.retry_count.unwrap_or(DEFAULT_RETRY_COUNT),
            validate_topics: overrides.validate_topics.unwrap_or(true),
            default_driver_id: overrides.default_driver_id,
            control_plane_timeout_secs: DEFAULT_CONTROL_PLANE_TIMEOUT_SECS,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrency_clamped_to_at_least_one() {
        let cfg = WorkerConfig::resolve(ConfigOverrides {
            concurrency: Some(0),
            ..Default::default()
        });
        assert_eq!(cfg.concurrency, 1);
    }

    #[test]
    fn retry_count_defaults_to_zero() {
        let cfg = WorkerConfig::resolve(ConfigOverrides::default());
        assert_eq!(cfg.retry_count, 0);
    }

    #[test]
    fn validate_topics_defaults_true() {
        let cfg = WorkerConfig::resolve(ConfigOverrides::default());
        assert!(cfg.validate_topics);
    }

    #[test]
    fn env_fallback_fills_empty_endpoint() {
        // SAFETY: test-only, single-threaded env mutation guarded by serial execution
        // within this process; no other test reads GITHOOK_ENDPOINT.
        unsafe {
            std::env::set_var(crate::core::constants::ENV_ENDPOINT, "amqp://example");
        }
        let cfg = WorkerConfig::resolve(ConfigOverrides::default());
        assert_eq!(cfg.endpoint, "amqp://example");
        unsafe {
            std::env::remove_var(crate::core::constants::ENV_ENDPOINT);
        }
    }
}
