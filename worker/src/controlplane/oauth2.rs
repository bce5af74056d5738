//! Client-credentials token fetch and cache, scoped to one
//! [`super::ControlPlaneClient`] instance rather than a process-wide
//! `static` (spec.md §9 design note on the global-cache open question),
//! grounded on `server/src/data/secrets/cached.rs::CachedProvider`'s
//! moka-backed wrapper around a slower backend.

use std::time::Duration;

use chrono::Utc;
use moka::future::Cache;
use serde::Deserialize;

use crate::core::config::Oauth2Config;
use crate::core::constants::OAUTH2_REFRESH_SKEW_SECS;
use crate::error::ControlPlaneError;

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at_epoch: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

/// Caches OAuth2 client-credentials access tokens keyed by
/// `(token_url, client_id, scopes, audience)`, refreshing
/// [`OAUTH2_REFRESH_SKEW_SECS`] before expiry.
pub struct Oauth2TokenCache {
    http: reqwest::Client,
    cache: Cache<String, CachedToken>,
}

impl Oauth2TokenCache {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            cache: Cache::builder()
                .max_capacity(64)
                .time_to_live(Duration::from_secs(24 * 3600))
                .build(),
        }
    }

    /// Returns a valid bearer token, fetching and caching a new one if
    /// absent or within the refresh skew of expiring.
    pub async fn token(&self, config: &Oauth2Config) -> Result<String, ControlPlaneError> {
        let key = cache_key(config);

        if let Some(cached) = self.cache.get(&key).await
            && cached.expires_at_epoch - OAUTH2_REFRESH_SKEW_SECS > Utc::now().timestamp()
        {
            return Ok(cached.access_token);
        }

        let fetched = self.fetch(config).await?;
        self.cache.insert(key, fetched.clone()).await;
        Ok(fetched.access_token)
    }

    async fn fetch(&self, config: &Oauth2Config) -> Result<CachedToken, ControlPlaneError> {
        let mut form = vec![
            ("grant_type", "client_credentials".to_string()),
            ("client_id", config.client_id.clone()),
            ("client_secret", config.client_secret.clone()),
        ];
        if !config.scopes.is_empty() {
            form.push(("scope", config.scopes.join(" ")));
        }
        if let Some(audience) = &config.audience {
            form.push(("audience", audience.clone()));
        }

        let response = self
            .http
            .post(&config.token_url)
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ControlPlaneError::Oauth2(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let parsed: TokenResponse = response
            .json()
            .await
            .map_err(|e| ControlPlaneError::Oauth2(format!("invalid token response: {e}")))?;

        Ok(CachedToken {
            access_token: parsed.access_token,
            expires_at_epoch: Utc::now().timestamp() + parsed.expires_in,
        })
    }
}

fn cache_key(config: &Oauth2Config) -> String {
    format!(
        "{}|{}|{}|{}",
        config.token_url,
        config.client_id,
        config.scopes.join(","),
        config.audience.as_deref().unwrap_or("")
    )
}
