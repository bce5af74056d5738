//! Control-plane HTTP client: Rules, Drivers, EventLogs, SCM (spec.md §6).
//! Built on `reqwest::Client`, grounded on the teacher's outbound HTTP
//! clients (`server/src/domain/pricing/mod.rs`) for the request/timeout
//! shape.

mod oauth2;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::core::config::WorkerConfig;
use crate::core::constants::{
    PATH_GET_RULE, PATH_GET_SCM_CLIENT, PATH_LIST_DRIVERS, PATH_LIST_RULES,
    PATH_UPDATE_EVENT_LOG_STATUS,
};
use crate::error::ControlPlaneError;

use oauth2::Oauth2TokenCache;
use types::{
    Driver, GetRuleRequest, GetRuleResponse, GetScmClientRequest, GetScmClientResponse,
    ListDriversResponse, ListRulesResponse, Rule, ScmClient, UpdateEventLogStatusRequest,
    UpdateEventLogStatusResponse,
};

/// The control-plane surface [`crate::Worker`] depends on. `ControlPlaneClient`
/// is the real `reqwest`-backed implementation; tests substitute a mock,
/// grounded on the teacher's `SecretProvider` trait seam.
#[async_trait]
pub trait ControlPlaneApi: Send + Sync {
    async fn list_rules(&self) -> Result<Vec<Rule>, ControlPlaneError>;
    async fn get_rule(&self, id: &str) -> Result<Rule, ControlPlaneError>;
    async fn list_drivers(&self) -> Result<Vec<Driver>, ControlPlaneError>;
    async fn update_event_log_status(
        &self,
        log_id: &str,
        status: &str,
        error_message: &str,
    ) -> Result<(), ControlPlaneError>;
    async fn get_scm_client(
        &self,
        provider: &str,
        installation_id: &str,
        provider_instance_key: &str,
    ) -> Result<ScmClient, ControlPlaneError>;
}

/// HTTP client for the control plane's Rules/Drivers/EventLogs/SCM RPCs.
pub struct ControlPlaneClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    oauth2: Option<crate::core::config::Oauth2Config>,
    oauth2_cache: Oauth2TokenCache,
    tenant_id: String,
}

impl ControlPlaneClient {
    pub fn new(config: &WorkerConfig) -> Result<Self, ControlPlaneError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.control_plane_timeout_secs))
            .build()
            .map_err(ControlPlaneError::Http)?;

        Ok(Self {
            oauth2_cache: Oauth2TokenCache::new(http.clone()),
            http,
            base_url: config.api_base_url.clone(),
            api_key: config.api_key.clone(),
            oauth2: config.oauth2.clone(),
            tenant_id: config.tenant_id.clone(),
        })
    }

    async fn auth_headers(&self) -> Result<HeaderMap, ControlPlaneError> {
        let mut headers = HeaderMap::new();

        if let Some(api_key) = &self.api_key {
            headers.insert(
                HeaderName::from_static("x-api-key"),
                HeaderValue::from_str(api_key)
                    .map_err(|e| ControlPlaneError::Config(e.to_string()))?,
            );
        } else if let Some(oauth2) = &self.oauth2 {
            let token = self.oauth2_cache.token(oauth2).await?;
            headers.insert(
                reqwest::header::AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|e| ControlPlaneError::Config(e.to_string()))?,
            );
        }

        if !self.tenant_id.is_empty() {
            headers.insert(
                HeaderName::from_static("x-tenant-id"),
                HeaderValue::from_str(&self.tenant_id)
                    .map_err(|e| ControlPlaneError::Config(e.to_string()))?,
            );
        }

        Ok(headers)
    }

    async fn post<Req: serde::Serialize + Sync, Resp: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &Req,
    ) -> Result<Resp, ControlPlaneError> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let headers = self.auth_headers().await?;

        let response = self
            .http
            .post(url)
            .headers(headers)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ControlPlaneError::Response(format!(
                "{path} returned {status}: {text}"
            )));
        }

        response
            .json::<Resp>()
            .await
            .map_err(ControlPlaneError::Http)
    }

}

#[async_trait]
impl ControlPlaneApi for ControlPlaneClient {
    async fn list_rules(&self) -> Result<Vec<Rule>, ControlPlaneError> {
        let resp: ListRulesResponse = self.post(PATH_LIST_RULES, &serde_json::json!({})).await?;
        Ok(resp.rules)
    }

    async fn get_rule(&self, id: &str) -> Result<Rule, ControlPlaneError> {
        let resp: GetRuleResponse = self
            .post(PATH_GET_RULE, &GetRuleRequest { id: id.to_string() })
            .await?;
        Ok(resp.rule)
    }

    async fn list_drivers(&self) -> Result<Vec<Driver>, ControlPlaneError> {
        let resp: ListDriversResponse =
            self.post(PATH_LIST_DRIVERS, &serde_json::json!({})).await?;
        Ok(resp.drivers)
    }

    async fn update_event_log_status(
        &self,
        log_id: &str,
        status: &str,
        error_message: &str,
    ) -> Result<(), ControlPlaneError> {
        let _: UpdateEventLogStatusResponse = self
            .post(
                PATH_UPDATE_EVENT_LOG_STATUS,
                &UpdateEventLogStatusRequest {
                    log_id: log_id.to_string(),
                    status: status.to_string(),
                    error_message: error_message.to_string(),
                },
            )
            .await?;
        Ok(())
    }

    async fn get_scm_client(
        &self,
        provider: &str,
        installation_id: &str,
        provider_instance_key: &str,
    ) -> Result<ScmClient, ControlPlaneError> {
        let resp: GetScmClientResponse = self
            .post(
                PATH_GET_SCM_CLIENT,
                &GetScmClientRequest {
                    provider: provider.to_string(),
                    installation_id: installation_id.to_string(),
                    provider_instance_key: provider_instance_key.to_string(),
                },
            )
            .await?;
        Ok(resp.client)
    }
}
