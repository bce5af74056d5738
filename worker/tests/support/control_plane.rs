//! A recording, fully in-memory stand-in for [`githook_worker::ControlPlaneApi`],
//! used in place of the `reqwest`-backed client so these tests never touch
//! the network.

use async_trait::async_trait;
use parking_lot::Mutex;

use githook_worker::ControlPlaneApi;
use githook_worker::controlplane::types::{Driver, Rule, ScmClient};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusUpdate {
    pub log_id: String,
    pub status: String,
    pub error_message: String,
}

#[derive(Default)]
pub struct MockControlPlane {
    rules: Mutex<Vec<Rule>>,
    drivers: Mutex<Vec<Driver>>,
    updates: Mutex<Vec<StatusUpdate>>,
}

impl MockControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(self, rules: Vec<Rule>) -> Self {
        *self.rules.lock() = rules;
        self
    }

    pub fn with_drivers(self, drivers: Vec<Driver>) -> Self {
        *self.drivers.lock() = drivers;
        self
    }

    pub fn updates(&self) -> Vec<StatusUpdate> {
        self.updates.lock().clone()
    }
}

#[async_trait]
impl ControlPlaneApi for MockControlPlane {
    async fn list_rules(&self) -> Result<Vec<Rule>, githook_worker::error::ControlPlaneError> {
        Ok(self.rules.lock().clone())
    }

    async fn get_rule(&self, id: &str) -> Result<Rule, githook_worker::error::ControlPlaneError> {
        self.rules
            .lock()
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| githook_worker::error::ControlPlaneError::Response(format!("no such rule {id}")))
    }

    async fn list_drivers(&self) -> Result<Vec<Driver>, githook_worker::error::ControlPlaneError> {
        Ok(self.drivers.lock().clone())
    }

    async fn update_event_log_status(
        &self,
        log_id: &str,
        status: &str,
        error_message: &str,
    ) -> Result<(), githook_worker::error::ControlPlaneError> {
        self.updates.lock().push(StatusUpdate {
            log_id: log_id.to_string(),
            status: status.to_string(),
            error_message: error_message.to_string(),
        });
        Ok(())
    }

    async fn get_scm_client(
        &self,
        _provider: &str,
        _installation_id: &str,
        _provider_instance_key: &str,
    ) -> Result<ScmClient, githook_worker::error::ControlPlaneError> {
        Err(githook_worker::error::ControlPlaneError::Response(
            "get_scm_client not stubbed".into(),
        ))
    }
}
