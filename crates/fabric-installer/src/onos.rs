//! REST client for the ONOS flow API.
//!
//! Each rule is posted to `/onos/v1/flows/{deviceId}`; the controller
//! answers 201 (or 200) when it accepts the flow.

use async_trait::async_trait;
use fabric_compiler::{DeviceId, FlowRule};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{InstallError, InstallResult};
use crate::programmer::RuleProgrammer;
use crate::wire::FlowPayload;

/// Controller connection settings (`[controller]` in the daemon config).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default = "default_password")]
    pub password: String,

    /// Application id the flows are registered under.
    #[serde(default)]
    pub app_id: Option<String>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "172.17.0.5".to_string()
}

fn default_port() -> u16 {
    8181
}

fn default_username() -> String {
    "onos".to_string()
}

fn default_password() -> String {
    "rocks".to_string()
}

fn default_request_timeout_secs() -> u64 {
    5
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            username: default_username(),
            password: default_password(),
            app_id: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ControllerConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// [`RuleProgrammer`] backed by the controller's REST API.
#[derive(Debug, Clone)]
pub struct OnosProgrammer {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    app_id: Option<String>,
}

impl OnosProgrammer {
    pub fn new(config: &ControllerConfig) -> InstallResult<Self> {
        if config.host.is_empty() {
            return Err(InstallError::Configuration(
                "controller host is empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url(),
            username: config.username.clone(),
            password: config.password.clone(),
            app_id: config.app_id.clone(),
        })
    }

    pub fn flow_url(&self, device: &DeviceId) -> String {
        format!("{}/onos/v1/flows/{}", self.base_url, device)
    }
}

#[async_trait]
impl RuleProgrammer for OnosProgrammer {
    async fn program(&self, rule: &FlowRule) -> InstallResult<()> {
        let url = self.flow_url(&rule.device_id);
        let mut request = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&FlowPayload::from(rule));
        if let Some(app_id) = &self.app_id {
            request = request.query(&[("appId", app_id)]);
        }

        let response = request.send().await?;
        let status = response.status();
        debug!(%url, status = status.as_u16(), "Flow submitted");

        if status == StatusCode::OK || status == StatusCode::CREATED {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(InstallError::rejected(status.as_u16(), body))
    }
}
