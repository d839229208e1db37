//! Hetzner Robot webservice client
//!
//! Only the three calls a bootstrap run needs are implemented: rescue
//! activation, rescue deactivation and reset.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::controller::ProvisioningApi;
use crate::error::{ProviderError, Result};
use crate::types::{RescueActivation, ResetMode, RobotConfig};

#[derive(Debug, Deserialize)]
struct RescueEnvelope {
    rescue: RescueBody,
}

#[derive(Debug, Deserialize)]
struct RescueBody {
    password: Option<String>,
}

/// Robot webservice client
#[derive(Debug, Clone)]
pub struct RobotClient {
    config: RobotConfig,
    http: Client,
}

impl RobotClient {
    /// Create a new Robot client
    pub fn new(config: RobotConfig) -> Result<Self> {
        if config.username.is_empty() {
            return Err(ProviderError::InvalidConfig(
                "robot username must not be empty".to_string(),
            ));
        }
        let http = Client::builder()
            .user_agent(concat!("metalstrap/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { config, http })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn rescue_url(&self, address: &str) -> String {
        format!("{}/boot/{}/rescue", self.config.base_url, address)
    }

    fn reset_url(&self, address: &str) -> String {
        format!("{}/reset/{}", self.config.base_url, address)
    }

    /// Turn a non-success status into `ProviderError::Api`
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ProviderError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl ProvisioningApi for RobotClient {
    async fn activate_rescue(
        &self,
        address: &str,
        os: &str,
        bits: u8,
    ) -> Result<RescueActivation> {
        let url = self.rescue_url(address);
        debug!(url = %url, os, bits, "Activating rescue system");

        let arch = bits.to_string();
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .form(&[("os", os), ("arch", arch.as_str())])
            .send()
            .await?;
        let response = Self::check(response).await?;

        let text = response.text().await?;
        parse_rescue_reply(&text)
    }

    async fn deactivate_rescue(&self, address: &str) -> Result<()> {
        let url = self.rescue_url(address);
        debug!(url = %url, "Deactivating rescue system");

        let response = self
            .http
            .delete(&url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn hard_reset(&self, address: &str, mode: ResetMode) -> Result<()> {
        let url = self.reset_url(address);
        debug!(url = %url, mode = %mode, "Resetting server");

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .form(&[("type", mode.as_str())])
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

/// Extract the one-time password from a rescue activation reply
fn parse_rescue_reply(text: &str) -> Result<RescueActivation> {
    let envelope: RescueEnvelope = serde_json::from_str(text)
        .map_err(|e| ProviderError::UnexpectedResponse(format!("invalid rescue reply: {}", e)))?;

    match envelope.rescue.password {
        Some(password) if !password.is_empty() => Ok(RescueActivation::new(password)),
        _ => Err(ProviderError::UnexpectedResponse(
            "rescue reply carried no password".to_string(),
        )),
    }
}
