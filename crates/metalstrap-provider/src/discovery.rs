//! Discovery token source
//!
//! A run asks for exactly one discovery token and hands it to every target.

use async_trait::async_trait;
use reqwest::Client;
use tracing::info;

use crate::error::{ProviderError, Result};

/// Public etcd discovery endpoint
pub const DEFAULT_DISCOVERY_URL: &str = "https://discovery.etcd.io/new";

/// Source of the shared cluster discovery token
#[async_trait]
pub trait DiscoveryTokenSource: Send + Sync {
    /// Fetch a fresh token
    async fn fetch_token(&self) -> Result<String>;
}

/// etcd discovery service client
#[derive(Debug, Clone)]
pub struct EtcdDiscovery {
    url: String,
    http: Client,
}

impl EtcdDiscovery {
    /// Create a client against the given endpoint
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http: Client::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Default for EtcdDiscovery {
    fn default() -> Self {
        Self::new(DEFAULT_DISCOVERY_URL)
    }
}

#[async_trait]
impl DiscoveryTokenSource for EtcdDiscovery {
    async fn fetch_token(&self) -> Result<String> {
        info!(url = %self.url, "Requesting discovery token");

        let response = self.http.get(&self.url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }

        parse_token(&body)
    }
}

fn parse_token(body: &str) -> Result<String> {
    let token = body.trim();
    if token.is_empty() {
        return Err(ProviderError::UnexpectedResponse(
            "discovery service returned an empty token".to_string(),
        ));
    }
    Ok(token.to_string())
}
