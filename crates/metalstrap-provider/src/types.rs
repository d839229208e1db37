//! Common types for provider operations

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default Hetzner Robot webservice endpoint
pub const DEFAULT_ROBOT_URL: &str = "https://robot-ws.your-server.de";

/// Outcome of a successful rescue activation
#[derive(Clone, PartialEq, Eq)]
pub struct RescueActivation {
    /// One-time root password of the rescue system
    pub password: String,
}

impl RescueActivation {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
        }
    }
}

impl fmt::Debug for RescueActivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RescueActivation")
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Reset type understood by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResetMode {
    /// Send CTRL+ALT+DEL
    #[serde(rename = "sw")]
    Software,
    /// Press the reset button
    #[default]
    #[serde(rename = "hw")]
    Hardware,
    /// Ask a technician to reset the server
    #[serde(rename = "man")]
    Manual,
    /// Cut and restore power
    #[serde(rename = "power")]
    Power,
}

impl ResetMode {
    /// Wire value used by the Robot webservice
    pub fn as_str(&self) -> &'static str {
        match self {
            ResetMode::Software => "sw",
            ResetMode::Hardware => "hw",
            ResetMode::Manual => "man",
            ResetMode::Power => "power",
        }
    }
}

impl fmt::Display for ResetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResetMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sw" => Ok(ResetMode::Software),
            "hw" => Ok(ResetMode::Hardware),
            "man" => Ok(ResetMode::Manual),
            "power" => Ok(ResetMode::Power),
            other => Err(format!("unknown reset mode: {}", other)),
        }
    }
}

/// Robot webservice connection configuration
#[derive(Clone)]
pub struct RobotConfig {
    /// Base URL (e.g., https://robot-ws.your-server.de)
    pub base_url: String,
    /// Webservice user
    pub username: String,
    /// Webservice password
    pub password: String,
}

impl RobotConfig {
    /// Create a config against the public Robot endpoint
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_ROBOT_URL.to_string(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Point the client at a different endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

impl fmt::Debug for RobotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RobotConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
