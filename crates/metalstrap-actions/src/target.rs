//! Hosts under provisioning

use crate::error::{ActionError, Result};
use crate::kind::{ActionKind, DEFAULT_SEQUENCE};

/// Login used while the host runs the rescue system
pub const RESCUE_LOGIN: &str = "root";

/// Static description of one host, as configured
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetConfig {
    /// Network address
    pub ip: String,
    /// Hostname the installed system must report
    pub hostname: String,
    /// Public key material handed to templates
    pub public_keys: String,
    /// Configuration document template
    pub cloud_config: String,
    /// Installation drive
    pub drive: String,
    /// OS release channel
    pub channel: String,
    /// Requested cluster manager
    pub manager: bool,
    /// Command that sets up this host's network route
    pub route_cmd: Option<String>,
    /// Script template run on the controller after installation
    pub post_install: Option<String>,
    /// Command template run on the host after installation, one per line
    pub post_install_remote: Option<String>,
    /// Overrides the default action sequence
    pub actions: Option<Vec<ActionKind>>,
    /// Rescue system flavour
    pub rescue_os: String,
    pub rescue_os_bit: u8,
}

impl TargetConfig {
    /// A target with the default drive, channel and rescue system
    pub fn new(
        ip: impl Into<String>,
        hostname: impl Into<String>,
        cloud_config: impl Into<String>,
    ) -> Self {
        Self {
            ip: ip.into(),
            hostname: hostname.into(),
            public_keys: String::new(),
            cloud_config: cloud_config.into(),
            drive: "/dev/sda".to_string(),
            channel: "stable".to_string(),
            manager: false,
            route_cmd: None,
            post_install: None,
            post_install_remote: None,
            actions: None,
            rescue_os: "linux".to_string(),
            rescue_os_bit: 64,
        }
    }

    pub fn with_public_keys(mut self, keys: impl Into<String>) -> Self {
        self.public_keys = keys.into();
        self
    }

    pub fn with_drive(mut self, drive: impl Into<String>) -> Self {
        self.drive = drive.into();
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    pub fn with_manager(mut self, manager: bool) -> Self {
        self.manager = manager;
        self
    }

    pub fn with_route_cmd(mut self, cmd: impl Into<String>) -> Self {
        self.route_cmd = Some(cmd.into());
        self
    }

    pub fn with_post_install(mut self, script: impl Into<String>) -> Self {
        self.post_install = Some(script.into());
        self
    }

    pub fn with_post_install_remote(mut self, commands: impl Into<String>) -> Self {
        self.post_install_remote = Some(commands.into());
        self
    }

    pub fn with_actions(mut self, actions: Vec<ActionKind>) -> Self {
        self.actions = Some(actions);
        self
    }

    /// Reject configurations no pipeline could run
    pub fn validate(&self) -> Result<()> {
        if self.ip.trim().is_empty() {
            return Err(ActionError::InvalidConfiguration(
                "target has no ip".to_string(),
            ));
        }
        if self.hostname.trim().is_empty() {
            return Err(ActionError::InvalidConfiguration(format!(
                "target {} has no hostname",
                self.ip
            )));
        }
        if self.cloud_config.trim().is_empty() {
            return Err(ActionError::InvalidConfiguration(format!(
                "no cloud config provided for {}",
                self.ip
            )));
        }
        if matches!(&self.actions, Some(actions) if actions.is_empty()) {
            return Err(ActionError::InvalidConfiguration(format!(
                "empty action list for {}",
                self.ip
            )));
        }
        Ok(())
    }
}

/// A host plus the state its pipeline accumulates
///
/// Only the host's own pipeline mutates this.
#[derive(Debug, Clone)]
pub struct Target {
    pub config: TargetConfig,
    /// Current login name
    pub login: String,
    /// Rescue system password, once activated
    pub password: Option<String>,
    /// Set once the installed system has been verified; logins stop
    /// offering the rescue password from then on
    pub installed: bool,
    /// Manager role in cluster mode
    pub is_manager: bool,
    pub join_token: Option<String>,
    pub join_address: Option<String>,
    /// Steps this host runs, in order
    pub actions: Vec<ActionKind>,
    /// Retries spent on the current operation
    pub retries: u32,
}

impl Target {
    /// Build a target, falling back to `default_actions`
    pub fn new(config: TargetConfig, default_actions: &[ActionKind]) -> Self {
        let actions = config
            .actions
            .clone()
            .unwrap_or_else(|| default_actions.to_vec());
        Self {
            config,
            login: RESCUE_LOGIN.to_string(),
            password: None,
            installed: false,
            is_manager: false,
            join_token: None,
            join_address: None,
            actions,
            retries: 0,
        }
    }

    /// Build a target with the standard action sequence
    pub fn with_default_actions(config: TargetConfig) -> Self {
        Self::new(config, &DEFAULT_SEQUENCE)
    }

    pub fn address(&self) -> &str {
        &self.config.ip
    }

    pub fn hostname(&self) -> &str {
        &self.config.hostname
    }

    /// Shell command that runs the OS installer
    pub fn bootstrap_cmd(&self, ignition_path: &str) -> String {
        format!(
            "export TERM=xterm; /tmp/coreos-install -d {} -C {} -i {}",
            metalstrap_remote::shell_quote(&self.config.drive),
            metalstrap_remote::shell_quote(&self.config.channel),
            metalstrap_remote::shell_quote(ignition_path),
        )
    }
}
