//! Engine-wide tunables

use metalstrap_provider::ResetMode;

use crate::retry::RetryPolicy;
use crate::wait::WaitSettings;

/// Where the installer tooling comes from and where it lands on the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallSettings {
    pub installer_url: String,
    pub transpiler_url: String,
    /// Rendered configuration document on the host
    pub config_path: String,
    /// Transpiled installer input on the host
    pub ignition_path: String,
}

impl Default for InstallSettings {
    fn default() -> Self {
        Self {
            installer_url: "https://raw.githubusercontent.com/coreos/init/master/bin/coreos-install"
                .to_string(),
            transpiler_url: "https://github.com/coreos/container-linux-config-transpiler/releases/download/v0.4.2/ct-v0.4.2-x86_64-unknown-linux-gnu".to_string(),
            config_path: "/tmp/cloud-config.yaml".to_string(),
            ignition_path: "/tmp/ignition.json".to_string(),
        }
    }
}

/// Settings shared read-only by every pipeline of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub retry: RetryPolicy,
    pub wait: WaitSettings,
    pub install: InstallSettings,
    /// Reset type used by the `reset` action
    pub reset_mode: ResetMode,
    /// Login of the installed system
    pub post_install_login: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            wait: WaitSettings::default(),
            install: InstallSettings::default(),
            reset_mode: ResetMode::Hardware,
            post_install_login: "core".to_string(),
        }
    }
}
