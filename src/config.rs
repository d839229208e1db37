//! Run configuration loaded from TOML
//!
//! ```toml
//! cluster = true
//!
//! [robot]
//! user = "#ws+XXXXXXXX"
//! password = "secret"
//!
//! [[targets]]
//! ip = "203.0.113.10"
//! hostname = "node-1"
//! public_keys = "ssh-ed25519 AAAA... admin"
//! cloud_config = "cloud-config.yaml.j2"
//! manager = true
//! post_install_remote = """
//! sudo systemctl enable --now docker
//! """
//! ```
//!
//! Relative paths resolve against the configuration file's directory.

use color_eyre::eyre::{eyre, Result, WrapErr};
use metalstrap_actions::{
    ActionKind, EngineSettings, InstallSettings, RetryPolicy, TargetConfig, WaitSettings,
    DEFAULT_MAX_RETRIES,
};
use metalstrap_provider::{ResetMode, DEFAULT_DISCOVERY_URL};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Top-level configuration file
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Run in cluster mode even without `--cluster`
    #[serde(default)]
    pub cluster: bool,
    #[serde(default)]
    pub robot: RobotSection,
    #[serde(default)]
    pub discovery: DiscoverySection,
    #[serde(default)]
    pub ssh: SshSection,
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub targets: Vec<TargetEntry>,

    #[serde(skip)]
    base_dir: PathBuf,
}

/// Robot webservice credentials
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RobotSection {
    pub user: Option<String>,
    pub password: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiscoverySection {
    #[serde(default = "default_discovery_url")]
    pub url: String,
}

impl Default for DiscoverySection {
    fn default() -> Self {
        Self {
            url: default_discovery_url(),
        }
    }
}

fn default_discovery_url() -> String {
    DEFAULT_DISCOVERY_URL.to_string()
}

/// Local OpenSSH client options
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SshSection {
    pub identity_file: Option<PathBuf>,
    pub known_hosts_file: Option<PathBuf>,
    pub connect_timeout_secs: Option<u64>,
}

/// Engine tuning; every field is optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineSection {
    pub max_retries: Option<u32>,
    pub retry_unit_ms: Option<u64>,
    pub probe_port: Option<u16>,
    pub probe_interval_secs: Option<u64>,
    pub probe_timeout_secs: Option<u64>,
    pub reset_mode: Option<ResetMode>,
    pub installer_url: Option<String>,
    pub transpiler_url: Option<String>,
    pub post_install_login: Option<String>,
}

/// One `[[targets]]` entry
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetEntry {
    pub ip: String,
    pub hostname: String,
    #[serde(default)]
    pub public_keys: String,
    /// Path of the configuration document template
    pub cloud_config: Option<PathBuf>,
    pub drive: Option<String>,
    pub channel: Option<String>,
    #[serde(default)]
    pub manager: bool,
    pub route_cmd: Option<String>,
    /// Script template, inline or the path of a file holding it
    pub post_install: Option<String>,
    /// Command template, one command per line
    pub post_install_remote: Option<String>,
    pub actions: Option<Vec<ActionKind>>,
    pub rescue_os: Option<String>,
    pub rescue_os_bit: Option<u8>,
}

impl Config {
    /// Read and parse `path`
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read configuration {}", path.display()))?;
        let mut config = Self::parse(&text)
            .wrap_err_with(|| format!("invalid configuration {}", path.display()))?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        Ok(config)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Target configurations with their templates read from disk
    pub fn target_configs(&self) -> Result<Vec<TargetConfig>> {
        self.targets
            .iter()
            .map(|entry| self.target_config(entry))
            .collect()
    }

    fn target_config(&self, entry: &TargetEntry) -> Result<TargetConfig> {
        let cloud_config_path = entry
            .cloud_config
            .as_deref()
            .ok_or_else(|| eyre!("no cloud config provided for {}", entry.ip))?;
        let cloud_config_path = self.resolve(cloud_config_path);
        let cloud_config = std::fs::read_to_string(&cloud_config_path).wrap_err_with(|| {
            format!(
                "failed to read cloud config {} for {}",
                cloud_config_path.display(),
                entry.ip
            )
        })?;

        let mut config = TargetConfig::new(&entry.ip, &entry.hostname, cloud_config)
            .with_public_keys(&entry.public_keys)
            .with_manager(entry.manager);
        if let Some(drive) = &entry.drive {
            config = config.with_drive(drive);
        }
        if let Some(channel) = &entry.channel {
            config = config.with_channel(channel);
        }
        if let Some(route_cmd) = &entry.route_cmd {
            config = config.with_route_cmd(route_cmd);
        }
        if let Some(post_install) = &entry.post_install {
            config = config.with_post_install(self.inline_or_file(post_install)?);
        }
        if let Some(commands) = &entry.post_install_remote {
            config = config.with_post_install_remote(commands);
        }
        if let Some(actions) = &entry.actions {
            config = config.with_actions(actions.clone());
        }
        if let Some(os) = &entry.rescue_os {
            config.rescue_os = os.clone();
        }
        if let Some(bits) = entry.rescue_os_bit {
            config.rescue_os_bit = bits;
        }
        Ok(config)
    }

    // A single line naming an existing file is read; anything else is the
    // script itself
    fn inline_or_file(&self, value: &str) -> Result<String> {
        if value.lines().count() == 1 {
            let path = self.resolve(Path::new(value.trim()));
            if path.is_file() {
                return std::fs::read_to_string(&path)
                    .wrap_err_with(|| format!("failed to read {}", path.display()));
            }
            if looks_like_path(value) {
                warn!(
                    path = %path.display(),
                    "post_install looks like a file name but no such file exists, using it as an inline command"
                );
            }
        }
        Ok(value.to_string())
    }

    /// Engine settings with the configured overrides applied
    pub fn engine_settings(&self) -> EngineSettings {
        let engine = &self.engine;
        let defaults = EngineSettings::default();
        let wait = WaitSettings::default();
        let install = InstallSettings::default();

        EngineSettings {
            retry: RetryPolicy::new(
                engine.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
                engine
                    .retry_unit_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.retry.unit),
            ),
            wait: WaitSettings {
                port: engine.probe_port.unwrap_or(wait.port),
                interval: engine
                    .probe_interval_secs
                    .map(Duration::from_secs)
                    .unwrap_or(wait.interval),
                probe_timeout: engine
                    .probe_timeout_secs
                    .map(Duration::from_secs)
                    .unwrap_or(wait.probe_timeout),
            },
            install: InstallSettings {
                installer_url: engine
                    .installer_url
                    .clone()
                    .unwrap_or(install.installer_url),
                transpiler_url: engine
                    .transpiler_url
                    .clone()
                    .unwrap_or(install.transpiler_url),
                ..install
            },
            reset_mode: engine.reset_mode.unwrap_or(defaults.reset_mode),
            post_install_login: engine
                .post_install_login
                .clone()
                .unwrap_or(defaults.post_install_login),
        }
    }
}

fn looks_like_path(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty()
        && !value.contains(char::is_whitespace)
        && (value.contains('/') || value.contains('.'))
}
