//! Scripted collaborators for exercising pipelines without real hosts
//!
//! Enabled for this crate's own tests and, through the `testing` feature,
//! for downstream crates' tests.

use async_trait::async_trait;
use metalstrap_provider::{ProviderError, ProvisioningApi, RescueActivation, ResetMode};
use metalstrap_remote::{
    CommandOutput, Endpoint, KnownHosts, LocalShell, RemoteError, RemoteExecutor, RemoteSession,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::context::{Services, TargetContext};
use crate::prober::Prober;
use crate::retry::RetryPolicy;
use crate::settings::EngineSettings;
use crate::target::{Target, TargetConfig};
use crate::wait::WaitSettings;

/// Discovery token handed to contexts built here
pub const TEST_DISCOVERY_TOKEN: &str = "test-token";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Settings with millisecond time units
pub fn fast_settings() -> EngineSettings {
    EngineSettings {
        retry: RetryPolicy::new(crate::retry::DEFAULT_MAX_RETRIES, Duration::from_millis(1)),
        wait: WaitSettings {
            port: 22,
            interval: Duration::from_millis(1),
            probe_timeout: Duration::from_millis(1),
        },
        ..EngineSettings::default()
    }
}

/// Provisioning API that records calls and fails on request
#[derive(Debug, Default)]
pub struct MockProvider {
    calls: Mutex<Vec<String>>,
    rescue_failures: Mutex<HashMap<String, u32>>,
    reset_failures: Mutex<HashMap<String, u32>>,
    default_rescue_failures: Mutex<u32>,
    default_reset_failures: Mutex<u32>,
    activations: Mutex<HashMap<String, u32>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `times` rescue activations of every host
    pub fn fail_rescue(&self, times: u32) {
        *lock(&self.default_rescue_failures) = times;
    }

    /// Fail the next `times` resets of every host
    pub fn fail_reset(&self, times: u32) {
        *lock(&self.default_reset_failures) = times;
    }

    /// Fail the next `times` resets of `address` only
    pub fn fail_reset_for(&self, address: &str, times: u32) {
        lock(&self.reset_failures).insert(address.to_string(), times);
    }

    /// Fail the next `times` rescue activations of `address` only
    pub fn fail_rescue_for(&self, address: &str, times: u32) {
        lock(&self.rescue_failures).insert(address.to_string(), times);
    }

    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    /// Number of calls starting with `prefix`
    pub fn count(&self, prefix: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        lock(&self.calls).push(call);
    }

    fn should_fail(
        per_host: &Mutex<HashMap<String, u32>>,
        default: &Mutex<u32>,
        address: &str,
    ) -> bool {
        let mut per_host = lock(per_host);
        if let Some(left) = per_host.get_mut(address) {
            if *left > 0 {
                *left -= 1;
                return true;
            }
            return false;
        }
        let mut left = lock(default);
        if *left > 0 {
            *left = left.saturating_sub(1);
            return true;
        }
        false
    }
}

#[async_trait]
impl ProvisioningApi for MockProvider {
    async fn activate_rescue(
        &self,
        address: &str,
        os: &str,
        bits: u8,
    ) -> metalstrap_provider::Result<RescueActivation> {
        self.record(format!("activate {address} {os} {bits}"));
        let attempt = {
            let mut activations = lock(&self.activations);
            let count = activations.entry(address.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        if Self::should_fail(&self.rescue_failures, &self.default_rescue_failures, address) {
            return Err(ProviderError::Api {
                status: 503,
                body: "rescue system busy".to_string(),
            });
        }
        Ok(RescueActivation::new(format!("rescue-{address}-{attempt}")))
    }

    async fn deactivate_rescue(&self, address: &str) -> metalstrap_provider::Result<()> {
        self.record(format!("deactivate {address}"));
        Ok(())
    }

    async fn hard_reset(&self, address: &str, mode: ResetMode) -> metalstrap_provider::Result<()> {
        self.record(format!("reset {address} {mode}"));
        if Self::should_fail(&self.reset_failures, &self.default_reset_failures, address) {
            return Err(ProviderError::Api {
                status: 409,
                body: "reset in progress".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct RemoteState {
    commands: Mutex<Vec<(String, String)>>,
    files: Mutex<Vec<(String, String, String)>>,
    endpoints: Mutex<Vec<Endpoint>>,
    hostnames: Mutex<HashMap<String, String>>,
    failing: Mutex<Vec<(String, String)>>,
    dropping: Mutex<Vec<(String, String)>>,
    changed_keys: Mutex<HashSet<String>>,
    refused: Mutex<HashSet<String>>,
    join_token: Mutex<String>,
}

/// Remote executor that records what it is asked to do
///
/// Every command succeeds with empty output unless scripted otherwise.
/// `cat /etc/hostname` answers with the hostname set for the host (or
/// `localhost`), and the swarm join-token command with the join token.
#[derive(Debug, Clone, Default)]
pub struct MockRemote {
    state: Arc<RemoteState>,
}

impl MockRemote {
    pub fn new() -> Self {
        let remote = Self::default();
        remote.set_join_token("SWMTKN-1-test");
        remote
    }

    pub fn set_hostname(&self, address: &str, hostname: &str) {
        lock(&self.state.hostnames).insert(address.to_string(), hostname.to_string());
    }

    pub fn set_join_token(&self, token: &str) {
        *lock(&self.state.join_token) = token.to_string();
    }

    /// Commands on `address` containing `pattern` exit with status 1
    pub fn fail_command(&self, address: &str, pattern: &str) {
        lock(&self.state.failing).push((address.to_string(), pattern.to_string()));
    }

    /// Commands on `address` containing `pattern` lose the connection
    pub fn drop_connection_on(&self, address: &str, pattern: &str) {
        lock(&self.state.dropping).push((address.to_string(), pattern.to_string()));
    }

    /// The next login to `address` reports a changed host key
    pub fn change_host_key(&self, address: &str) {
        lock(&self.state.changed_keys).insert(address.to_string());
    }

    /// Every login to `address` is refused
    pub fn refuse_connections(&self, address: &str) {
        lock(&self.state.refused).insert(address.to_string());
    }

    pub fn commands_for(&self, address: &str) -> Vec<String> {
        lock(&self.state.commands)
            .iter()
            .filter(|(host, _)| host == address)
            .map(|(_, command)| command.clone())
            .collect()
    }

    /// Uploaded `(path, content)` pairs for `address`
    pub fn files_for(&self, address: &str) -> Vec<(String, String)> {
        lock(&self.state.files)
            .iter()
            .filter(|(host, _, _)| host == address)
            .map(|(_, path, content)| (path.clone(), content.clone()))
            .collect()
    }

    pub fn connect_count(&self, address: &str) -> usize {
        lock(&self.state.endpoints)
            .iter()
            .filter(|endpoint| endpoint.address == address)
            .count()
    }

    pub fn last_endpoint(&self, address: &str) -> Option<Endpoint> {
        lock(&self.state.endpoints)
            .iter()
            .rev()
            .find(|endpoint| endpoint.address == address)
            .cloned()
    }
}

#[async_trait]
impl RemoteExecutor for MockRemote {
    async fn connect(&self, endpoint: &Endpoint) -> metalstrap_remote::Result<Box<dyn RemoteSession>> {
        lock(&self.state.endpoints).push(endpoint.clone());
        let address = endpoint.address.clone();

        if lock(&self.state.refused).contains(&address) {
            return Err(RemoteError::ConnectionFailed {
                host: address,
                message: "connection refused".to_string(),
            });
        }
        if lock(&self.state.changed_keys).remove(&address) {
            return Err(RemoteError::HostKeyMismatch { host: address });
        }
        Ok(Box::new(MockSession {
            address,
            state: self.state.clone(),
        }))
    }
}

struct MockSession {
    address: String,
    state: Arc<RemoteState>,
}

impl MockSession {
    fn matches(&self, scripted: &Mutex<Vec<(String, String)>>, command: &str) -> bool {
        lock(scripted)
            .iter()
            .any(|(host, pattern)| *host == self.address && command.contains(pattern.as_str()))
    }
}

#[async_trait]
impl RemoteSession for MockSession {
    async fn exec(&self, command: &str) -> metalstrap_remote::Result<CommandOutput> {
        lock(&self.state.commands).push((self.address.clone(), command.to_string()));

        if self.matches(&self.state.dropping, command) {
            return Err(RemoteError::ConnectionFailed {
                host: self.address.clone(),
                message: "connection closed by remote host".to_string(),
            });
        }
        if self.matches(&self.state.failing, command) {
            return Ok(CommandOutput {
                stdout: String::new(),
                stderr: "scripted failure".to_string(),
                exit_code: 1,
            });
        }
        if command == crate::actions::HOSTNAME_COMMAND {
            let hostname = lock(&self.state.hostnames)
                .get(&self.address)
                .cloned()
                .unwrap_or_else(|| "localhost".to_string());
            return Ok(CommandOutput::ok(format!("{hostname}\n")));
        }
        if command == crate::actions::SWARM_JOIN_TOKEN {
            let token = lock(&self.state.join_token).clone();
            return Ok(CommandOutput::ok(format!("{token}\n")));
        }
        Ok(CommandOutput::ok(""))
    }

    async fn put_file(&self, path: &str, content: &str) -> metalstrap_remote::Result<()> {
        lock(&self.state.files).push((
            self.address.clone(),
            path.to_string(),
            content.to_string(),
        ));
        Ok(())
    }
}

/// known_hosts that only records calls
#[derive(Debug, Default)]
pub struct MockKnownHosts {
    calls: Mutex<Vec<String>>,
}

impl MockKnownHosts {
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl KnownHosts for MockKnownHosts {
    async fn forget(&self, host: &str) -> metalstrap_remote::Result<()> {
        lock(&self.calls).push(format!("forget {host}"));
        Ok(())
    }

    async fn remember(&self, host: &str) -> metalstrap_remote::Result<()> {
        lock(&self.calls).push(format!("remember {host}"));
        Ok(())
    }
}

/// Local shell that records scripts instead of running them
#[derive(Debug, Default)]
pub struct MockShell {
    scripts: Mutex<Vec<String>>,
    fail: Mutex<bool>,
}

impl MockShell {
    pub fn scripts(&self) -> Vec<String> {
        lock(&self.scripts).clone()
    }

    /// Make every script exit with status 1
    pub fn fail_all(&self) {
        *lock(&self.fail) = true;
    }
}

#[async_trait]
impl LocalShell for MockShell {
    async fn run(&self, script: &str) -> metalstrap_remote::Result<CommandOutput> {
        lock(&self.scripts).push(script.to_string());
        if *lock(&self.fail) {
            return Err(RemoteError::CommandFailed {
                command: script.to_string(),
                status: 1,
                stderr: "scripted failure".to_string(),
            });
        }
        Ok(CommandOutput::ok(""))
    }
}

/// Prober whose answer for each address flips on every probe, starting
/// reachable
///
/// Both wait loops finish within two probes.
#[derive(Debug, Default)]
pub struct FlappingProber {
    probes: Mutex<HashMap<String, u32>>,
}

impl FlappingProber {
    pub fn probes(&self, address: &str) -> u32 {
        lock(&self.probes).get(address).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Prober for FlappingProber {
    async fn is_reachable(&self, address: &str, _port: u16, _timeout: Duration) -> bool {
        let mut probes = lock(&self.probes);
        let count = probes.entry(address.to_string()).or_insert(0);
        *count += 1;
        *count % 2 == 1
    }
}

/// One of each mock, shared with the [`Services`] they back
#[derive(Debug, Clone)]
pub struct MockServices {
    pub provider: Arc<MockProvider>,
    pub remote: MockRemote,
    pub known_hosts: Arc<MockKnownHosts>,
    pub local: Arc<MockShell>,
    pub prober: Arc<FlappingProber>,
}

impl Default for MockServices {
    fn default() -> Self {
        Self::new()
    }
}

impl MockServices {
    pub fn new() -> Self {
        Self {
            provider: Arc::new(MockProvider::new()),
            remote: MockRemote::new(),
            known_hosts: Arc::new(MockKnownHosts::default()),
            local: Arc::new(MockShell::default()),
            prober: Arc::new(FlappingProber::default()),
        }
    }

    pub fn services(&self) -> Services {
        Services {
            provider: self.provider.clone(),
            remote: Arc::new(self.remote.clone()),
            known_hosts: self.known_hosts.clone(),
            local: self.local.clone(),
            prober: self.prober.clone(),
        }
    }
}

/// A context for `config` with fast settings and the test discovery token
pub fn target_context_with(mocks: &MockServices, config: TargetConfig) -> TargetContext {
    TargetContext::new(
        Target::with_default_actions(config),
        mocks.services(),
        Arc::new(fast_settings()),
        TEST_DISCOVERY_TOKEN,
    )
}

/// A context for a minimal target at `address`
pub fn target_context(mocks: &MockServices, address: &str, hostname: &str) -> TargetContext {
    target_context_with(
        mocks,
        TargetConfig::new(address, hostname, "hostname: {{ hostname }}\n"),
    )
}
