//! End-to-end runs over scripted collaborators

use async_trait::async_trait;
use metalstrap_actions::testing::{fast_settings, MockServices};
use metalstrap_actions::{
    ActionKind, CollectingReporter, ErrorKind, Phase, PipelineEvent, TargetConfig,
    DEFAULT_SEQUENCE,
};
use metalstrap_provider::{DiscoveryTokenSource, ProviderError};
use metalstrap_workflow::{HostOutcome, Orchestrator, Role, RunError, RunOptions};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const TOKEN: &str = "https://discovery.etcd.io/3e86b59982e49066c5d813af1c2e2579";

#[derive(Default)]
struct CountingDiscovery {
    calls: AtomicUsize,
}

impl CountingDiscovery {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DiscoveryTokenSource for CountingDiscovery {
    async fn fetch_token(&self) -> metalstrap_provider::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(TOKEN.to_string())
    }
}

struct BrokenDiscovery;

#[async_trait]
impl DiscoveryTokenSource for BrokenDiscovery {
    async fn fetch_token(&self) -> metalstrap_provider::Result<String> {
        Err(ProviderError::UnexpectedResponse("empty discovery token".to_string()))
    }
}

struct Harness {
    mocks: MockServices,
    discovery: Arc<CountingDiscovery>,
    reporter: Arc<CollectingReporter>,
    orchestrator: Orchestrator,
}

/// Hosts `10.0.0.{i}` named `node-{i}`, reporting their own hostname
fn harness(hosts: &[(u8, bool)]) -> Harness {
    let mocks = MockServices::new();
    let discovery = Arc::new(CountingDiscovery::default());
    let reporter = Arc::new(CollectingReporter::new());
    let mut orchestrator = Orchestrator::new(mocks.services(), discovery.clone())
        .with_settings(fast_settings())
        .with_reporter(reporter.clone());

    for (i, manager) in hosts {
        let ip = format!("10.0.0.{i}");
        let hostname = format!("node-{i}");
        mocks.remote.set_hostname(&ip, &hostname);
        orchestrator
            .add_target(
                TargetConfig::new(&ip, &hostname, "hostname: {{ hostname }}\n")
                    .with_manager(*manager),
            )
            .unwrap();
    }

    Harness {
        mocks,
        discovery,
        reporter,
        orchestrator,
    }
}

/// Position of the first and last event for `host`
fn span_of(events: &[PipelineEvent], host: &str) -> (usize, usize) {
    let positions: Vec<usize> = events
        .iter()
        .enumerate()
        .filter(|(_, event)| event.host() == host)
        .map(|(i, _)| i)
        .collect();
    (positions[0], *positions.last().unwrap())
}

#[tokio::test]
async fn cluster_manager_finishes_before_workers_start() {
    let h = harness(&[(1, false), (2, true), (3, false)]);
    h.mocks.remote.set_join_token("SWMTKN-1-cluster");

    let summary = h.orchestrator.run(RunOptions { cluster: true }).await.unwrap();
    assert!(summary.is_success(), "{summary}");

    // Flagged manager first, then workers in configuration order
    let roles: Vec<(&str, Role)> = summary
        .hosts
        .iter()
        .map(|host| (host.address.as_str(), host.role))
        .collect();
    assert_eq!(
        roles,
        vec![
            ("10.0.0.2", Role::Manager),
            ("10.0.0.1", Role::Worker),
            ("10.0.0.3", Role::Worker),
        ]
    );

    let events = h.reporter.events();
    let (_, manager_last) = span_of(&events, "10.0.0.2");
    let manager_steps = events
        .iter()
        .filter(|e| e.host() == "10.0.0.2" && e.phase() == Some(Phase::Finished))
        .count();
    assert_eq!(manager_steps, DEFAULT_SEQUENCE.len());
    for worker in ["10.0.0.1", "10.0.0.3"] {
        let (worker_first, _) = span_of(&events, worker);
        assert!(manager_last < worker_first, "{worker} started before the manager finished");
    }

    // Both workers join with the same credential
    let join = "docker swarm join --token 'SWMTKN-1-cluster' '10.0.0.2'";
    for worker in ["10.0.0.1", "10.0.0.3"] {
        let commands = h.mocks.remote.commands_for(worker);
        assert_eq!(commands.iter().filter(|c| *c == join).count(), 1);
    }
    assert!(h
        .mocks
        .remote
        .commands_for("10.0.0.2")
        .contains(&"docker swarm init".to_string()));

    assert_eq!(h.discovery.calls(), 1);
    assert_eq!(summary.discovery_token, TOKEN);
}

#[tokio::test]
async fn first_target_promoted_when_none_flagged() {
    let h = harness(&[(1, false), (2, false)]);

    let summary = h.orchestrator.run(RunOptions { cluster: true }).await.unwrap();
    assert_eq!(summary.hosts[0].address, "10.0.0.1");
    assert_eq!(summary.hosts[0].role, Role::Manager);
    assert_eq!(summary.hosts[1].role, Role::Worker);
}

#[tokio::test]
async fn manager_failure_starts_no_worker() {
    let h = harness(&[(1, true), (2, false), (3, false)]);
    h.mocks.remote.fail_command("10.0.0.1", "docker swarm init");

    let err = h
        .orchestrator
        .run(RunOptions { cluster: true })
        .await
        .unwrap_err();
    match err {
        RunError::ManagerFailed { host, action, .. } => {
            assert_eq!(host, "10.0.0.1");
            assert_eq!(action, ActionKind::DockerSwarm);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    for worker in ["10.0.0.2", "10.0.0.3"] {
        assert!(h.reporter.events_for(worker).is_empty());
        assert_eq!(h.mocks.remote.connect_count(worker), 0);
        assert!(!h.mocks.provider.calls().iter().any(|c| c.contains(worker)));
    }
}

#[tokio::test]
async fn manager_failing_early_starts_no_worker() {
    let h = harness(&[(1, false), (2, false)]);
    h.mocks.provider.fail_reset_for("10.0.0.1", u32::MAX);

    let err = h
        .orchestrator
        .run(RunOptions { cluster: true })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RunError::ManagerFailed {
            action: ActionKind::Reset,
            ..
        }
    ));
    assert!(h.reporter.events_for("10.0.0.2").is_empty());
}

#[tokio::test]
async fn manager_without_swarm_step_is_fatal() {
    let mocks = MockServices::new();
    mocks.remote.set_hostname("10.0.0.1", "node-1");
    let discovery = Arc::new(CountingDiscovery::default());
    let mut orchestrator =
        Orchestrator::new(mocks.services(), discovery).with_settings(fast_settings());
    orchestrator
        .add_target(
            TargetConfig::new("10.0.0.1", "node-1", "x")
                .with_manager(true)
                .with_actions(vec![ActionKind::VerifyInstallation]),
        )
        .unwrap();
    orchestrator
        .add_target(TargetConfig::new("10.0.0.2", "node-2", "x"))
        .unwrap();

    let err = orchestrator
        .run(RunOptions { cluster: true })
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::CredentialNotPublished { .. }));
    assert_eq!(mocks.remote.connect_count("10.0.0.2"), 0);
}

#[tokio::test]
async fn independent_hosts_fail_alone() {
    let h = harness(&[(1, false), (2, false), (3, false)]);
    h.mocks.remote.fail_command("10.0.0.2", "coreos-install -d");

    let summary = h.orchestrator.run(RunOptions::default()).await.unwrap();

    assert!(!summary.is_success());
    let succeeded: Vec<&str> = summary.succeeded().map(|h| h.address.as_str()).collect();
    assert_eq!(succeeded, vec!["10.0.0.1", "10.0.0.3"]);

    let failed = summary.host("10.0.0.2").unwrap();
    assert_eq!(failed.role, Role::Standalone);
    match &failed.outcome {
        HostOutcome::Failed { action, kind, .. } => {
            assert_eq!(*action, ActionKind::InstallImage);
            assert_eq!(*kind, ErrorKind::Transport);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(failed.steps.len(), 6);
    assert!(!h
        .mocks
        .remote
        .commands_for("10.0.0.2")
        .contains(&"reboot".to_string()));

    // Non-cluster mode never touches the swarm
    for host in ["10.0.0.1", "10.0.0.3"] {
        assert!(!h
            .mocks
            .remote
            .commands_for(host)
            .iter()
            .any(|c| c.starts_with("docker swarm")));
    }

    assert_eq!(h.discovery.calls(), 1);
    assert_eq!(summary.discovery_token, TOKEN);
}

#[tokio::test]
async fn steps_never_overlap_within_a_host() {
    let h = harness(&[(1, false), (2, false)]);

    h.orchestrator.run(RunOptions::default()).await.unwrap();

    for host in ["10.0.0.1", "10.0.0.2"] {
        let events = h.reporter.events_for(host);
        assert_eq!(events.len(), DEFAULT_SEQUENCE.len() * 2);
        for (step, pair) in events.chunks(2).enumerate() {
            assert_eq!(pair[0].phase(), Some(Phase::Start));
            assert_eq!(pair[1].phase(), Some(Phase::Finished));
            assert_eq!(pair[0].action(), DEFAULT_SEQUENCE[step]);
            assert_eq!(pair[1].action(), DEFAULT_SEQUENCE[step]);
        }
    }
}

#[tokio::test]
async fn token_failure_stops_run_before_any_host() {
    let mocks = MockServices::new();
    let mut orchestrator = Orchestrator::new(mocks.services(), Arc::new(BrokenDiscovery));
    orchestrator
        .add_target(TargetConfig::new("10.0.0.1", "node-1", "x"))
        .unwrap();

    let err = orchestrator.run(RunOptions::default()).await.unwrap_err();
    assert!(matches!(err, RunError::DiscoveryToken(_)));
    assert!(mocks.provider.calls().is_empty());
    assert!(mocks.known_hosts.calls().is_empty());
}

#[tokio::test]
async fn invalid_partitions_fail_before_token() {
    let h = harness(&[(1, true), (2, true)]);
    let err = h
        .orchestrator
        .run(RunOptions { cluster: true })
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::MultipleManagers(_)));
    assert_eq!(h.discovery.calls(), 0);

    let empty = harness(&[]);
    let err = empty
        .orchestrator
        .run(RunOptions { cluster: true })
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::NoTargets));
    assert_eq!(empty.discovery.calls(), 0);
}

#[tokio::test]
async fn add_target_validates_configuration() {
    let mocks = MockServices::new();
    let mut orchestrator = Orchestrator::new(mocks.services(), Arc::new(CountingDiscovery::default()));

    let err = orchestrator
        .add_target(TargetConfig::new("10.0.0.1", "node-1", ""))
        .unwrap_err();
    assert!(err.to_string().contains("no cloud config provided for 10.0.0.1"));
    assert!(orchestrator.targets().is_empty());
}
