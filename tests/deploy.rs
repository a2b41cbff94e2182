// ABOUTME: Integration tests for the deployment orchestrator.
// ABOUTME: Drives full draft deployments over the fake SSH transport and checks store effects.

mod support;

use std::sync::Arc;
use std::time::Duration;

use support::{FakeConnector, draft, host};
use swarmctl::deploy::{DeployError, DeployErrorKind, DeploySettings, Orchestrator};
use swarmctl::diagnostics::WarningKind;
use swarmctl::model::{AgentRoster, AgentSpec, Deployment};
use swarmctl::ssh::ConnectionPool;
use swarmctl::store::{DeploymentStore, HostStore, MemoryStore, SwarmStore};
use swarmctl::types::{DeploymentId, DeploymentStatus, HostId, ProgressStatus, SwarmStatus};

struct Harness {
    connector: FakeConnector,
    store: Arc<MemoryStore>,
    orchestrator: Arc<Orchestrator>,
}

fn harness_with(deployments: Vec<Deployment>, current: u32, capacity: u32) -> Harness {
    support::init_tracing();
    let connector = FakeConnector::new();
    let store = Arc::new(MemoryStore::seeded(
        [host("h1", current, capacity)],
        [],
        deployments,
    ));
    let pool = Arc::new(ConnectionPool::new(
        Arc::new(connector.clone()),
        store.clone(),
    ));
    let settings = DeploySettings {
        control_plane_url: Some("https://control.test/".to_string()),
        heartbeat_api_key: Some("hb-key".to_string()),
        ..Default::default()
    };
    let orchestrator = Arc::new(Orchestrator::new(
        pool,
        store.clone(),
        store.clone(),
        store.clone(),
        settings,
    ));
    Harness {
        connector,
        store,
        orchestrator,
    }
}

async fn deployment_status(store: &MemoryStore, id: &str) -> DeploymentStatus {
    store
        .get_deployment(&DeploymentId::new(id))
        .await
        .unwrap()
        .unwrap()
        .status
}

async fn swarm_count(store: &MemoryStore) -> u32 {
    store
        .get_host(&HostId::new("h1"))
        .await
        .unwrap()
        .unwrap()
        .current_swarms
}

#[tokio::test]
async fn draft_deploys_onto_host_with_capacity() {
    let h = harness_with(vec![draft("d1", "h1")], 2, 10);
    let id = DeploymentId::new("d1");

    let report = h.orchestrator.deploy(&id).await.unwrap();

    assert_eq!(report.host_id, HostId::new("h1"));
    assert_eq!(report.host_url, "http://h1.example.com:8080");
    assert!(report.warnings.is_empty());
    assert_eq!(swarm_count(&h.store).await, 3);
    assert_eq!(deployment_status(&h.store, "d1").await, DeploymentStatus::Deployed);

    let swarm = h.store.get_swarm(&report.swarm_id).await.unwrap().unwrap();
    assert_eq!(swarm.name, "alpha");
    assert_eq!(swarm.status, SwarmStatus::Offline);
    assert_eq!(swarm.deployment_id, Some(id.clone()));

    let recorded = h.connector.recorded();
    assert_eq!(recorded.connects.len(), 1);
    assert_eq!(recorded.disconnects.len(), 1, "session closed exactly once");

    let progress = h.orchestrator.progress(&id).unwrap();
    assert_eq!(progress.status, ProgressStatus::Deployed);
    assert_eq!(progress.progress_percent, 100);
    assert!(!h.orchestrator.is_deploying(&id));
}

#[tokio::test]
async fn remote_steps_run_in_order() {
    let h = harness_with(vec![draft("d1", "h1")], 0, 10);

    h.orchestrator.deploy(&DeploymentId::new("d1")).await.unwrap();

    let recorded = h.connector.recorded();
    let commands: Vec<&str> = recorded.commands.iter().map(|(_, c)| c.as_str()).collect();
    assert_eq!(commands.len(), 4);
    assert!(commands[0].starts_with("mkdir -p "));
    assert!(commands[1].starts_with("git clone --depth 1 --branch 'main' "));
    assert!(commands[1].contains("https://github.com/acme/widgets.git"));
    assert!(commands[2].contains("requirements.txt"));
    assert!(commands[3].contains("core.api_server"));
    assert!(commands[3].contains("--port 8080"));

    assert_eq!(recorded.uploads.len(), 1);
    assert!(recorded.uploads[0].1.ends_with("alpha/settings.ini"));
}

#[tokio::test]
async fn uploaded_settings_point_heartbeats_at_control_plane() {
    let h = harness_with(vec![draft("d1", "h1")], 0, 10);

    let report = h.orchestrator.deploy(&DeploymentId::new("d1")).await.unwrap();

    let ini = &h.connector.recorded().uploads[0].2;
    assert!(ini.contains(&format!("swarm_id = {}", report.swarm_id)));
    assert!(ini.contains("monitor_url = https://control.test/api/heartbeat"));
    assert!(ini.contains("api_key = hb-key"));
    assert!(ini.contains("github_repo = acme/widgets"));
}

#[tokio::test]
async fn full_host_is_rejected_without_changes() {
    let h = harness_with(vec![draft("d1", "h1")], 10, 10);

    let err = h
        .orchestrator
        .deploy(&DeploymentId::new("d1"))
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::HostAtCapacity));
    assert_eq!(err.to_string(), "Host has reached maximum swarm capacity");
    assert_eq!(swarm_count(&h.store).await, 10);
    assert_eq!(deployment_status(&h.store, "d1").await, DeploymentStatus::Failed);
    assert!(h.connector.recorded().connects.is_empty());
    assert!(h.store.list_swarms().await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_deployment_is_not_found() {
    let h = harness_with(vec![], 0, 10);

    let err = h
        .orchestrator
        .deploy(&DeploymentId::new("missing-id"))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Deployment not found");
    assert_eq!(err.kind(), DeployErrorKind::Rejected);
    assert!(h.orchestrator.progress(&DeploymentId::new("missing-id")).is_none());
}

#[tokio::test]
async fn incomplete_draft_stays_draft() {
    let mut incomplete = draft("d1", "h1");
    incomplete.customer = None;
    let h = harness_with(vec![incomplete], 0, 10);

    let err = h
        .orchestrator
        .deploy(&DeploymentId::new("d1"))
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::IncompleteSteps(5)));
    assert_eq!(deployment_status(&h.store, "d1").await, DeploymentStatus::Draft);
    assert!(h.connector.recorded().connects.is_empty());
}

#[tokio::test]
async fn deployed_deployment_cannot_be_redeployed() {
    let h = harness_with(vec![draft("d1", "h1")], 0, 10);
    let id = DeploymentId::new("d1");

    h.orchestrator.deploy(&id).await.unwrap();
    let err = h.orchestrator.deploy(&id).await.unwrap_err();

    assert!(matches!(err, DeployError::NotDraft(DeploymentStatus::Deployed)));
    assert_eq!(swarm_count(&h.store).await, 1);
}

#[tokio::test]
async fn failed_clone_marks_deployment_failed() {
    let h = harness_with(vec![draft("d1", "h1")], 2, 10);
    h.connector
        .respond("git clone", 128, "", "fatal: repository not found");
    let id = DeploymentId::new("d1");

    let err = h.orchestrator.deploy(&id).await.unwrap_err();

    match &err {
        DeployError::RemoteCommand {
            step,
            exit_code,
            stderr,
        } => {
            assert_eq!(*step, "Clone repository");
            assert_eq!(*exit_code, 128);
            assert!(stderr.contains("repository not found"));
        }
        other => panic!("expected RemoteCommand, got {other:?}"),
    }
    assert_eq!(err.kind(), DeployErrorKind::RemoteCommand);
    assert_eq!(deployment_status(&h.store, "d1").await, DeploymentStatus::Failed);
    assert_eq!(swarm_count(&h.store).await, 2);
    assert!(h.store.list_swarms().await.unwrap().is_empty());

    let progress = h.orchestrator.progress(&id).unwrap();
    assert_eq!(progress.status, ProgressStatus::Failed);
    assert_eq!(progress.progress_percent, 70);
    assert!(progress.error.unwrap().contains("Clone repository"));
}

#[tokio::test]
async fn connection_failure_is_a_transport_error() {
    let h = harness_with(vec![draft("d1", "h1")], 0, 10);
    h.connector.fail_connect("host unreachable");

    let err = h
        .orchestrator
        .deploy(&DeploymentId::new("d1"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), DeployErrorKind::Transport);
    assert_eq!(deployment_status(&h.store, "d1").await, DeploymentStatus::Failed);
}

#[tokio::test]
async fn invalid_repository_fails_before_connecting() {
    let mut bad = draft("d1", "h1");
    bad.repository.as_mut().unwrap().repository = "acme/widgets; rm -rf /".to_string();
    let h = harness_with(vec![bad], 0, 10);

    let err = h
        .orchestrator
        .deploy(&DeploymentId::new("d1"))
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::InvalidRepository(_)));
    assert!(h.connector.recorded().connects.is_empty());
}

#[tokio::test]
async fn concurrent_deploy_of_same_id_is_rejected() {
    let h = harness_with(vec![draft("d1", "h1")], 0, 10);
    h.connector.delay_exec(Duration::from_millis(50));
    let id = DeploymentId::new("d1");

    let first = {
        let orchestrator = h.orchestrator.clone();
        let id = id.clone();
        tokio::spawn(async move { orchestrator.deploy(&id).await })
    };
    while !h.orchestrator.is_deploying(&id) {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    let err = h.orchestrator.deploy(&id).await.unwrap_err();
    assert!(matches!(err, DeployError::AlreadyInProgress));

    first.await.unwrap().unwrap();
    assert_eq!(swarm_count(&h.store).await, 1);
}

#[tokio::test]
async fn progress_never_moves_backwards() {
    let h = harness_with(vec![draft("d1", "h1")], 0, 10);
    h.connector.delay_exec(Duration::from_millis(10));
    let id = DeploymentId::new("d1");

    let run = {
        let orchestrator = h.orchestrator.clone();
        let id = id.clone();
        tokio::spawn(async move { orchestrator.deploy(&id).await })
    };

    let mut seen = Vec::new();
    while !run.is_finished() {
        if let Some(progress) = h.orchestrator.progress(&id) {
            seen.push(progress.progress_percent);
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    run.await.unwrap().unwrap();
    seen.push(h.orchestrator.progress(&id).unwrap().progress_percent);

    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
    assert_eq!(seen.last(), Some(&100));
}

#[tokio::test]
async fn disconnect_failure_is_a_warning() {
    let h = harness_with(vec![draft("d1", "h1")], 0, 10);
    h.connector.fail_disconnect();

    let report = h.orchestrator.deploy(&DeploymentId::new("d1")).await.unwrap();

    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].kind, WarningKind::SshDisconnect);
    assert_eq!(deployment_status(&h.store, "d1").await, DeploymentStatus::Deployed);
}

#[tokio::test]
async fn all_agents_disabled_is_a_warning() {
    let mut quiet = draft("d1", "h1");
    quiet.agents = Some(AgentRoster {
        agents: nonempty::nonempty![AgentSpec {
            name: "planner".to_string(),
            role: "planning".to_string(),
            enabled: false,
        }],
    });
    let h = harness_with(vec![quiet], 0, 10);

    let report = h.orchestrator.deploy(&DeploymentId::new("d1")).await.unwrap();

    assert!(
        report
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::NoEnabledAgents)
    );
}
