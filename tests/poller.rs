// ABOUTME: Integration tests for the swarm poller.
// ABOUTME: Swarm APIs are served by mockito; unreachable and hung swarms use local sockets.

mod support;

use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;

use support::swarm;
use swarmctl::monitor::{PollerSettings, ProbeError, SwarmPoller};
use swarmctl::store::{MemoryStore, SwarmStore};
use swarmctl::types::{SwarmId, SwarmStatus};

fn poller(store: &Arc<MemoryStore>, request_timeout: Duration) -> SwarmPoller {
    SwarmPoller::new(
        store.clone(),
        PollerSettings {
            request_timeout,
            ..Default::default()
        },
    )
    .unwrap()
}

async fn get(store: &MemoryStore, id: &str) -> swarmctl::model::Swarm {
    store.get_swarm(&SwarmId::new(id)).await.unwrap().unwrap()
}

const HEALTHY: &str = r#"{
    "status": "online",
    "uptime_seconds": 3600,
    "resources": {"cpu_percent": 35.5, "memory_percent": 60.0, "disk_percent": 40.0},
    "agents": {"total": 4, "active": 3, "idle": 1, "failed": 0}
}"#;

#[tokio::test]
async fn healthy_swarm_is_online_with_metrics() {
    support::init_tracing();
    let mut server = mockito::Server::new_async().await;
    let status = server
        .mock("GET", "/status")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(HEALTHY)
        .create_async()
        .await;
    let completion = server
        .mock("GET", "/project/completion")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"completion_percentage": 42.5}"#)
        .create_async()
        .await;

    let store = Arc::new(MemoryStore::seeded(
        [],
        [swarm("s1", &server.url(), SwarmStatus::Offline, None)],
        [],
    ));
    let summary = poller(&store, Duration::from_secs(5)).poll_once().await;

    status.assert_async().await;
    completion.assert_async().await;
    assert_eq!(summary.polled, 1);
    assert_eq!(summary.online, 1);
    assert_eq!(summary.marked_stale, 0);

    let s1 = get(&store, "s1").await;
    assert_eq!(s1.status, SwarmStatus::Online);
    assert_eq!(s1.active_agents, 3);
    assert_eq!(s1.project_completion, Some(42.5));
    assert_eq!(s1.health.unwrap().cpu_percent, 35.5);
    assert!(s1.last_seen.is_some());
}

#[tokio::test]
async fn overloaded_swarm_is_degraded() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/status")
        .with_status(200)
        .with_body(r#"{"status": "online", "resources": {"cpu_percent": 95.0, "memory_percent": 50.0}}"#)
        .create_async()
        .await;

    let store = Arc::new(MemoryStore::seeded(
        [],
        [swarm("s1", &server.url(), SwarmStatus::Online, Some(Utc::now()))],
        [],
    ));
    let summary = poller(&store, Duration::from_secs(5)).poll_once().await;

    assert_eq!(summary.degraded, 1);
    let s1 = get(&store, "s1").await;
    assert_eq!(s1.status, SwarmStatus::Degraded);
    assert_eq!(s1.project_completion, None, "completion endpoint missing is tolerated");
}

#[tokio::test]
async fn server_error_marks_offline_and_clears_metrics() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/status")
        .with_status(500)
        .create_async()
        .await;

    let mut seeded = swarm("s1", &server.url(), SwarmStatus::Online, Some(Utc::now()));
    seeded.health = Some(Default::default());
    let store = Arc::new(MemoryStore::seeded([], [seeded], []));

    let summary = poller(&store, Duration::from_secs(5)).poll_once().await;

    assert_eq!(summary.offline, 1);
    let s1 = get(&store, "s1").await;
    assert_eq!(s1.status, SwarmStatus::Offline);
    assert!(s1.health.is_none());
}

#[tokio::test]
async fn hung_swarm_times_out() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let hold = tokio::spawn(async move {
        let mut open = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            open.push(socket);
        }
    });

    let store = Arc::new(MemoryStore::seeded(
        [],
        [swarm("s1", &url, SwarmStatus::Online, Some(Utc::now()))],
        [],
    ));
    let poller = poller(&store, Duration::from_millis(200));

    let err = poller.probe(&get(&store, "s1").await).await.unwrap_err();
    assert!(matches!(err, ProbeError::Timeout { .. }), "{err:?}");

    poller.poll_once().await;
    assert_eq!(get(&store, "s1").await.status, SwarmStatus::Offline);
    hold.abort();
}

#[tokio::test]
async fn one_bad_swarm_does_not_block_the_others() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/status")
        .with_status(200)
        .with_body(HEALTHY)
        .create_async()
        .await;

    let store = Arc::new(MemoryStore::seeded(
        [],
        [
            swarm("good", &server.url(), SwarmStatus::Offline, None),
            swarm("bad", "http://127.0.0.1:1", SwarmStatus::Online, Some(Utc::now())),
        ],
        [],
    ));
    let summary = poller(&store, Duration::from_secs(2)).poll_once().await;

    assert_eq!(summary.polled, 2);
    assert_eq!(summary.online, 1);
    assert_eq!(summary.offline, 1);
    assert_eq!(get(&store, "good").await.status, SwarmStatus::Online);
    assert_eq!(get(&store, "bad").await.status, SwarmStatus::Offline);
}

#[tokio::test]
async fn stale_swarm_is_forced_offline() {
    let store = Arc::new(MemoryStore::new());
    // Probe fails, so the poll cycle itself writes offline; last_seen stays old.
    store
        .create_swarm(swarm(
            "old",
            "http://127.0.0.1:1",
            SwarmStatus::Online,
            Some(Utc::now() - ChronoDuration::seconds(120)),
        ))
        .await
        .unwrap();

    poller(&store, Duration::from_secs(1)).poll_once().await;

    let old = get(&store, "old").await;
    assert_eq!(old.status, SwarmStatus::Offline);
}

#[tokio::test]
async fn empty_fleet_polls_nothing() {
    let store = Arc::new(MemoryStore::new());
    let summary = poller(&store, Duration::from_secs(1)).poll_once().await;
    assert_eq!(summary, Default::default());
}
