// ABOUTME: Integration tests for the SSH connection pool.
// ABOUTME: Runs against the scripted fake connector from tests/support.

mod support;

use std::sync::Arc;
use std::time::Duration;

use support::{FakeConnector, host};
use swarmctl::ssh::{ConnectionPool, SessionState};
use swarmctl::store::{HostStore, MemoryStore};
use swarmctl::types::{HostId, HostStatus};

fn pool_with(connector: &FakeConnector, store: &Arc<MemoryStore>) -> ConnectionPool {
    ConnectionPool::new(Arc::new(connector.clone()), store.clone())
}

#[tokio::test]
async fn second_acquire_reuses_session() {
    support::init_tracing();
    let connector = FakeConnector::new();
    let store = Arc::new(MemoryStore::seeded([host("h1", 0, 5)], [], []));
    let pool = pool_with(&connector, &store);
    let h1 = host("h1", 0, 5);

    {
        let session = pool.acquire(&h1).await.unwrap();
        session.exec("uptime").await.unwrap();
    }
    {
        let session = pool.acquire(&h1).await.unwrap();
        session.exec("uptime").await.unwrap();
    }

    let recorded = connector.recorded();
    assert_eq!(recorded.connects.len(), 1);
    assert_eq!(recorded.commands.len(), 2);
    assert_eq!(pool.state(&h1.id), SessionState::Ready);
}

#[tokio::test]
async fn errored_session_reconnects_on_next_acquire() {
    let connector = FakeConnector::new();
    connector.fail_exec_matching("explode");
    let store = Arc::new(MemoryStore::new());
    let pool = pool_with(&connector, &store);
    let h1 = host("h1", 0, 5);

    {
        let session = pool.acquire(&h1).await.unwrap();
        assert!(session.exec("explode now").await.is_err());
    }
    assert!(matches!(pool.state(&h1.id), SessionState::Error(_)));

    let session = pool.acquire(&h1).await.unwrap();
    session.exec("uptime").await.unwrap();

    let recorded = connector.recorded();
    assert_eq!(recorded.connects.len(), 2);
    assert_eq!(recorded.disconnects.len(), 1, "stale session is dropped");
    assert_eq!(pool.state(&h1.id), SessionState::Ready);
}

#[tokio::test]
async fn connect_failure_sets_error_state() {
    let connector = FakeConnector::new();
    connector.fail_connect("no route to host");
    let store = Arc::new(MemoryStore::new());
    let pool = pool_with(&connector, &store);
    let h1 = host("h1", 0, 5);

    let err = pool.acquire(&h1).await.unwrap_err();
    assert!(err.to_string().contains("no route to host"));
    assert!(matches!(pool.state(&h1.id), SessionState::Error(_)));
}

#[tokio::test]
async fn same_host_commands_are_serialized() {
    let connector = FakeConnector::new();
    connector.delay_exec(Duration::from_millis(20));
    let store = Arc::new(MemoryStore::new());
    let pool = Arc::new(pool_with(&connector, &store));
    let h1 = host("h1", 0, 5);

    let tasks: Vec<_> = (0..4)
        .map(|i| {
            let pool = pool.clone();
            let h1 = h1.clone();
            tokio::spawn(async move {
                let session = pool.acquire(&h1).await.unwrap();
                session.exec(&format!("job {i}")).await.unwrap();
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(connector.max_concurrent_exec(), 1);
    assert_eq!(connector.recorded().connects.len(), 1);
}

#[tokio::test]
async fn different_hosts_run_in_parallel() {
    let connector = FakeConnector::new();
    connector.delay_exec(Duration::from_millis(50));
    let store = Arc::new(MemoryStore::new());
    let pool = Arc::new(pool_with(&connector, &store));

    let tasks: Vec<_> = ["h1", "h2", "h3"]
        .into_iter()
        .map(|id| {
            let pool = pool.clone();
            let target = host(id, 0, 5);
            tokio::spawn(async move {
                let session = pool.acquire(&target).await.unwrap();
                session.exec("sleep").await.unwrap();
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    assert!(connector.max_concurrent_exec() > 1);
    assert_eq!(connector.recorded().connects.len(), 3);
}

#[tokio::test]
async fn test_marks_host_online_and_offline() {
    let connector = FakeConnector::new();
    let store = Arc::new(MemoryStore::seeded([host("h1", 0, 5)], [], []));
    let pool = pool_with(&connector, &store);
    let id = HostId::new("h1");

    assert!(pool.test(&id).await);
    let record = store.get_host(&id).await.unwrap().unwrap();
    assert_eq!(record.status, HostStatus::Online);
    assert!(record.last_seen.is_some());

    pool.close(&id).await.unwrap();
    connector.fail_connect("refused");
    assert!(!pool.test(&id).await);
    let record = store.get_host(&id).await.unwrap().unwrap();
    assert_eq!(record.status, HostStatus::Offline);
}

#[tokio::test]
async fn test_unknown_host_is_false_without_connecting() {
    let connector = FakeConnector::new();
    let store = Arc::new(MemoryStore::new());
    let pool = pool_with(&connector, &store);

    assert!(!pool.test(&HostId::new("ghost")).await);
    assert!(connector.recorded().connects.is_empty());
}

#[tokio::test]
async fn close_is_safe_without_session_and_resets_state() {
    let connector = FakeConnector::new();
    let store = Arc::new(MemoryStore::new());
    let pool = pool_with(&connector, &store);
    let h1 = host("h1", 0, 5);

    pool.close(&h1.id).await.unwrap();
    assert_eq!(pool.state(&h1.id), SessionState::Absent);

    drop(pool.acquire(&h1).await.unwrap());
    pool.close(&h1.id).await.unwrap();
    pool.close(&h1.id).await.unwrap();

    assert_eq!(connector.recorded().disconnects.len(), 1);
    assert_eq!(pool.state(&h1.id), SessionState::Absent);
}

#[tokio::test]
async fn decommission_closes_and_deletes_host() {
    let connector = FakeConnector::new();
    let store = Arc::new(MemoryStore::seeded([host("h1", 0, 5)], [], []));
    let pool = pool_with(&connector, &store);
    let h1 = host("h1", 0, 5);

    drop(pool.acquire(&h1).await.unwrap());
    assert!(pool.decommission(&h1.id).await.unwrap());

    assert_eq!(connector.recorded().disconnects.len(), 1);
    assert!(store.get_host(&h1.id).await.unwrap().is_none());
}
