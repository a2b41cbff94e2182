// ABOUTME: Keyed registry of SSH sessions, at most one per host.
// ABOUTME: Per-host async mutex serializes connect and use; errored sessions reconnect on next acquire.

use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::client::CommandOutput;
use super::error::{Error, Result};
use super::transport::{Connector, RemoteShell};
use crate::model::Host;
use crate::store::HostStore;
use crate::types::{HostId, HostStatus};

/// Observable state of a host's pool entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Absent,
    Connecting,
    Ready,
    Error(String),
}

type Slot = Option<Box<dyn RemoteShell>>;

struct PoolEntry {
    state: Mutex<SessionState>,
    session: Arc<AsyncMutex<Slot>>,
}

impl PoolEntry {
    fn new() -> Self {
        Self {
            state: Mutex::new(SessionState::Absent),
            session: Arc::new(AsyncMutex::new(None)),
        }
    }

    fn set_state(&self, state: SessionState) {
        *self.state.lock() = state;
    }
}

/// Exclusive use of one host's session. Other callers for the same host wait
/// until this guard is dropped.
pub struct PooledSession {
    host_id: HostId,
    entry: Arc<PoolEntry>,
    slot: OwnedMutexGuard<Slot>,
}

impl std::fmt::Debug for PooledSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledSession")
            .field("host_id", &self.host_id)
            .finish()
    }
}

impl PooledSession {
    pub fn host_id(&self) -> &HostId {
        &self.host_id
    }

    pub async fn exec(&self, command: &str) -> Result<CommandOutput> {
        let shell = self.shell()?;
        let result = shell.exec(command).await;
        self.track(result)
    }

    pub async fn upload_file(&self, path: &str, content: &[u8]) -> Result<()> {
        let shell = self.shell()?;
        let result = shell.upload_file(path, content).await;
        self.track(result)
    }

    fn shell(&self) -> Result<&dyn RemoteShell> {
        self.slot.as_deref().ok_or(Error::ChannelClosed)
    }

    /// Transport failures poison the entry so the next acquire reconnects.
    /// A failed upload whose remote command ran is not a transport failure.
    fn track<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result
            && !matches!(e, Error::UploadFailed { .. })
        {
            tracing::warn!(host_id = %self.host_id, error = %e, "pooled session errored");
            self.entry.set_state(SessionState::Error(e.to_string()));
        }
        result
    }
}

pub struct ConnectionPool {
    connector: Arc<dyn Connector>,
    hosts: Arc<dyn HostStore>,
    entries: Mutex<HashMap<HostId, Arc<PoolEntry>>>,
}

impl ConnectionPool {
    pub fn new(connector: Arc<dyn Connector>, hosts: Arc<dyn HostStore>) -> Self {
        Self {
            connector,
            hosts,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entry(&self, host_id: &HostId) -> Arc<PoolEntry> {
        self.entries
            .lock()
            .entry(host_id.clone())
            .or_insert_with(|| Arc::new(PoolEntry::new()))
            .clone()
    }

    /// Get the host's session, connecting if absent or errored.
    pub async fn acquire(&self, host: &Host) -> Result<PooledSession> {
        let entry = self.entry(&host.id);
        let mut slot = entry.session.clone().lock_owned().await;

        let reusable = slot.as_ref().is_some_and(|s| !s.is_closed())
            && *entry.state.lock() == SessionState::Ready;

        if !reusable {
            if let Some(stale) = slot.take() {
                tracing::debug!(host_id = %host.id, "dropping errored session");
                let _ = stale.disconnect().await;
            }

            entry.set_state(SessionState::Connecting);
            tracing::debug!(host_id = %host.id, address = %host.address(), "opening SSH session");

            match self.connector.connect(host).await {
                Ok(shell) => {
                    *slot = Some(shell);
                    entry.set_state(SessionState::Ready);
                    tracing::info!(host_id = %host.id, address = %host.address(), "SSH session ready");
                }
                Err(e) => {
                    tracing::warn!(host_id = %host.id, error = %e, "SSH connection failed");
                    entry.set_state(SessionState::Error(e.to_string()));
                    return Err(e);
                }
            }
        }

        Ok(PooledSession {
            host_id: host.id.clone(),
            entry,
            slot,
        })
    }

    /// Cheap liveness probe. Never fails: any problem yields `false`.
    /// Records the outcome on the host's status.
    pub async fn test(&self, host_id: &HostId) -> bool {
        let host = match self.hosts.get_host(host_id).await {
            Ok(Some(host)) => host,
            Ok(None) => return false,
            Err(e) => {
                tracing::warn!(host_id = %host_id, error = %e, "host lookup failed");
                return false;
            }
        };

        let alive = match self.acquire(&host).await {
            Ok(session) => match session.exec("echo ok").await {
                Ok(output) => output.success() && output.stdout.trim() == "ok",
                Err(_) => false,
            },
            Err(_) => false,
        };

        let (status, seen) = if alive {
            (HostStatus::Online, Some(Utc::now()))
        } else {
            (HostStatus::Offline, None)
        };
        if let Err(e) = self.hosts.set_host_status(host_id, status, seen).await {
            tracing::warn!(host_id = %host_id, error = %e, "failed to record host status");
        }

        alive
    }

    /// Release the host's session. Safe on hosts with no session.
    pub async fn close(&self, host_id: &HostId) -> Result<()> {
        let entry = match self.entries.lock().get(host_id) {
            Some(entry) => entry.clone(),
            None => return Ok(()),
        };

        let mut slot = entry.session.lock().await;
        let result = match slot.take() {
            Some(shell) => shell.disconnect().await,
            None => Ok(()),
        };
        entry.set_state(SessionState::Absent);
        tracing::debug!(host_id = %host_id, "SSH session closed");
        result
    }

    /// Close every pooled session, logging failures.
    pub async fn close_all(&self) {
        let ids: Vec<HostId> = self.entries.lock().keys().cloned().collect();
        for id in ids {
            if let Err(e) = self.close(&id).await {
                tracing::warn!(host_id = %id, error = %e, "failed to close SSH session");
            }
        }
    }

    /// Close the host's session, then delete the host record.
    pub async fn decommission(&self, host_id: &HostId) -> crate::store::Result<bool> {
        if let Err(e) = self.close(host_id).await {
            tracing::warn!(host_id = %host_id, error = %e, "disconnect failed during decommission");
        }
        self.entries.lock().remove(host_id);
        self.hosts.delete_host(host_id).await
    }

    pub fn state(&self, host_id: &HostId) -> SessionState {
        self.entries
            .lock()
            .get(host_id)
            .map(|e| e.state.lock().clone())
            .unwrap_or(SessionState::Absent)
    }
}
