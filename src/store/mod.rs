// ABOUTME: Persistence boundary for hosts, swarms, deployments, and audit logs.
// ABOUTME: Async, object-safe traits; MemoryStore is the in-process implementation.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::{AuditEntry, Deployment, Host, Swarm, SwarmUpdate};
use crate::types::{
    DeploymentId, DeploymentStatus, HostId, HostStatus, InvalidTransition, SwarmId, SwarmStatus,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("host {0} has reached maximum swarm capacity")]
    CapacityExceeded(HostId),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait HostStore: Send + Sync {
    async fn get_host(&self, id: &HostId) -> Result<Option<Host>>;

    async fn list_hosts(&self) -> Result<Vec<Host>>;

    /// Hosts with `current_swarms < capacity_max_swarms`.
    async fn hosts_with_capacity(&self) -> Result<Vec<Host>>;

    async fn upsert_host(&self, host: Host) -> Result<()>;

    async fn set_host_status(
        &self,
        id: &HostId,
        status: HostStatus,
        last_seen: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Increment `current_swarms` if the host still has capacity.
    /// Returns the new count.
    async fn increment_swarm_count(&self, id: &HostId) -> Result<u32>;

    async fn delete_host(&self, id: &HostId) -> Result<bool>;
}

#[async_trait]
pub trait SwarmStore: Send + Sync {
    async fn get_swarm(&self, id: &SwarmId) -> Result<Option<Swarm>>;

    async fn list_swarms(&self) -> Result<Vec<Swarm>>;

    async fn list_swarms_by_status(&self, status: SwarmStatus) -> Result<Vec<Swarm>>;

    async fn create_swarm(&self, swarm: Swarm) -> Result<()>;

    async fn update_swarm(&self, id: &SwarmId, update: SwarmUpdate) -> Result<()>;

    /// Force `offline` every swarm not seen since `cutoff` (or never seen)
    /// that is not already offline. Returns the swarms that changed.
    async fn mark_stale_offline(&self, cutoff: DateTime<Utc>) -> Result<Vec<SwarmId>>;
}

#[async_trait]
pub trait DeploymentStore: Send + Sync {
    async fn get_deployment(&self, id: &DeploymentId) -> Result<Option<Deployment>>;

    async fn save_deployment(&self, deployment: Deployment) -> Result<()>;

    /// Apply a checked status transition.
    async fn update_deployment_status(
        &self,
        id: &DeploymentId,
        status: DeploymentStatus,
    ) -> Result<()>;
}

#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, entry: AuditEntry) -> Result<()>;

    async fn entries_for_host(&self, host_id: &HostId) -> Result<Vec<AuditEntry>>;
}
