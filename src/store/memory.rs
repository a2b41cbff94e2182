// ABOUTME: In-process store implementing every persistence trait.
// ABOUTME: Backs the CLI (seeded from config) and tests; a relational store plugs in behind the same traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;

use super::{AuditLog, DeploymentStore, HostStore, Result, StoreError, SwarmStore};
use crate::model::{AuditEntry, Deployment, Host, Swarm, SwarmUpdate};
use crate::types::{DeploymentId, DeploymentStatus, HostId, HostStatus, SwarmId, SwarmStatus};

#[derive(Debug, Default)]
pub struct MemoryStore {
    hosts: RwLock<HashMap<HostId, Host>>,
    swarms: RwLock<HashMap<SwarmId, Swarm>>,
    deployments: RwLock<HashMap<DeploymentId, Deployment>>,
    audit: RwLock<Vec<AuditEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with records.
    pub fn seeded(
        hosts: impl IntoIterator<Item = Host>,
        swarms: impl IntoIterator<Item = Swarm>,
        deployments: impl IntoIterator<Item = Deployment>,
    ) -> Self {
        let store = Self::new();
        store
            .hosts
            .write()
            .extend(hosts.into_iter().map(|h| (h.id.clone(), h)));
        store
            .swarms
            .write()
            .extend(swarms.into_iter().map(|s| (s.id.clone(), s)));
        store
            .deployments
            .write()
            .extend(deployments.into_iter().map(|d| (d.id.clone(), d)));
        store
    }

    /// Every audit entry in append order.
    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.audit.read().clone()
    }
}

#[async_trait]
impl HostStore for MemoryStore {
    async fn get_host(&self, id: &HostId) -> Result<Option<Host>> {
        Ok(self.hosts.read().get(id).cloned())
    }

    async fn list_hosts(&self) -> Result<Vec<Host>> {
        let mut hosts: Vec<Host> = self.hosts.read().values().cloned().collect();
        hosts.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        Ok(hosts)
    }

    async fn hosts_with_capacity(&self) -> Result<Vec<Host>> {
        Ok(self
            .list_hosts()
            .await?
            .into_iter()
            .filter(Host::has_capacity)
            .collect())
    }

    async fn upsert_host(&self, host: Host) -> Result<()> {
        self.hosts.write().insert(host.id.clone(), host);
        Ok(())
    }

    async fn set_host_status(
        &self,
        id: &HostId,
        status: HostStatus,
        last_seen: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut hosts = self.hosts.write();
        let host = hosts
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("host", id))?;
        host.status = status;
        if last_seen.is_some() {
            host.last_seen = last_seen;
        }
        Ok(())
    }

    async fn increment_swarm_count(&self, id: &HostId) -> Result<u32> {
        let mut hosts = self.hosts.write();
        let host = hosts
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("host", id))?;
        if !host.has_capacity() {
            return Err(StoreError::CapacityExceeded(id.clone()));
        }
        host.current_swarms += 1;
        Ok(host.current_swarms)
    }

    async fn delete_host(&self, id: &HostId) -> Result<bool> {
        Ok(self.hosts.write().remove(id).is_some())
    }
}

#[async_trait]
impl SwarmStore for MemoryStore {
    async fn get_swarm(&self, id: &SwarmId) -> Result<Option<Swarm>> {
        Ok(self.swarms.read().get(id).cloned())
    }

    async fn list_swarms(&self) -> Result<Vec<Swarm>> {
        let mut swarms: Vec<Swarm> = self.swarms.read().values().cloned().collect();
        swarms.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        Ok(swarms)
    }

    async fn list_swarms_by_status(&self, status: SwarmStatus) -> Result<Vec<Swarm>> {
        Ok(self
            .list_swarms()
            .await?
            .into_iter()
            .filter(|s| s.status == status)
            .collect())
    }

    async fn create_swarm(&self, swarm: Swarm) -> Result<()> {
        let mut swarms = self.swarms.write();
        if swarms.contains_key(&swarm.id) {
            return Err(StoreError::Backend(format!(
                "swarm {} already exists",
                swarm.id
            )));
        }
        swarms.insert(swarm.id.clone(), swarm);
        Ok(())
    }

    async fn update_swarm(&self, id: &SwarmId, update: SwarmUpdate) -> Result<()> {
        let mut swarms = self.swarms.write();
        let swarm = swarms
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("swarm", id))?;
        update.apply(swarm);
        Ok(())
    }

    async fn mark_stale_offline(&self, cutoff: DateTime<Utc>) -> Result<Vec<SwarmId>> {
        let mut changed = Vec::new();
        for swarm in self.swarms.write().values_mut() {
            let stale = swarm.last_seen.is_none_or(|seen| seen < cutoff);
            if stale && swarm.status != SwarmStatus::Offline {
                swarm.status = SwarmStatus::Offline;
                changed.push(swarm.id.clone());
            }
        }
        Ok(changed)
    }
}

#[async_trait]
impl DeploymentStore for MemoryStore {
    async fn get_deployment(&self, id: &DeploymentId) -> Result<Option<Deployment>> {
        Ok(self.deployments.read().get(id).cloned())
    }

    async fn save_deployment(&self, deployment: Deployment) -> Result<()> {
        self.deployments
            .write()
            .insert(deployment.id.clone(), deployment);
        Ok(())
    }

    async fn update_deployment_status(
        &self,
        id: &DeploymentId,
        status: DeploymentStatus,
    ) -> Result<()> {
        let mut deployments = self.deployments.write();
        let deployment = deployments
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("deployment", id))?;
        deployment.transition(status)?;
        Ok(())
    }
}

#[async_trait]
impl AuditLog for MemoryStore {
    async fn append(&self, entry: AuditEntry) -> Result<()> {
        self.audit.write().push(entry);
        Ok(())
    }

    async fn entries_for_host(&self, host_id: &HostId) -> Result<Vec<AuditEntry>> {
        Ok(self
            .audit
            .read()
            .iter()
            .filter(|e| &e.host_id == host_id)
            .cloned()
            .collect())
    }
}
