// ABOUTME: Ingests heartbeats pushed by swarms and records them on the swarm.
// ABOUTME: The watchdog measures silence against the last_seen written here.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

use super::poller::{ResourceUsage, StatusReport, determine_status};
use crate::model::SwarmUpdate;
use crate::store::{StoreError, SwarmStore};
use crate::types::{SwarmId, SwarmStatus};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HeartbeatAgents {
    pub active_agents: u32,
    pub total_agents: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HeartbeatProject {
    pub completion_percentage: Option<f64>,
}

/// Body a swarm's heartbeat agent posts. Sections a swarm failed to
/// collect arrive empty and are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct HeartbeatPayload {
    pub swarm_id: SwarmId,
    /// Sender's clock, informational only.
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub resources: Option<ResourceUsage>,
    #[serde(default)]
    pub agents: Option<HeartbeatAgents>,
    #[serde(default)]
    pub project: Option<HeartbeatProject>,
}

#[derive(Debug, thiserror::Error)]
pub enum HeartbeatError {
    #[error("unknown swarm: {0}")]
    UnknownSwarm(SwarmId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct HeartbeatReceiver {
    swarms: Arc<dyn SwarmStore>,
    degraded_threshold: f64,
}

impl HeartbeatReceiver {
    pub fn new(swarms: Arc<dyn SwarmStore>, degraded_threshold: f64) -> Self {
        Self {
            swarms,
            degraded_threshold,
        }
    }

    /// Record a heartbeat received now. Returns the status written.
    pub async fn record(&self, payload: HeartbeatPayload) -> Result<SwarmStatus, HeartbeatError> {
        self.record_at(payload, Utc::now()).await
    }

    pub async fn record_at(
        &self,
        payload: HeartbeatPayload,
        received_at: DateTime<Utc>,
    ) -> Result<SwarmStatus, HeartbeatError> {
        if self.swarms.get_swarm(&payload.swarm_id).await?.is_none() {
            return Err(HeartbeatError::UnknownSwarm(payload.swarm_id));
        }

        let status = match payload.resources {
            Some(resources) => determine_status(
                &StatusReport {
                    status: "online".to_string(),
                    resources,
                    ..Default::default()
                },
                self.degraded_threshold,
            ),
            None => SwarmStatus::Online,
        };

        let update = SwarmUpdate {
            status: Some(status),
            health: payload.resources.map(|r| Some(r.into())),
            active_agents: payload.agents.map(|a| a.active_agents),
            project_completion: payload.project.and_then(|p| p.completion_percentage),
            last_seen: Some(received_at),
        };
        self.swarms.update_swarm(&payload.swarm_id, update).await?;

        tracing::debug!(swarm_id = %payload.swarm_id, %status, "heartbeat recorded");
        Ok(status)
    }
}
