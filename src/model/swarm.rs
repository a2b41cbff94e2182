// ABOUTME: Swarm record and the partial update applied by health monitors.
// ABOUTME: Swarms are created by deployments and mutated by the poller, watchdog, and heartbeats.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{DeploymentId, HostId, SwarmId, SwarmStatus};

/// Resource usage reported by a swarm, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HealthMetrics {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Swarm {
    pub id: SwarmId,
    pub name: String,
    #[serde(default)]
    pub host_id: Option<HostId>,
    #[serde(default)]
    pub deployment_id: Option<DeploymentId>,
    /// Base URL of the swarm's local API, e.g. `http://10.0.0.5:8080`.
    pub host_url: String,
    #[serde(default)]
    pub status: SwarmStatus,
    #[serde(default)]
    pub health: Option<HealthMetrics>,
    #[serde(default)]
    pub active_agents: u32,
    #[serde(default)]
    pub project_completion: Option<f64>,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
}

/// Fields a monitor writes back for one swarm. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SwarmUpdate {
    pub status: Option<SwarmStatus>,
    /// `Some(None)` clears the metrics.
    pub health: Option<Option<HealthMetrics>>,
    pub active_agents: Option<u32>,
    pub project_completion: Option<f64>,
    pub last_seen: Option<DateTime<Utc>>,
}

impl SwarmUpdate {
    pub fn status(status: SwarmStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn apply(self, swarm: &mut Swarm) {
        if let Some(status) = self.status {
            swarm.status = status;
        }
        if let Some(health) = self.health {
            swarm.health = health;
        }
        if let Some(active_agents) = self.active_agents {
            swarm.active_agents = active_agents;
        }
        if let Some(completion) = self.project_completion {
            swarm.project_completion = Some(completion);
        }
        if let Some(last_seen) = self.last_seen {
            swarm.last_seen = Some(last_seen);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn swarm() -> Swarm {
        Swarm {
            id: SwarmId::new("s1"),
            name: "alpha".to_string(),
            host_id: None,
            deployment_id: None,
            host_url: "http://localhost:8080".to_string(),
            status: SwarmStatus::Online,
            health: Some(HealthMetrics {
                cpu_percent: 10.0,
                memory_percent: 20.0,
                disk_percent: 30.0,
            }),
            active_agents: 3,
            project_completion: Some(40.0),
            last_seen: None,
        }
    }

    #[test]
    fn status_only_update_keeps_metrics() {
        let mut s = swarm();
        SwarmUpdate::status(SwarmStatus::Degraded).apply(&mut s);
        assert_eq!(s.status, SwarmStatus::Degraded);
        assert!(s.health.is_some());
        assert_eq!(s.active_agents, 3);
    }

    #[test]
    fn explicit_none_clears_metrics() {
        let mut s = swarm();
        SwarmUpdate {
            status: Some(SwarmStatus::Offline),
            health: Some(None),
            ..Default::default()
        }
        .apply(&mut s);
        assert!(s.health.is_none());
        assert_eq!(s.project_completion, Some(40.0));
    }
}
