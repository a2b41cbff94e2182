// ABOUTME: Pull-based health monitor that probes each swarm's HTTP status endpoint.
// ABOUTME: Probes run concurrently with a hard per-request timeout; failures stay per swarm.

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::{Cycle, cutoff};
use crate::model::{HealthMetrics, Swarm, SwarmUpdate};
use crate::store::SwarmStore;
use crate::types::SwarmStatus;

pub const STATUS_PATH: &str = "/status";
pub const COMPLETION_PATH: &str = "/project/completion";

#[derive(Debug, Clone)]
pub struct PollerSettings {
    pub interval: Duration,
    pub request_timeout: Duration,
    /// Swarms without a successful update for this long are forced offline.
    pub stale_after: Duration,
    /// CPU or memory percentage above which a swarm is degraded.
    pub degraded_threshold: f64,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            request_timeout: Duration::from_secs(10),
            stale_after: Duration::from_secs(60),
            degraded_threshold: 90.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceUsage {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_percent: f64,
}

impl From<ResourceUsage> for HealthMetrics {
    fn from(r: ResourceUsage) -> Self {
        HealthMetrics {
            cpu_percent: r.cpu_percent,
            memory_percent: r.memory_percent,
            disk_percent: r.disk_percent,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentCounts {
    pub total: u32,
    pub active: u32,
    pub idle: u32,
    pub failed: u32,
}

/// Body of a swarm's `/status` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: String,
    #[serde(default)]
    pub uptime_seconds: Option<u64>,
    #[serde(default)]
    pub resources: ResourceUsage,
    #[serde(default)]
    pub agents: AgentCounts,
}

#[derive(Debug, Deserialize)]
struct CompletionReport {
    completion_percentage: f64,
}

/// Offline if the swarm says so, degraded if CPU or memory is above
/// `threshold`, online otherwise.
pub fn determine_status(report: &StatusReport, threshold: f64) -> SwarmStatus {
    if report.status.eq_ignore_ascii_case("offline") {
        return SwarmStatus::Offline;
    }
    if report.status.eq_ignore_ascii_case("degraded")
        || report.resources.cpu_percent > threshold
        || report.resources.memory_percent > threshold
    {
        return SwarmStatus::Degraded;
    }
    SwarmStatus::Online
}

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl ProbeError {
    fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            ProbeError::Timeout {
                url: url.to_string(),
            }
        } else {
            ProbeError::Http {
                url: url.to_string(),
                source,
            }
        }
    }
}

/// Counts from one poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PollSummary {
    pub polled: usize,
    pub online: usize,
    pub degraded: usize,
    pub offline: usize,
    pub marked_stale: usize,
}

pub struct SwarmPoller {
    swarms: Arc<dyn SwarmStore>,
    client: reqwest::Client,
    settings: PollerSettings,
}

impl SwarmPoller {
    pub fn new(swarms: Arc<dyn SwarmStore>, settings: PollerSettings) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("swarmctl/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            swarms,
            client,
            settings,
        })
    }

    pub fn settings(&self) -> &PollerSettings {
        &self.settings
    }

    /// Probe every known swarm once, then force stale swarms offline.
    pub async fn poll_once(&self) -> PollSummary {
        let swarms = match self.swarms.list_swarms().await {
            Ok(swarms) => swarms,
            Err(e) => {
                tracing::error!(error = %e, "failed to list swarms for polling");
                return PollSummary::default();
            }
        };

        let statuses = join_all(swarms.iter().map(|swarm| self.poll_swarm(swarm))).await;

        let mut summary = PollSummary {
            polled: statuses.len(),
            ..Default::default()
        };
        for status in statuses {
            match status {
                SwarmStatus::Online => summary.online += 1,
                SwarmStatus::Degraded => summary.degraded += 1,
                SwarmStatus::Offline => summary.offline += 1,
            }
        }

        let stale_before = cutoff(Utc::now(), self.settings.stale_after);
        match self.swarms.mark_stale_offline(stale_before).await {
            Ok(ids) => {
                for id in &ids {
                    tracing::info!(swarm_id = %id, "swarm stale, marked offline");
                }
                summary.marked_stale = ids.len();
            }
            Err(e) => tracing::error!(error = %e, "failed to mark stale swarms offline"),
        }

        tracing::debug!(?summary, "poll cycle finished");
        summary
    }

    /// Probe one swarm and write the outcome back. Returns the status written.
    async fn poll_swarm(&self, swarm: &Swarm) -> SwarmStatus {
        let update = match self.probe(swarm).await {
            Ok(report) => {
                let status = determine_status(&report, self.settings.degraded_threshold);
                let completion = match self.fetch_completion(swarm).await {
                    Ok(pct) => Some(pct),
                    Err(e) => {
                        tracing::debug!(swarm_id = %swarm.id, error = %e, "project completion unavailable");
                        None
                    }
                };
                SwarmUpdate {
                    status: Some(status),
                    health: Some(Some(report.resources.into())),
                    active_agents: Some(report.agents.active),
                    project_completion: completion,
                    last_seen: Some(Utc::now()),
                }
            }
            Err(e) => {
                tracing::warn!(swarm_id = %swarm.id, error = %e, "swarm probe failed");
                SwarmUpdate {
                    health: Some(None),
                    ..SwarmUpdate::status(SwarmStatus::Offline)
                }
            }
        };

        let status = update.status.unwrap_or(SwarmStatus::Offline);
        if let Err(e) = self.swarms.update_swarm(&swarm.id, update).await {
            tracing::error!(swarm_id = %swarm.id, error = %e, "failed to record poll result");
        }
        status
    }

    pub async fn probe(&self, swarm: &Swarm) -> Result<StatusReport, ProbeError> {
        let url = endpoint(&swarm.host_url, STATUS_PATH);
        self.get_json(&url).await
    }

    async fn fetch_completion(&self, swarm: &Swarm) -> Result<f64, ProbeError> {
        let url = endpoint(&swarm.host_url, COMPLETION_PATH);
        let report: CompletionReport = self.get_json(&url).await?;
        Ok(report.completion_percentage)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, ProbeError> {
        let response = self
            .client
            .get(url)
            .timeout(self.settings.request_timeout)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ProbeError::from_reqwest(url, e))?;
        response
            .json::<T>()
            .await
            .map_err(|e| ProbeError::from_reqwest(url, e))
    }
}

#[async_trait]
impl Cycle for SwarmPoller {
    fn name(&self) -> &'static str {
        "swarm-poller"
    }

    async fn run_cycle(&self) {
        self.poll_once().await;
    }
}

fn endpoint(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}
