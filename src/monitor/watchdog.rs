// ABOUTME: Push-heartbeat staleness detector that marks silent swarms offline and alerts once.
// ABOUTME: Alerts fire inside a window past the timeout, at most once per (swarm, last_seen) outage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::{Cycle, cutoff};
use crate::model::Swarm;
use crate::notify::Notifier;
use crate::store::SwarmStore;
use crate::types::{SwarmId, SwarmStatus};

#[derive(Debug, Clone)]
pub struct WatchdogSettings {
    pub interval: Duration,
    /// Heartbeat silence after which a swarm is offline.
    pub timeout: Duration,
    /// Slack added to the alert window to absorb cycle jitter.
    pub grace: Duration,
}

impl Default for WatchdogSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(90),
            grace: Duration::from_secs(10),
        }
    }
}

impl WatchdogSettings {
    /// Whether a swarm silent for `silence` is due an alert this cycle:
    /// `timeout <= silence < timeout + interval + grace`.
    pub fn in_alert_window(&self, silence: Duration) -> bool {
        let end = self.timeout + self.interval + self.grace;
        silence >= self.timeout && silence < end
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchdogReport {
    pub marked_offline: Vec<SwarmId>,
    pub alerted: Vec<SwarmId>,
}

pub struct HeartbeatWatchdog {
    swarms: Arc<dyn SwarmStore>,
    notifier: Arc<dyn Notifier>,
    settings: WatchdogSettings,
    /// Outages already alerted, keyed by swarm; the value is the `last_seen`
    /// that started the outage.
    alerted: Mutex<HashMap<SwarmId, DateTime<Utc>>>,
}

impl HeartbeatWatchdog {
    pub fn new(
        swarms: Arc<dyn SwarmStore>,
        notifier: Arc<dyn Notifier>,
        settings: WatchdogSettings,
    ) -> Self {
        Self {
            swarms,
            notifier,
            settings,
            alerted: Mutex::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &WatchdogSettings {
        &self.settings
    }

    /// Run one watchdog pass as of `now`. Store and notifier failures are
    /// logged and skipped.
    pub async fn check_once(&self, now: DateTime<Utc>) -> WatchdogReport {
        let mut report = WatchdogReport::default();

        let stale_before = cutoff(now, self.settings.timeout);
        match self.swarms.mark_stale_offline(stale_before).await {
            Ok(ids) => {
                for id in &ids {
                    tracing::warn!(swarm_id = %id, "no heartbeat within timeout, marked offline");
                }
                report.marked_offline = ids;
            }
            Err(e) => tracing::error!(error = %e, "failed to mark silent swarms offline"),
        }

        let offline = match self.swarms.list_swarms_by_status(SwarmStatus::Offline).await {
            Ok(swarms) => swarms,
            Err(e) => {
                tracing::error!(error = %e, "failed to list offline swarms");
                return report;
            }
        };

        // Forget outages that ended: the swarm came back or sent a newer heartbeat.
        self.alerted.lock().retain(|id, seen| {
            offline
                .iter()
                .any(|s| &s.id == id && s.last_seen == Some(*seen))
        });

        for swarm in offline {
            let Some(last_seen) = swarm.last_seen else {
                continue;
            };
            let Ok(silence) = (now - last_seen).to_std() else {
                continue;
            };
            if !self.settings.in_alert_window(silence) {
                continue;
            }
            if self.alerted.lock().get(&swarm.id) == Some(&last_seen) {
                tracing::debug!(swarm_id = %swarm.id, "outage already alerted");
                continue;
            }
            if self.alert(&swarm, last_seen, silence).await {
                self.alerted.lock().insert(swarm.id.clone(), last_seen);
                report.alerted.push(swarm.id);
            }
        }

        report
    }

    async fn alert(&self, swarm: &Swarm, last_seen: DateTime<Utc>, silence: Duration) -> bool {
        let message = format!(
            "Swarm '{}' went offline: no heartbeat for {}s",
            swarm.name,
            silence.as_secs()
        );
        let metadata = json!({
            "swarm_name": swarm.name,
            "host_url": swarm.host_url,
            "last_seen": last_seen,
            "seconds_since_last_seen": silence.as_secs(),
        });
        match self.notifier.send_alert(&swarm.id, &message, metadata).await {
            Ok(()) => {
                tracing::info!(swarm_id = %swarm.id, "offline alert sent");
                true
            }
            Err(e) => {
                tracing::error!(swarm_id = %swarm.id, error = %e, "failed to send offline alert");
                false
            }
        }
    }
}

#[async_trait]
impl Cycle for HeartbeatWatchdog {
    fn name(&self) -> &'static str {
        "heartbeat-watchdog"
    }

    async fn run_cycle(&self) {
        self.check_once(Utc::now()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_window_bounds() {
        let s = WatchdogSettings::default();
        assert!(!s.in_alert_window(Duration::from_secs(89)));
        assert!(s.in_alert_window(Duration::from_secs(90)));
        assert!(s.in_alert_window(Duration::from_secs(95)));
        assert!(s.in_alert_window(Duration::from_secs(129)));
        assert!(!s.in_alert_window(Duration::from_secs(130)));
        assert!(!s.in_alert_window(Duration::from_secs(300)));
    }
}
