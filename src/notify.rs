// ABOUTME: Alert dispatch boundary used by the heartbeat watchdog.
// ABOUTME: Delivery (push, chat webhooks) lives behind the Notifier trait; LogNotifier just logs.

use async_trait::async_trait;

use crate::types::SwarmId;

#[derive(Debug, thiserror::Error)]
#[error("alert delivery failed: {0}")]
pub struct NotifyError(pub String);

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_alert(
        &self,
        swarm_id: &SwarmId,
        message: &str,
        metadata: serde_json::Value,
    ) -> Result<(), NotifyError>;
}

/// Notifier that records alerts in the log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_alert(
        &self,
        swarm_id: &SwarmId,
        message: &str,
        metadata: serde_json::Value,
    ) -> Result<(), NotifyError> {
        tracing::warn!(swarm_id = %swarm_id, %metadata, "{}", message);
        Ok(())
    }
}
