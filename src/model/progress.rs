// ABOUTME: Progress record for one deployment run.
// ABOUTME: Percentages are fixed checkpoints and never move backwards within a run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{DeploymentId, ProgressStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressLog {
    pub at: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentProgress {
    pub deployment_id: DeploymentId,
    pub status: ProgressStatus,
    pub current_step: String,
    pub progress_percent: u8,
    pub logs: Vec<ProgressLog>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DeploymentProgress {
    pub fn start(deployment_id: DeploymentId) -> Self {
        let now = Utc::now();
        let mut progress = Self {
            deployment_id,
            status: ProgressStatus::Deploying,
            current_step: "Starting deployment".to_string(),
            progress_percent: 0,
            logs: Vec::new(),
            error: None,
            started_at: now,
            updated_at: now,
        };
        progress.log("Deployment started");
        progress
    }

    pub fn is_terminal(&self) -> bool {
        self.status != ProgressStatus::Deploying
    }

    /// Move to a checkpoint. Lower percentages than the current one are clamped.
    /// Terminal progress is left untouched.
    pub fn advance(&mut self, percent: u8, step: &str, message: impl Into<String>) {
        if self.is_terminal() {
            return;
        }
        self.progress_percent = self.progress_percent.max(percent.min(100));
        self.current_step = step.to_string();
        self.log(message);
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        if self.is_terminal() {
            return;
        }
        let error = error.into();
        self.status = ProgressStatus::Failed;
        self.log(format!("Deployment failed: {error}"));
        self.error = Some(error);
    }

    pub fn complete(&mut self) {
        if self.is_terminal() {
            return;
        }
        self.status = ProgressStatus::Deployed;
        self.progress_percent = 100;
        self.current_step = "Deployment complete".to_string();
        self.log("Deployment completed successfully");
    }

    fn log(&mut self, message: impl Into<String>) {
        let now = Utc::now();
        self.logs.push(ProgressLog {
            at: now,
            message: message.into(),
        });
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_never_moves_backwards() {
        let mut p = DeploymentProgress::start(DeploymentId::new("d1"));
        p.advance(40, "Connecting", "connecting");
        p.advance(20, "Validating", "late checkpoint");
        assert_eq!(p.progress_percent, 40);
        assert_eq!(p.current_step, "Validating");
    }

    #[test]
    fn failure_is_terminal() {
        let mut p = DeploymentProgress::start(DeploymentId::new("d1"));
        p.advance(10, "Validating host", "ok");
        p.fail("Host not found");
        p.advance(50, "Creating directory", "ignored");
        p.complete();
        assert_eq!(p.status, ProgressStatus::Failed);
        assert_eq!(p.progress_percent, 10);
        assert_eq!(p.error.as_deref(), Some("Host not found"));
    }

    #[test]
    fn completion_lands_on_100() {
        let mut p = DeploymentProgress::start(DeploymentId::new("d1"));
        p.advance(95, "Registering", "ok");
        p.complete();
        assert_eq!(p.progress_percent, 100);
        assert_eq!(p.status, ProgressStatus::Deployed);
        assert!(p.logs.len() >= 3);
    }
}
