// ABOUTME: Tagged status enums for hosts, swarms, deployments, and progress.
// ABOUTME: Deployment status transitions are checked; the others are last-write-wins.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostStatus {
    Online,
    #[default]
    Offline,
    Error,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwarmStatus {
    Online,
    #[default]
    Offline,
    Degraded,
}

impl SwarmStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwarmStatus::Online => "online",
            SwarmStatus::Offline => "offline",
            SwarmStatus::Degraded => "degraded",
        }
    }
}

impl fmt::Display for SwarmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    #[default]
    Draft,
    Deploying,
    Deployed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid deployment transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: DeploymentStatus,
    pub to: DeploymentStatus,
}

impl DeploymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentStatus::Draft => "draft",
            DeploymentStatus::Deploying => "deploying",
            DeploymentStatus::Deployed => "deployed",
            DeploymentStatus::Failed => "failed",
        }
    }

    /// Validate a transition and return the target status.
    ///
    /// Allowed: `Draft -> Deploying`, `Deploying -> Deployed`,
    /// `Deploying -> Failed`. Everything else is rejected.
    pub fn transition(self, to: DeploymentStatus) -> Result<DeploymentStatus, InvalidTransition> {
        use DeploymentStatus::*;
        match (self, to) {
            (Draft, Deploying) | (Deploying, Deployed) | (Deploying, Failed) => Ok(to),
            (from, to) => Err(InvalidTransition { from, to }),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DeploymentStatus::Deployed | DeploymentStatus::Failed)
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a single deployment run as reported through progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Deploying,
    Deployed,
    Failed,
}

impl From<ProgressStatus> for DeploymentStatus {
    fn from(status: ProgressStatus) -> Self {
        match status {
            ProgressStatus::Deploying => DeploymentStatus::Deploying,
            ProgressStatus::Deployed => DeploymentStatus::Deployed,
            ProgressStatus::Failed => DeploymentStatus::Failed,
        }
    }
}
