// ABOUTME: Error types for deployment orchestration.
// ABOUTME: Messages are user-facing; they are recorded verbatim into deployment progress.

use crate::ssh;
use crate::store::StoreError;
use crate::types::{DeploymentStatus, ParseRepoRefError};

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("Deployment not found")]
    NotFound,

    #[error("Deployment is already in progress")]
    AlreadyInProgress,

    /// Only drafts can be deployed; failed deployments are not retried in place.
    #[error("Deployment is {0}; only draft deployments can be deployed")]
    NotDraft(DeploymentStatus),

    #[error("Deployment step {0} is not configured")]
    IncompleteSteps(u8),

    #[error("Host not found")]
    HostNotFound,

    #[error("Host has reached maximum swarm capacity")]
    HostAtCapacity,

    #[error("Invalid repository reference: {0}")]
    InvalidRepository(#[from] ParseRepoRefError),

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("{step} failed: {source}")]
    Ssh {
        step: &'static str,
        #[source]
        source: ssh::Error,
    },

    #[error("{step} failed with exit code {exit_code}: {stderr}")]
    RemoteCommand {
        step: &'static str,
        exit_code: u32,
        stderr: String,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    /// Rejected before the deployment started.
    Rejected,
    /// Bad input discovered while the deployment ran.
    Validation,
    /// SSH connection or channel failure.
    Transport,
    /// A remote command ran and exited non-zero.
    RemoteCommand,
    /// Persistence failure.
    Store,
}

impl DeployError {
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::NotFound
            | DeployError::AlreadyInProgress
            | DeployError::NotDraft(_)
            | DeployError::IncompleteSteps(_) => DeployErrorKind::Rejected,
            DeployError::HostNotFound
            | DeployError::HostAtCapacity
            | DeployError::InvalidRepository(_)
            | DeployError::InvalidSchedule(_) => DeployErrorKind::Validation,
            DeployError::Ssh { .. } => DeployErrorKind::Transport,
            DeployError::RemoteCommand { .. } => DeployErrorKind::RemoteCommand,
            DeployError::Store(_) => DeployErrorKind::Store,
        }
    }
}
