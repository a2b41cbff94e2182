// ABOUTME: Remote command executor error types with SNAFU pattern.
// ABOUTME: kind() separates caller mistakes from transport and storage failures.

use snafu::Snafu;

use super::whitelist::ParamError;
use crate::ssh;
use crate::store::StoreError;
use crate::types::{HostId, OsType};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ExecError {
    #[snafu(display("Host not found: {host_id}"))]
    HostNotFound { host_id: HostId },

    #[snafu(display("Command '{command}' is not whitelisted for {os_type} hosts"))]
    NotWhitelisted { command: String, os_type: OsType },

    #[snafu(display("{source}"))]
    InvalidParam { source: ParamError },

    #[snafu(display("remote execution failed on {host_id}: {source}"))]
    Transport { host_id: HostId, source: ssh::Error },

    #[snafu(display("host lookup failed: {source}"))]
    Store { source: StoreError },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecErrorKind {
    /// The request was rejected before anything ran remotely.
    Validation,
    /// The SSH session could not be opened or died mid-command.
    Transport,
    /// The host store failed.
    Store,
}

impl ExecError {
    pub fn kind(&self) -> ExecErrorKind {
        match self {
            ExecError::HostNotFound { .. }
            | ExecError::NotWhitelisted { .. }
            | ExecError::InvalidParam { .. } => ExecErrorKind::Validation,
            ExecError::Transport { .. } => ExecErrorKind::Transport,
            ExecError::Store { .. } => ExecErrorKind::Store,
        }
    }
}

impl From<ParamError> for ExecError {
    fn from(source: ParamError) -> Self {
        ExecError::InvalidParam { source }
    }
}
