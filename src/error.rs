// ABOUTME: Application-wide error types for swarmctl.
// ABOUTME: Uses thiserror for ergonomic error handling.

use std::path::PathBuf;
use thiserror::Error;

use crate::deploy::DeployError;
use crate::exec::ExecError;
use crate::monitor::HeartbeatError;
use crate::store::StoreError;
use crate::types::ParseOsTypeError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Host not found: {0}")]
    HostNotFound(String),

    #[error(transparent)]
    InvalidOsType(#[from] ParseOsTypeError),

    #[error("remote command failed: {0}")]
    CommandFailed(String),

    #[error("deployment failed: {0}")]
    Deploy(#[from] DeployError),

    #[error("command failed: {0}")]
    Exec(#[from] ExecError),

    #[error("heartbeat rejected: {0}")]
    Heartbeat(#[from] HeartbeatError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
