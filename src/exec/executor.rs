// ABOUTME: Runs whitelisted commands on managed hosts through the connection pool.
// ABOUTME: Every attempt, including rejected ones, leaves an audit entry.

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use snafu::{OptionExt, ResultExt};
use std::sync::Arc;
use std::time::Instant;

use super::error::{ExecError, HostNotFoundSnafu, StoreSnafu, TransportSnafu};
use super::whitelist::{self, CommandParams, UPDATE_SETTINGS};
use crate::model::{AuditEntry, Host, excerpt};
use crate::remote::SwarmLayout;
use crate::ssh::ConnectionPool;
use crate::store::{AuditLog, HostStore};
use crate::types::{AuditId, HostId, SwarmName};

/// Outcome of one remote command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteCommandResult {
    pub success: bool,
    pub exit_code: Option<u32>,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

/// Where swarms live on hosts and which port restarts bind.
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub base_dir: String,
    pub swarm_api_port: u16,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            base_dir: "~/swarms".to_string(),
            swarm_api_port: 8080,
        }
    }
}

pub struct CommandExecutor {
    pool: Arc<ConnectionPool>,
    hosts: Arc<dyn HostStore>,
    audit: Arc<dyn AuditLog>,
    settings: ExecutorSettings,
}

impl CommandExecutor {
    pub fn new(
        pool: Arc<ConnectionPool>,
        hosts: Arc<dyn HostStore>,
        audit: Arc<dyn AuditLog>,
        settings: ExecutorSettings,
    ) -> Self {
        Self {
            pool,
            hosts,
            audit,
            settings,
        }
    }

    /// Run a whitelisted command on `host_id`.
    ///
    /// A command that is not on the host's whitelist, or whose parameters fail
    /// validation, is refused before any session is opened, but the attempt is
    /// still audited. A command that ran and exited non-zero is an `Ok` result
    /// with `success == false`.
    pub async fn execute(
        &self,
        host_id: &HostId,
        command_type: &str,
        params: &CommandParams,
        executed_by: &str,
    ) -> Result<RemoteCommandResult, ExecError> {
        let host = self.host(host_id).await?;

        let Some(spec) = whitelist::lookup(command_type, host.os_type) else {
            tracing::warn!(
                host_id = %host_id,
                command = command_type,
                executed_by,
                "rejected non-whitelisted command"
            );
            self.audit_rejection(
                &host,
                command_type,
                executed_by,
                String::new(),
                json!({
                    "command_type": command_type,
                    "os_type": host.os_type,
                    "rejected": "not_whitelisted",
                }),
            )
            .await;
            return Err(ExecError::NotWhitelisted {
                command: command_type.to_string(),
                os_type: host.os_type,
            });
        };

        let validated = match whitelist::validate(spec, params) {
            Ok(validated) => validated,
            Err(source) => {
                tracing::warn!(
                    host_id = %host_id,
                    command = command_type,
                    executed_by,
                    error = %source,
                    "rejected invalid command parameters"
                );
                self.audit_rejection(
                    &host,
                    command_type,
                    executed_by,
                    source.to_string(),
                    json!({
                        "command_type": command_type,
                        "os_type": host.os_type,
                        "params": params,
                        "rejected": "invalid_param",
                        "param": source.name,
                    }),
                )
                .await;
                return Err(ExecError::InvalidParam { source });
            }
        };

        if spec.id == UPDATE_SETTINGS {
            let content = validated.content.unwrap_or_default();
            return self
                .upload_settings(&host, &validated.swarm, &content, executed_by)
                .await;
        }

        let layout = SwarmLayout::new(host.os_type, &self.settings.base_dir, &validated.swarm);
        let Some(command) =
            whitelist::render(spec, &layout, &validated, self.settings.swarm_api_port)
        else {
            return Err(ExecError::NotWhitelisted {
                command: command_type.to_string(),
                os_type: host.os_type,
            });
        };

        let metadata = json!({
            "command_type": command_type,
            "os_type": host.os_type,
            "params": params,
        });
        self.run(&host, &command, metadata, executed_by).await
    }

    /// Replace a swarm's `settings.ini` with `content`.
    pub async fn update_settings(
        &self,
        host_id: &HostId,
        swarm: &SwarmName,
        content: &str,
        executed_by: &str,
    ) -> Result<RemoteCommandResult, ExecError> {
        let host = self.host(host_id).await?;
        self.upload_settings(&host, swarm, content, executed_by)
            .await
    }

    async fn host(&self, host_id: &HostId) -> Result<Host, ExecError> {
        self.hosts
            .get_host(host_id)
            .await
            .context(StoreSnafu)?
            .context(HostNotFoundSnafu {
                host_id: host_id.clone(),
            })
    }

    /// Audit a request refused before any session was opened.
    async fn audit_rejection(
        &self,
        host: &Host,
        command_type: &str,
        executed_by: &str,
        stderr: String,
        metadata: serde_json::Value,
    ) {
        self.record(AuditEntry {
            id: AuditId::generate(),
            host_id: host.id.clone(),
            command: command_type.to_string(),
            executed_by: executed_by.to_string(),
            exit_code: None,
            stdout: String::new(),
            stderr,
            duration_ms: 0,
            success: false,
            metadata,
            executed_at: Utc::now(),
        })
        .await;
    }

    async fn upload_settings(
        &self,
        host: &Host,
        swarm: &SwarmName,
        content: &str,
        executed_by: &str,
    ) -> Result<RemoteCommandResult, ExecError> {
        let layout = SwarmLayout::new(host.os_type, &self.settings.base_dir, swarm);
        let path = layout.settings_path();
        let command = format!("{UPDATE_SETTINGS} {path}");
        let metadata = json!({
            "command_type": UPDATE_SETTINGS,
            "os_type": host.os_type,
            "swarm": swarm.as_str(),
            "bytes": content.len(),
        });

        let started = Instant::now();
        let outcome = match self.pool.acquire(host).await {
            Ok(session) => session.upload_file(&path, content.as_bytes()).await,
            Err(e) => Err(e),
        };
        let duration_ms = elapsed_ms(started);

        let result = match outcome {
            Ok(()) => RemoteCommandResult {
                success: true,
                exit_code: Some(0),
                stdout: String::new(),
                stderr: String::new(),
                duration_ms,
            },
            // The remote side ran and refused the write; report it like a
            // failed command rather than a transport error.
            Err(e @ crate::ssh::Error::UploadFailed { .. }) => RemoteCommandResult {
                success: false,
                exit_code: None,
                stdout: String::new(),
                stderr: e.to_string(),
                duration_ms,
            },
            Err(source) => {
                self.audit_failure(host, &command, executed_by, duration_ms, &source, metadata)
                    .await;
                return Err(source).context(TransportSnafu {
                    host_id: host.id.clone(),
                });
            }
        };

        self.audit_result(host, &command, executed_by, &result, metadata)
            .await;
        Ok(result)
    }

    async fn run(
        &self,
        host: &Host,
        command: &str,
        metadata: serde_json::Value,
        executed_by: &str,
    ) -> Result<RemoteCommandResult, ExecError> {
        tracing::debug!(host_id = %host.id, command, "executing remote command");
        let started = Instant::now();
        let outcome = match self.pool.acquire(host).await {
            Ok(session) => session.exec(command).await,
            Err(e) => Err(e),
        };
        let duration_ms = elapsed_ms(started);

        match outcome {
            Ok(output) => {
                let result = RemoteCommandResult {
                    success: output.success(),
                    exit_code: Some(output.exit_code),
                    stdout: output.stdout,
                    stderr: output.stderr,
                    duration_ms,
                };
                tracing::info!(
                    host_id = %host.id,
                    exit_code = output.exit_code,
                    duration_ms,
                    "remote command finished"
                );
                self.audit_result(host, command, executed_by, &result, metadata)
                    .await;
                Ok(result)
            }
            Err(source) => {
                tracing::warn!(host_id = %host.id, error = %source, "remote command failed");
                self.audit_failure(host, command, executed_by, duration_ms, &source, metadata)
                    .await;
                Err(source).context(TransportSnafu {
                    host_id: host.id.clone(),
                })
            }
        }
    }

    async fn audit_result(
        &self,
        host: &Host,
        command: &str,
        executed_by: &str,
        result: &RemoteCommandResult,
        metadata: serde_json::Value,
    ) {
        self.record(AuditEntry {
            id: AuditId::generate(),
            host_id: host.id.clone(),
            command: command.to_string(),
            executed_by: executed_by.to_string(),
            exit_code: result.exit_code,
            stdout: excerpt(&result.stdout),
            stderr: excerpt(&result.stderr),
            duration_ms: result.duration_ms,
            success: result.success,
            metadata,
            executed_at: Utc::now(),
        })
        .await;
    }

    async fn audit_failure(
        &self,
        host: &Host,
        command: &str,
        executed_by: &str,
        duration_ms: u64,
        error: &crate::ssh::Error,
        metadata: serde_json::Value,
    ) {
        self.record(AuditEntry {
            id: AuditId::generate(),
            host_id: host.id.clone(),
            command: command.to_string(),
            executed_by: executed_by.to_string(),
            exit_code: None,
            stdout: String::new(),
            stderr: excerpt(&error.to_string()),
            duration_ms,
            success: false,
            metadata,
            executed_at: Utc::now(),
        })
        .await;
    }

    /// Audit writes never change the caller's result.
    async fn record(&self, entry: AuditEntry) {
        if let Err(e) = self.audit.append(entry).await {
            tracing::error!(error = %e, "failed to write audit entry");
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
