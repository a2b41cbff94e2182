// ABOUTME: Drives one deployment from draft to a running, registered swarm.
// ABOUTME: Steps run strictly in order; any failure marks the deployment failed without rollback.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use super::error::DeployError;
use super::render::{self, HeartbeatTarget, SettingsContext};
use super::schedule;
use super::tracker::{InFlight, ProgressTracker};
use crate::diagnostics::{Diagnostics, Warning};
use crate::model::{CompleteSteps, Deployment, DeploymentProgress, Host, Swarm, excerpt};
use crate::remote::SwarmLayout;
use crate::ssh::{CommandOutput, ConnectionPool, PooledSession};
use crate::store::{DeploymentStore, HostStore, StoreError, SwarmStore};
use crate::types::{DeploymentId, DeploymentStatus, HostId, RepoRef, SwarmId, SwarmStatus};

/// Endpoint on the control plane that receives swarm heartbeats.
pub const HEARTBEAT_PATH: &str = "/api/heartbeat";

#[derive(Debug, Clone)]
pub struct DeploySettings {
    /// Parent directory of swarm directories on each host.
    pub base_dir: String,
    /// Port the swarm's local API listens on.
    pub swarm_api_port: u16,
    /// Base URL swarms push heartbeats to. Heartbeats are disabled when unset.
    pub control_plane_url: Option<String>,
    pub heartbeat_api_key: Option<String>,
    pub heartbeat_interval: Duration,
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            base_dir: "~/swarms".to_string(),
            swarm_api_port: 8080,
            control_plane_url: None,
            heartbeat_api_key: None,
            heartbeat_interval: Duration::from_secs(60),
        }
    }
}

/// Outcome of a successful deployment.
#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    pub deployment_id: DeploymentId,
    pub swarm_id: SwarmId,
    pub host_id: HostId,
    pub host_url: String,
    pub warnings: Vec<Warning>,
}

pub struct Orchestrator {
    pool: Arc<ConnectionPool>,
    hosts: Arc<dyn HostStore>,
    swarms: Arc<dyn SwarmStore>,
    deployments: Arc<dyn DeploymentStore>,
    settings: DeploySettings,
    progress: ProgressTracker,
    in_flight: InFlight,
}

impl Orchestrator {
    pub fn new(
        pool: Arc<ConnectionPool>,
        hosts: Arc<dyn HostStore>,
        swarms: Arc<dyn SwarmStore>,
        deployments: Arc<dyn DeploymentStore>,
        settings: DeploySettings,
    ) -> Self {
        Self {
            pool,
            hosts,
            swarms,
            deployments,
            settings,
            progress: ProgressTracker::default(),
            in_flight: InFlight::default(),
        }
    }

    /// Progress of the most recent run of `id`, if any.
    pub fn progress(&self, id: &DeploymentId) -> Option<DeploymentProgress> {
        self.progress.get(id)
    }

    pub fn is_deploying(&self, id: &DeploymentId) -> bool {
        self.in_flight.contains(id)
    }

    /// Deploy a draft. Concurrent calls for the same id are rejected.
    pub async fn deploy(&self, id: &DeploymentId) -> Result<DeployReport, DeployError> {
        let _claim = self
            .in_flight
            .claim(id)
            .ok_or(DeployError::AlreadyInProgress)?;

        let deployment = self
            .deployments
            .get_deployment(id)
            .await?
            .ok_or(DeployError::NotFound)?;
        if deployment.status != DeploymentStatus::Draft {
            return Err(DeployError::NotDraft(deployment.status));
        }
        let steps = deployment
            .complete_steps()
            .map_err(DeployError::IncompleteSteps)?;

        self.deployments
            .update_deployment_status(id, DeploymentStatus::Deploying)
            .await?;
        self.progress.begin(id);
        tracing::info!(deployment_id = %id, name = %deployment.name, "deployment started");

        let outcome = match self.run(&deployment, steps).await {
            Ok(report) => self
                .deployments
                .update_deployment_status(id, DeploymentStatus::Deployed)
                .await
                .map(|()| report)
                .map_err(DeployError::from),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(report) => {
                self.progress.complete(id);
                tracing::info!(
                    deployment_id = %id,
                    swarm_id = %report.swarm_id,
                    host_id = %report.host_id,
                    "deployment completed"
                );
                Ok(report)
            }
            Err(e) => {
                let message = e.to_string();
                tracing::error!(deployment_id = %id, error = %message, "deployment failed");
                self.progress.fail(id, &message);
                if let Err(store_err) = self
                    .deployments
                    .update_deployment_status(id, DeploymentStatus::Failed)
                    .await
                {
                    tracing::error!(
                        deployment_id = %id,
                        error = %store_err,
                        "failed to record deployment failure"
                    );
                }
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        deployment: &Deployment,
        steps: CompleteSteps<'_>,
    ) -> Result<DeployReport, DeployError> {
        let id = &deployment.id;
        let mut diag = Diagnostics::default();

        // 1. Host capacity
        self.progress.advance(id, 10, "Validating host", "Checking host capacity");
        let host = self.admit_host(&steps.host_selection.host_id).await?;

        // 2. Repository reference
        self.progress.advance(id, 20, "Validating repository", "Checking repository reference");
        let repository = RepoRef::parse(&steps.repository.repository)?;

        // 3. Configuration
        self.progress.advance(id, 30, "Generating configuration", "Rendering settings.ini");
        let schedule = schedule::resolve(steps.schedule)?;
        if steps.agents.enabled().next().is_none() {
            diag.warn(Warning::no_enabled_agents(format!(
                "deployment {id} has no enabled agents"
            )));
        }
        let swarm_id = SwarmId::generate();
        let monitor_url = self
            .settings
            .control_plane_url
            .as_deref()
            .map(|base| format!("{}{}", base.trim_end_matches('/'), HEARTBEAT_PATH));
        let settings_ini = render::settings_ini(&SettingsContext {
            swarm_id: &swarm_id,
            name: &deployment.name,
            repository: &repository,
            branch: steps.repository.branch.as_deref(),
            schedule: &schedule,
            agents: steps.agents,
            customer: steps.customer,
            heartbeat: HeartbeatTarget {
                monitor_url: monitor_url.as_deref(),
                api_key: self.settings.heartbeat_api_key.as_deref(),
                interval_secs: self.settings.heartbeat_interval.as_secs(),
            },
            api_port: self.settings.swarm_api_port,
        });

        // 4. SSH session
        self.progress.advance(
            id,
            40,
            "Connecting to host",
            format!("Opening SSH session to {}", host.address()),
        );
        let session = self
            .pool
            .acquire(&host)
            .await
            .map_err(|source| DeployError::Ssh {
                step: "Open SSH session",
                source,
            })?;

        let layout = SwarmLayout::new(host.os_type, &self.settings.base_dir, &deployment.name);

        // 5. Directory
        self.progress.advance(
            id,
            50,
            "Creating directory",
            format!("Creating {}", layout.dir()),
        );
        remote(&session, "Create deployment directory", &layout.create_dir()).await?;

        // 6. Configuration upload
        self.progress.advance(id, 60, "Uploading configuration", "Uploading settings.ini");
        session
            .upload_file(&layout.settings_path(), settings_ini.as_bytes())
            .await
            .map_err(|source| DeployError::Ssh {
                step: "Upload configuration",
                source,
            })?;

        // 7. Clone
        self.progress.advance(
            id,
            70,
            "Cloning repository",
            format!("Cloning {repository}"),
        );
        remote(
            &session,
            "Clone repository",
            &layout.clone_repo(&repository.clone_url(), steps.repository.branch.as_deref()),
        )
        .await?;

        // 8. Dependencies
        self.progress.advance(id, 80, "Installing dependencies", "Installing requirements");
        remote(&session, "Install dependencies", &layout.install_dependencies()).await?;

        // 9. Launch
        self.progress.advance(id, 90, "Starting swarm", "Launching swarm process");
        remote(
            &session,
            "Start swarm",
            &layout.launch(self.settings.swarm_api_port),
        )
        .await?;

        // 10. Registration
        self.progress.advance(id, 95, "Registering swarm", "Registering swarm with the fleet");
        let host_url = format!("http://{}:{}", host.hostname, self.settings.swarm_api_port);
        self.hosts
            .increment_swarm_count(&host.id)
            .await
            .map_err(|e| match e {
                StoreError::CapacityExceeded(_) => DeployError::HostAtCapacity,
                other => DeployError::Store(other),
            })?;
        self.swarms
            .create_swarm(Swarm {
                id: swarm_id.clone(),
                name: deployment.name.to_string(),
                host_id: Some(host.id.clone()),
                deployment_id: Some(id.clone()),
                host_url: host_url.clone(),
                status: SwarmStatus::Offline,
                health: None,
                active_agents: 0,
                project_completion: None,
                last_seen: None,
            })
            .await?;

        drop(session);
        if let Err(e) = self.pool.close(&host.id).await {
            diag.warn(Warning::ssh_disconnect(format!(
                "failed to close SSH session to {}: {e}",
                host.address()
            )));
        }

        Ok(DeployReport {
            deployment_id: id.clone(),
            swarm_id,
            host_id: host.id,
            host_url,
            warnings: diag.into_warnings(),
        })
    }

    async fn admit_host(&self, host_id: &HostId) -> Result<Host, DeployError> {
        let host = self
            .hosts
            .get_host(host_id)
            .await?
            .ok_or(DeployError::HostNotFound)?;
        if !host.has_capacity() {
            return Err(DeployError::HostAtCapacity);
        }
        Ok(host)
    }
}

async fn remote(
    session: &PooledSession,
    step: &'static str,
    command: &str,
) -> Result<CommandOutput, DeployError> {
    let output = session
        .exec(command)
        .await
        .map_err(|source| DeployError::Ssh { step, source })?;
    if !output.success() {
        let detail = if output.stderr.trim().is_empty() {
            output.stdout.trim()
        } else {
            output.stderr.trim()
        };
        return Err(DeployError::RemoteCommand {
            step,
            exit_code: output.exit_code,
            stderr: excerpt(detail),
        });
    }
    Ok(output)
}
