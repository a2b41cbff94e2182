// ABOUTME: Test support utilities.
// ABOUTME: Scripted in-memory SSH connector, recording notifier, and record fixtures.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nonempty::nonempty;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

use swarmctl::model::{
    AgentRoster, AgentSpec, CustomerStep, Deployment, Host, HostSelection, RepositoryStep,
    ScheduleStep, SchedulePreset, Swarm,
};
use swarmctl::notify::{Notifier, NotifyError};
use swarmctl::ssh::{CommandOutput, Connector, Error as SshError, RemoteShell};
use swarmctl::types::{
    DeploymentId, HostId, HostStatus, OsType, SwarmId, SwarmName, SwarmStatus,
};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env()
            .add_directive("swarmctl=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Everything the fake transport saw, in order.
#[derive(Debug, Default, Clone)]
pub struct Recorded {
    pub connects: Vec<HostId>,
    pub commands: Vec<(HostId, String)>,
    pub uploads: Vec<(HostId, String, String)>,
    pub disconnects: Vec<HostId>,
}

#[derive(Default)]
struct FakeState {
    log: Mutex<Recorded>,
    /// (substring, output): first rule whose substring the command contains wins.
    rules: Mutex<Vec<(String, CommandOutput)>>,
    fail_connect: Mutex<Option<String>>,
    fail_exec_matching: Mutex<Option<String>>,
    fail_upload: Mutex<Option<String>>,
    fail_disconnect: AtomicBool,
    exec_delay: Mutex<Option<Duration>>,
    in_exec: AtomicUsize,
    max_in_exec: AtomicUsize,
}

/// Connector whose shells run nothing and answer from a script.
#[derive(Clone, Default)]
pub struct FakeConnector {
    state: Arc<FakeState>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded(&self) -> Recorded {
        self.state.log.lock().clone()
    }

    /// Answer commands containing `pattern` with `exit_code`/`stdout`/`stderr`.
    pub fn respond(&self, pattern: &str, exit_code: u32, stdout: &str, stderr: &str) {
        self.state.rules.lock().push((
            pattern.to_string(),
            CommandOutput {
                exit_code,
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            },
        ));
    }

    pub fn fail_connect(&self, reason: &str) {
        *self.state.fail_connect.lock() = Some(reason.to_string());
    }

    pub fn allow_connect(&self) {
        *self.state.fail_connect.lock() = None;
    }

    /// Commands containing `pattern` fail at the transport level.
    pub fn fail_exec_matching(&self, pattern: &str) {
        *self.state.fail_exec_matching.lock() = Some(pattern.to_string());
    }

    pub fn fail_upload(&self, reason: &str) {
        *self.state.fail_upload.lock() = Some(reason.to_string());
    }

    pub fn fail_disconnect(&self) {
        self.state.fail_disconnect.store(true, Ordering::SeqCst);
    }

    pub fn delay_exec(&self, delay: Duration) {
        *self.state.exec_delay.lock() = Some(delay);
    }

    /// Highest number of commands observed running at once.
    pub fn max_concurrent_exec(&self) -> usize {
        self.state.max_in_exec.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, host: &Host) -> swarmctl::ssh::Result<Box<dyn RemoteShell>> {
        if let Some(reason) = self.state.fail_connect.lock().clone() {
            return Err(SshError::Connection(reason));
        }
        self.state.log.lock().connects.push(host.id.clone());
        Ok(Box::new(FakeShell {
            host_id: host.id.clone(),
            state: self.state.clone(),
            closed: AtomicBool::new(false),
        }))
    }
}

struct FakeShell {
    host_id: HostId,
    state: Arc<FakeState>,
    closed: AtomicBool,
}

#[async_trait]
impl RemoteShell for FakeShell {
    async fn exec(&self, command: &str) -> swarmctl::ssh::Result<CommandOutput> {
        self.state
            .log
            .lock()
            .commands
            .push((self.host_id.clone(), command.to_string()));

        let running = self.state.in_exec.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_in_exec.fetch_max(running, Ordering::SeqCst);
        let delay = *self.state.exec_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.state.in_exec.fetch_sub(1, Ordering::SeqCst);

        let failing = self.state.fail_exec_matching.lock().clone();
        if let Some(pattern) = failing
            && command.contains(&pattern)
        {
            return Err(SshError::ChannelClosed);
        }

        let rule = self
            .state
            .rules
            .lock()
            .iter()
            .find(|(pattern, _)| command.contains(pattern.as_str()))
            .map(|(_, output)| output.clone());
        Ok(rule.unwrap_or_else(|| CommandOutput {
            exit_code: 0,
            stdout: if command == "echo ok" {
                "ok\n".to_string()
            } else {
                String::new()
            },
            stderr: String::new(),
        }))
    }

    async fn upload_file(&self, path: &str, content: &[u8]) -> swarmctl::ssh::Result<()> {
        if let Some(reason) = self.state.fail_upload.lock().clone() {
            return Err(SshError::UploadFailed {
                path: path.to_string(),
                reason,
            });
        }
        self.state.log.lock().uploads.push((
            self.host_id.clone(),
            path.to_string(),
            String::from_utf8_lossy(content).into_owned(),
        ));
        Ok(())
    }

    async fn disconnect(&self) -> swarmctl::ssh::Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        self.state.log.lock().disconnects.push(self.host_id.clone());
        if self.state.fail_disconnect.load(Ordering::SeqCst) {
            return Err(SshError::ChannelClosed);
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Notifier that keeps every alert it was asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    alerts: Mutex<Vec<(SwarmId, String)>>,
}

impl RecordingNotifier {
    pub fn alerts(&self) -> Vec<(SwarmId, String)> {
        self.alerts.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_alert(
        &self,
        swarm_id: &SwarmId,
        message: &str,
        _metadata: serde_json::Value,
    ) -> Result<(), NotifyError> {
        self.alerts
            .lock()
            .push((swarm_id.clone(), message.to_string()));
        Ok(())
    }
}

pub fn host(id: &str, current_swarms: u32, capacity: u32) -> Host {
    Host {
        id: HostId::new(id),
        hostname: format!("{id}.example.com"),
        port: 22,
        username: "deploy".to_string(),
        os_type: OsType::Linux,
        status: HostStatus::Offline,
        ssh_key_path: PathBuf::from("/keys/id_ed25519"),
        capacity_max_swarms: capacity,
        current_swarms,
        metadata: HashMap::new(),
        last_seen: None,
    }
}

/// A draft with all five steps filled in, targeting `host_id`.
pub fn draft(id: &str, host_id: &str) -> Deployment {
    let mut deployment = Deployment::draft(
        DeploymentId::new(id),
        SwarmName::new("alpha").unwrap(),
    );
    deployment.host_selection = Some(HostSelection {
        host_id: HostId::new(host_id),
    });
    deployment.repository = Some(RepositoryStep {
        repository: "acme/widgets".to_string(),
        branch: Some("main".to_string()),
    });
    deployment.schedule = Some(ScheduleStep {
        preset: Some(SchedulePreset::Continuous),
        ..Default::default()
    });
    deployment.agents = Some(AgentRoster {
        agents: nonempty![
            AgentSpec {
                name: "planner".to_string(),
                role: "planning".to_string(),
                enabled: true,
            },
            AgentSpec {
                name: "coder".to_string(),
                role: "implementation".to_string(),
                enabled: true,
            }
        ],
    });
    deployment.customer = Some(CustomerStep {
        customer_name: "Acme".to_string(),
        email: "ops@acme.test".to_string(),
        plan: Some("team".to_string()),
        api_key: Some("customer-key".to_string()),
    });
    deployment
}

pub fn swarm(id: &str, host_url: &str, status: SwarmStatus, last_seen: Option<DateTime<Utc>>) -> Swarm {
    Swarm {
        id: SwarmId::new(id),
        name: id.to_string(),
        host_id: None,
        deployment_id: None,
        host_url: host_url.to_string(),
        status,
        health: None,
        active_agents: 0,
        project_completion: None,
        last_seen,
    }
}
