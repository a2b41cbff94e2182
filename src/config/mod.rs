// ABOUTME: Configuration types and parsing for swarmctl.yml.
// ABOUTME: Runtime settings for SSH, deployment, and monitors, plus seed records for the store.

mod deserialize;
mod env_value;
mod init;
mod server;

pub use env_value::EnvValue;
pub use init::init_config;
pub use server::ServerAddress;

use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::deploy::DeploySettings;
use crate::error::{Error, Result};
use crate::exec::ExecutorSettings;
use crate::model::{Deployment, Host, Swarm};
use crate::monitor::{PollerSettings, WatchdogSettings};
use crate::shell::is_safe_path;
use crate::ssh::SshConnector;

pub const CONFIG_FILENAME: &str = "swarmctl.yml";
pub const CONFIG_FILENAME_ALT: &str = "swarmctl.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".swarmctl/config.yml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Base URL swarms push heartbeats to.
    #[serde(default)]
    pub control_plane_url: Option<String>,

    #[serde(default)]
    pub ssh: SshConfig,

    #[serde(default)]
    pub deploy: DeployConfig,

    #[serde(default)]
    pub poller: PollerConfig,

    #[serde(default)]
    pub watchdog: WatchdogConfig,

    #[serde(default, deserialize_with = "deserialize::deserialize_hosts")]
    pub hosts: Vec<Host>,

    #[serde(default)]
    pub swarms: Vec<Swarm>,

    #[serde(default)]
    pub deployments: Vec<Deployment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SshConfig {
    #[serde(default)]
    pub known_hosts: Option<PathBuf>,

    /// Accept and remember unknown host keys.
    #[serde(default)]
    pub trust_first_connection: bool,

    #[serde(default = "default_command_timeout", with = "humantime_serde")]
    pub command_timeout: Duration,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            known_hosts: None,
            trust_first_connection: false,
            command_timeout: default_command_timeout(),
        }
    }
}

fn default_command_timeout() -> Duration {
    Duration::from_secs(300)
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeployConfig {
    #[serde(default = "default_base_dir")]
    pub base_dir: String,

    #[serde(default = "default_swarm_api_port")]
    pub swarm_api_port: u16,

    #[serde(default = "default_heartbeat_interval", with = "humantime_serde")]
    pub heartbeat_interval: Duration,

    #[serde(default)]
    pub heartbeat_api_key: Option<EnvValue>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            swarm_api_port: default_swarm_api_port(),
            heartbeat_interval: default_heartbeat_interval(),
            heartbeat_api_key: None,
        }
    }
}

fn default_base_dir() -> String {
    "~/swarms".to_string()
}

fn default_swarm_api_port() -> u16 {
    8080
}

fn default_heartbeat_interval() -> Duration {
    Duration::from_secs(60)
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollerConfig {
    #[serde(default = "default_cycle", with = "humantime_serde")]
    pub interval: Duration,

    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,

    #[serde(default = "default_stale_after", with = "humantime_serde")]
    pub stale_after: Duration,

    #[serde(default = "default_degraded_threshold")]
    pub degraded_threshold: f64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: default_cycle(),
            request_timeout: default_request_timeout(),
            stale_after: default_stale_after(),
            degraded_threshold: default_degraded_threshold(),
        }
    }
}

fn default_cycle() -> Duration {
    Duration::from_secs(30)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_stale_after() -> Duration {
    Duration::from_secs(60)
}

fn default_degraded_threshold() -> f64 {
    90.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct WatchdogConfig {
    #[serde(default = "default_cycle", with = "humantime_serde")]
    pub interval: Duration,

    #[serde(default = "default_heartbeat_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    #[serde(default = "default_grace", with = "humantime_serde")]
    pub grace: Duration,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            interval: default_cycle(),
            timeout: default_heartbeat_timeout(),
            grace: default_grace(),
        }
    }
}

fn default_heartbeat_timeout() -> Duration {
    Duration::from_secs(90)
}

fn default_grace() -> Duration {
    Duration::from_secs(10)
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading configuration");
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    fn validate(&self) -> Result<()> {
        if !is_safe_path(&self.deploy.base_dir) {
            return Err(Error::InvalidConfig(format!(
                "deploy.base_dir is not a safe path: {}",
                self.deploy.base_dir
            )));
        }
        if self.deploy.swarm_api_port == 0 {
            return Err(Error::InvalidConfig("deploy.swarm_api_port cannot be 0".into()));
        }
        if !(0.0..=100.0).contains(&self.poller.degraded_threshold) {
            return Err(Error::InvalidConfig(
                "poller.degraded_threshold must be a percentage".into(),
            ));
        }
        if let Some(url) = &self.control_plane_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            return Err(Error::InvalidConfig(format!(
                "control_plane_url must be an http(s) URL: {url}"
            )));
        }

        let mut seen = HashSet::new();
        for host in &self.hosts {
            if !seen.insert(host.id.as_str()) {
                return Err(Error::InvalidConfig(format!("duplicate host id: {}", host.id)));
            }
        }
        Ok(())
    }

    pub fn ssh_connector(&self) -> SshConnector {
        SshConnector {
            trust_on_first_use: self.ssh.trust_first_connection,
            known_hosts_path: self.ssh.known_hosts.clone(),
            command_timeout: self.ssh.command_timeout,
        }
    }

    pub fn deploy_settings(&self) -> Result<DeploySettings> {
        let heartbeat_api_key = self
            .deploy
            .heartbeat_api_key
            .as_ref()
            .map(EnvValue::resolve)
            .transpose()?;
        Ok(DeploySettings {
            base_dir: self.deploy.base_dir.clone(),
            swarm_api_port: self.deploy.swarm_api_port,
            control_plane_url: self.control_plane_url.clone(),
            heartbeat_api_key,
            heartbeat_interval: self.deploy.heartbeat_interval,
        })
    }

    pub fn executor_settings(&self) -> ExecutorSettings {
        ExecutorSettings {
            base_dir: self.deploy.base_dir.clone(),
            swarm_api_port: self.deploy.swarm_api_port,
        }
    }

    pub fn poller_settings(&self) -> PollerSettings {
        PollerSettings {
            interval: self.poller.interval,
            request_timeout: self.poller.request_timeout,
            stale_after: self.poller.stale_after,
            degraded_threshold: self.poller.degraded_threshold,
        }
    }

    pub fn watchdog_settings(&self) -> WatchdogSettings {
        WatchdogSettings {
            interval: self.watchdog.interval,
            timeout: self.watchdog.timeout,
            grace: self.watchdog.grace,
        }
    }
}
