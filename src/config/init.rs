// ABOUTME: Config scaffolding for new control planes.
// ABOUTME: Creates a swarmctl.yml template file.

use std::path::Path;

use crate::error::{Error, Result};

use super::CONFIG_FILENAME;

pub fn init_config(dir: &Path, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    std::fs::write(&config_path, TEMPLATE)?;
    tracing::debug!(path = %config_path.display(), "wrote config template");
    Ok(())
}

const TEMPLATE: &str = r#"# Base URL swarms push heartbeats to (POST /api/heartbeat)
# control_plane_url: https://control.example.com

ssh:
  # SSH host key verification (default: false for security)
  # Set to true to enable Trust-On-First-Use, or pre-populate ~/.ssh/known_hosts
  # trust_first_connection: true
  command_timeout: 5m

deploy:
  base_dir: ~/swarms
  swarm_api_port: 8080
  heartbeat_interval: 60s
  # heartbeat_api_key:
  #   env: SWARMCTL_HEARTBEAT_KEY

poller:
  interval: 30s
  request_timeout: 10s
  stale_after: 60s
  degraded_threshold: 90

watchdog:
  interval: 30s
  timeout: 90s
  grace: 10s

hosts:
  - id: host-1
    address: deploy@10.0.0.5:22
    ssh_key: ~/.ssh/id_ed25519
    os_type: linux
    capacity: 10

swarms: []
deployments: []
"#;
