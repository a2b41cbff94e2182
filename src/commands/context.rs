// ABOUTME: Builds the in-process control plane from a loaded config.
// ABOUTME: One MemoryStore seeded from the file backs every component.

use std::sync::Arc;

use swarmctl::config::Config;
use swarmctl::deploy::Orchestrator;
use swarmctl::error::Result;
use swarmctl::exec::CommandExecutor;
use swarmctl::monitor::{HeartbeatWatchdog, SwarmPoller};
use swarmctl::notify::LogNotifier;
use swarmctl::ssh::ConnectionPool;
use swarmctl::store::MemoryStore;

pub struct ControlPlane {
    pub config: Config,
    pub store: Arc<MemoryStore>,
    pub pool: Arc<ConnectionPool>,
}

impl ControlPlane {
    pub fn new(config: Config) -> Self {
        let store = Arc::new(MemoryStore::seeded(
            config.hosts.clone(),
            config.swarms.clone(),
            config.deployments.clone(),
        ));
        let pool = Arc::new(ConnectionPool::new(
            Arc::new(config.ssh_connector()),
            store.clone(),
        ));
        Self {
            config,
            store,
            pool,
        }
    }

    pub fn executor(&self) -> CommandExecutor {
        CommandExecutor::new(
            self.pool.clone(),
            self.store.clone(),
            self.store.clone(),
            self.config.executor_settings(),
        )
    }

    pub fn orchestrator(&self) -> Result<Orchestrator> {
        Ok(Orchestrator::new(
            self.pool.clone(),
            self.store.clone(),
            self.store.clone(),
            self.store.clone(),
            self.config.deploy_settings()?,
        ))
    }

    pub fn poller(&self) -> Result<SwarmPoller> {
        Ok(SwarmPoller::new(
            self.store.clone(),
            self.config.poller_settings(),
        )?)
    }

    pub fn watchdog(&self) -> HeartbeatWatchdog {
        HeartbeatWatchdog::new(
            self.store.clone(),
            Arc::new(LogNotifier),
            self.config.watchdog_settings(),
        )
    }
}
