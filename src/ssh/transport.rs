// ABOUTME: Transport seam between the connection pool and russh.
// ABOUTME: Connector opens sessions for a host; RemoteShell runs commands and uploads files.

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

use super::client::{CommandOutput, Session, SessionConfig};
use super::error::Result;
use crate::model::Host;

/// An authenticated shell on one remote host.
#[async_trait]
pub trait RemoteShell: Send + Sync {
    async fn exec(&self, command: &str) -> Result<CommandOutput>;

    async fn upload_file(&self, path: &str, content: &[u8]) -> Result<()>;

    async fn disconnect(&self) -> Result<()>;

    /// Whether the transport is known to be dead.
    fn is_closed(&self) -> bool {
        false
    }
}

/// Opens remote shells for hosts.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, host: &Host) -> Result<Box<dyn RemoteShell>>;
}

#[async_trait]
impl RemoteShell for Session {
    async fn exec(&self, command: &str) -> Result<CommandOutput> {
        Session::exec(self, command).await
    }

    async fn upload_file(&self, path: &str, content: &[u8]) -> Result<()> {
        Session::upload_file(self, path, content).await
    }

    async fn disconnect(&self) -> Result<()> {
        Session::disconnect(self).await
    }

    fn is_closed(&self) -> bool {
        Session::is_closed(self)
    }
}

/// Connector that opens real SSH sessions with each host's stored key.
#[derive(Debug, Clone)]
pub struct SshConnector {
    pub trust_on_first_use: bool,
    pub known_hosts_path: Option<PathBuf>,
    pub command_timeout: Duration,
}

impl Default for SshConnector {
    fn default() -> Self {
        Self {
            trust_on_first_use: false,
            known_hosts_path: None,
            command_timeout: Duration::from_secs(300),
        }
    }
}

impl SshConnector {
    pub fn session_config(&self, host: &Host) -> SessionConfig {
        let mut config = SessionConfig::new(&host.hostname, &host.username, &host.ssh_key_path)
            .port(host.port)
            .os_type(host.os_type)
            .trust_on_first_use(self.trust_on_first_use)
            .command_timeout(self.command_timeout);
        if let Some(path) = &self.known_hosts_path {
            config = config.known_hosts_path(path);
        }
        config
    }
}

#[async_trait]
impl Connector for SshConnector {
    async fn connect(&self, host: &Host) -> Result<Box<dyn RemoteShell>> {
        let session = Session::connect(self.session_config(host)).await?;
        Ok(Box::new(session))
    }
}
