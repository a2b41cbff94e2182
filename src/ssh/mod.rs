// ABOUTME: SSH client module for remote host connections.
// ABOUTME: Key-file authentication, known_hosts verification, and a per-host session pool.

mod client;
mod error;
mod pool;
mod transport;

pub use client::{CommandOutput, Session, SessionConfig};
pub use error::{Error, Result};
pub use pool::{ConnectionPool, PooledSession, SessionState};
pub use transport::{Connector, RemoteShell, SshConnector};
