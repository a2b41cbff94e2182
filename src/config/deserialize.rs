// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Turns host entries (with optional user@host:port shorthand) into Host records.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

use super::ServerAddress;
use crate::model::Host;
use crate::types::{HostId, HostStatus, OsType};

const DEFAULT_CAPACITY: u32 = 10;

pub fn deserialize_hosts<'de, D>(deserializer: D) -> Result<Vec<Host>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let entries: Vec<HostEntry> = Vec::deserialize(deserializer)?;
    entries
        .into_iter()
        .map(HostEntry::into_host)
        .collect::<Result<Vec<_>, _>>()
        .map_err(serde::de::Error::custom)
}

#[derive(Debug, Deserialize)]
struct HostEntry {
    id: String,
    /// `[user@]host[:port]`; fields below override its parts.
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    hostname: Option<String>,
    #[serde(default)]
    port: Option<u16>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default = "default_os")]
    os_type: OsType,
    ssh_key: PathBuf,
    #[serde(default = "default_capacity")]
    capacity: u32,
    #[serde(default)]
    current_swarms: u32,
    #[serde(default)]
    metadata: HashMap<String, serde_json::Value>,
}

fn default_os() -> OsType {
    OsType::Linux
}

fn default_capacity() -> u32 {
    DEFAULT_CAPACITY
}

/// Expand a leading `~/` against `$HOME`; other paths pass through.
fn expand_home(path: PathBuf) -> PathBuf {
    match (path.strip_prefix("~"), std::env::var_os("HOME")) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => path,
    }
}

impl HostEntry {
    fn into_host(self) -> Result<Host, String> {
        let parsed = self
            .address
            .as_deref()
            .map(ServerAddress::parse)
            .transpose()
            .map_err(|e| format!("host {}: {}", self.id, e))?;

        let hostname = self
            .hostname
            .or_else(|| parsed.as_ref().map(|a| a.host.clone()))
            .ok_or_else(|| format!("host {}: address or hostname is required", self.id))?;
        let port = self
            .port
            .or_else(|| parsed.as_ref().map(|a| a.port))
            .unwrap_or(22);
        let username = self
            .username
            .or_else(|| parsed.as_ref().and_then(|a| a.user.clone()))
            .ok_or_else(|| format!("host {}: username is required", self.id))?;

        if self.capacity == 0 {
            return Err(format!("host {}: capacity must be at least 1", self.id));
        }

        Ok(Host {
            id: HostId::new(self.id),
            hostname,
            port,
            username,
            os_type: self.os_type,
            status: HostStatus::Offline,
            ssh_key_path: expand_home(self.ssh_key),
            capacity_max_swarms: self.capacity,
            current_swarms: self.current_swarms,
            metadata: self.metadata,
            last_seen: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_key_paths_are_untouched() {
        assert_eq!(expand_home(PathBuf::from("/keys/h1")), PathBuf::from("/keys/h1"));
    }

    #[test]
    fn home_relative_key_path_expands() {
        let expanded = expand_home(PathBuf::from("~/.ssh/id_ed25519"));
        if std::env::var_os("HOME").is_some() {
            assert!(!expanded.starts_with("~"));
            assert!(expanded.ends_with(".ssh/id_ed25519"));
        }
    }
}
