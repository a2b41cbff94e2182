// ABOUTME: Managed host record.
// ABOUTME: A customer machine reachable over SSH that runs one or more swarms.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::types::{HostId, HostStatus, OsType};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Host {
    pub id: HostId,
    pub hostname: String,
    pub port: u16,
    pub username: String,
    pub os_type: OsType,
    #[serde(default)]
    pub status: HostStatus,
    pub ssh_key_path: PathBuf,
    pub capacity_max_swarms: u32,
    #[serde(default)]
    pub current_swarms: u32,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
}

impl Host {
    /// Whether another swarm may be admitted onto this host.
    pub fn has_capacity(&self) -> bool {
        self.current_swarms < self.capacity_max_swarms
    }

    /// `host:port` as shown in logs.
    pub fn address(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }
}
