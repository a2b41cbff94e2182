// ABOUTME: Immutable audit record of one remote command execution.
// ABOUTME: Output is truncated to an excerpt so audit rows stay bounded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AuditId, HostId};

/// Maximum bytes of stdout/stderr kept in an audit row.
pub const EXCERPT_LIMIT: usize = 4096;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditId,
    pub host_id: HostId,
    pub command: String,
    pub executed_by: String,
    pub exit_code: Option<u32>,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    pub success: bool,
    pub metadata: serde_json::Value,
    pub executed_at: DateTime<Utc>,
}

/// Truncate `text` to at most [`EXCERPT_LIMIT`] bytes on a char boundary.
pub fn excerpt(text: &str) -> String {
    if text.len() <= EXCERPT_LIMIT {
        return text.to_string();
    }
    let mut end = EXCERPT_LIMIT;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…[truncated]", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_output_kept_verbatim() {
        assert_eq!(excerpt("ok\n"), "ok\n");
    }

    #[test]
    fn long_output_truncated_on_char_boundary() {
        let text = "é".repeat(EXCERPT_LIMIT);
        let out = excerpt(&text);
        assert!(out.ends_with("[truncated]"));
        assert!(out.len() < text.len());
    }
}
