// ABOUTME: Check command implementation.
// ABOUTME: Probes SSH connectivity to one host through the connection pool.

use super::context::ControlPlane;
use swarmctl::error::{Error, Result};
use swarmctl::output::Output;
use swarmctl::store::HostStore;
use swarmctl::types::HostId;

pub async fn check(plane: ControlPlane, host: &str, mut output: Output) -> Result<()> {
    output.start_timer();
    let host_id = HostId::new(host);
    let Some(record) = plane.store.get_host(&host_id).await? else {
        return Err(Error::HostNotFound(host.to_string()));
    };

    output.progress(&format!("  → Connecting to {}...", record.address()));
    let alive = plane.pool.test(&host_id).await;
    plane.pool.close_all().await;

    if alive {
        output.success(&format!("{host_id} is reachable"));
        Ok(())
    } else {
        Err(Error::CommandFailed(format!(
            "{host_id} ({}) is unreachable",
            record.address()
        )))
    }
}
