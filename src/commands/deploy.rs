// ABOUTME: Deploy command implementation.
// ABOUTME: Runs one draft deployment through the orchestrator and reports the outcome.

use super::context::ControlPlane;
use swarmctl::error::Result;
use swarmctl::output::Output;
use swarmctl::types::DeploymentId;

const IN_MEMORY_NOTE: &str = "Note: state is loaded from the config file and kept in memory; \
the deployment status and host swarm count are not persisted after this run";

pub async fn deploy(plane: ControlPlane, id: &str, mut output: Output) -> Result<()> {
    output.start_timer();
    let orchestrator = plane.orchestrator()?;
    let id = DeploymentId::new(id);

    output.progress(&format!("Deploying {id}..."));
    output.progress(IN_MEMORY_NOTE);
    let result = orchestrator.deploy(&id).await;

    if let Some(progress) = orchestrator.progress(&id) {
        for entry in &progress.logs {
            output.progress(&format!("  → {}", entry.message));
        }
    }

    let report = result?;
    for warning in &report.warnings {
        output.warning(warning);
    }

    plane.pool.close_all().await;
    output.result(
        &format!(
            "Deployed swarm {} on host {} ({})",
            report.swarm_id, report.host_id, report.host_url
        ),
        &report,
    );
    Ok(())
}
