// ABOUTME: Serve and poll implementations.
// ABOUTME: serve runs the poller and watchdog until Ctrl-C; poll runs a single cycle.

use std::sync::Arc;

use super::context::ControlPlane;
use swarmctl::error::Result;
use swarmctl::monitor::Monitor;
use swarmctl::output::Output;

pub async fn serve(plane: ControlPlane, output: Output) -> Result<()> {
    let poller = Arc::new(plane.poller()?);
    let watchdog = Arc::new(plane.watchdog());

    let poller = Monitor::new(poller.clone(), poller.settings().interval);
    let watchdog = Monitor::new(watchdog.clone(), watchdog.settings().interval);
    poller.start();
    watchdog.start();

    output.progress("Monitoring swarms (Ctrl-C to stop)...");
    tracing::info!("control plane monitors started");

    tokio::signal::ctrl_c().await?;

    poller.stop().await;
    watchdog.stop().await;
    plane.pool.close_all().await;

    let statuses = [poller.status(), watchdog.status()];
    output.result(
        &format!(
            "Stopped after {} poll and {} watchdog cycles",
            statuses[0].cycles, statuses[1].cycles
        ),
        &statuses,
    );
    Ok(())
}

pub async fn poll(plane: ControlPlane, mut output: Output) -> Result<()> {
    output.start_timer();
    let summary = plane.poller()?.poll_once().await;
    output.result(
        &format!(
            "Polled {} swarm(s): {} online, {} degraded, {} offline, {} marked stale",
            summary.polled, summary.online, summary.degraded, summary.offline, summary.marked_stale
        ),
        &summary,
    );
    Ok(())
}
