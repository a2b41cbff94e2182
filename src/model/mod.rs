// ABOUTME: Records the control plane reads and writes through its stores.
// ABOUTME: Hosts, swarms, deployments, audit entries, and deployment progress.

mod audit;
mod deployment;
mod host;
mod progress;
mod swarm;

pub use audit::{AuditEntry, EXCERPT_LIMIT, excerpt};
pub use deployment::{
    AgentRoster, AgentSpec, CompleteSteps, CustomerStep, Deployment, DeploymentEditError,
    DeploymentStep, HostSelection, RepositoryStep, SchedulePreset, ScheduleStep,
};
pub use host::Host;
pub use progress::{DeploymentProgress, ProgressLog};
pub use swarm::{HealthMetrics, Swarm, SwarmUpdate};
