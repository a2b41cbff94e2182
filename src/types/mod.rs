// ABOUTME: Type-safe identifiers, status enums, and validated domain types.
// ABOUTME: Uses phantom types to prevent ID confusion at compile time.

mod id;
mod os_type;
mod repo_ref;
mod status;
mod swarm_name;

pub use id::{AuditId, DeploymentId, HostId, SwarmId};
pub use os_type::{OsType, ParseOsTypeError};
pub use repo_ref::{ParseRepoRefError, RepoRef};
pub use status::{
    DeploymentStatus, HostStatus, InvalidTransition, ProgressStatus, SwarmStatus,
};
pub use swarm_name::{SwarmName, SwarmNameError};
