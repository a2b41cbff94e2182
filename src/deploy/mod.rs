// ABOUTME: Deployment orchestration: draft -> deploying -> deployed | failed.
// ABOUTME: Exports the orchestrator, its settings, progress tracking, and error types.

mod error;
mod orchestrator;
pub mod render;
pub mod schedule;
mod tracker;

pub use error::{DeployError, DeployErrorKind};
pub use orchestrator::{DeployReport, DeploySettings, HEARTBEAT_PATH, Orchestrator};
pub use tracker::{InFlight, InFlightGuard, ProgressTracker};
