// ABOUTME: Command module aggregator for the swarmctl CLI.
// ABOUTME: Re-exports deploy, exec, check, and monitor command handlers.

mod check;
mod context;
mod deploy;
mod exec;
mod monitor;

pub use check::check;
pub use context::ControlPlane;
pub use deploy::deploy;
pub use exec::{exec_command, list_commands};
pub use monitor::{poll, serve};
