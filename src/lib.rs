// ABOUTME: Library root for swarmctl - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod exec;
pub mod model;
pub mod monitor;
pub mod notify;
pub mod output;
pub mod remote;
pub mod shell;
pub mod ssh;
pub mod store;
pub mod types;
