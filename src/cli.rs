// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "swarmctl")]
#[command(about = "Control plane for remote agent swarms over SSH")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print final results
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Path to the config file (default: discovered in the current directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new swarmctl.yml configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Run the swarm poller and heartbeat watchdog until interrupted
    Serve,

    /// Deploy a draft deployment from the config
    ///
    /// Hosts, swarms and deployments are loaded from the config file into
    /// memory for this run only. The new swarm, the deployment's status and
    /// the host's swarm count are not persisted, so host capacity is only
    /// enforced within a single invocation.
    Deploy {
        /// Deployment id
        id: String,
    },

    /// Run a whitelisted command on a host
    Exec {
        /// Host id
        host: String,

        /// Command type, see `swarmctl commands`
        command: String,

        /// Command parameter as key=value (repeatable)
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// Operator recorded in the audit log (default: user@hostname)
        #[arg(long = "as")]
        executed_by: Option<String>,
    },

    /// List the commands available for an OS type
    Commands {
        /// linux or windows
        #[arg(default_value = "linux")]
        os: String,
    },

    /// Test SSH connectivity to a host
    Check {
        /// Host id
        host: String,
    },

    /// Run one poll cycle over all swarms
    Poll,
}

fn parse_param(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{s}'")),
    }
}
