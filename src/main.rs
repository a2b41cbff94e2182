// ABOUTME: Entry point for the swarmctl CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use commands::ControlPlane;
use std::env;
use swarmctl::config::{self, Config};
use swarmctl::error::Result;
use swarmctl::output::{Output, OutputMode};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise warn, or debug with --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = OutputMode::from_flags(cli.quiet, cli.json);
    let result = run(cli, mode).await;

    if let Err(e) = result {
        Output::new(mode).error(&e.to_string());
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => Config::load(path),
        None => Config::discover(&env::current_dir()?),
    }
}

async fn run(cli: Cli, mode: OutputMode) -> Result<()> {
    let output = Output::new(mode);
    match &cli.command {
        Commands::Init { force } => {
            let cwd = env::current_dir()?;
            config::init_config(&cwd, *force)?;
            output.success(&format!("Created {}", config::CONFIG_FILENAME));
            Ok(())
        }
        Commands::Commands { os } => commands::list_commands(os, &output),
        Commands::Serve => commands::serve(ControlPlane::new(load_config(&cli)?), output).await,
        Commands::Deploy { id } => {
            commands::deploy(ControlPlane::new(load_config(&cli)?), id, output).await
        }
        Commands::Exec {
            host,
            command,
            params,
            executed_by,
        } => {
            let plane = ControlPlane::new(load_config(&cli)?);
            commands::exec_command(
                plane,
                host,
                command,
                params.clone(),
                executed_by.clone(),
                output,
            )
            .await
        }
        Commands::Check { host } => {
            commands::check(ControlPlane::new(load_config(&cli)?), host, output).await
        }
        Commands::Poll => commands::poll(ControlPlane::new(load_config(&cli)?), output).await,
    }
}
