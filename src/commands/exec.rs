// ABOUTME: Exec and commands implementations.
// ABOUTME: Runs whitelisted commands on a host and lists what is whitelisted per OS.

use super::context::ControlPlane;
use swarmctl::error::{Error, Result};
use swarmctl::exec::{CommandParams, available_commands};
use swarmctl::output::{Output, OutputMode};
use swarmctl::types::{HostId, OsType};

/// Execute a whitelisted command on one host.
pub async fn exec_command(
    plane: ControlPlane,
    host: &str,
    command: &str,
    params: Vec<(String, String)>,
    executed_by: Option<String>,
    mut output: Output,
) -> Result<()> {
    output.start_timer();
    let host_id = HostId::new(host);
    let params: CommandParams = params.into_iter().collect();
    let executed_by = executed_by.unwrap_or_else(default_operator);

    output.progress(&format!("  → Running {command} on {host_id}..."));
    let result = plane
        .executor()
        .execute(&host_id, command, &params, &executed_by)
        .await;
    plane.pool.close_all().await;
    let result = result?;

    if output.mode() == OutputMode::Json {
        output.result(command, &result);
    } else {
        if !result.stdout.is_empty() {
            print!("{}", result.stdout);
        }
        if !result.stderr.is_empty() {
            eprint!("{}", result.stderr);
        }
    }

    if !result.success {
        let code = result
            .exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "none".to_string());
        return Err(Error::CommandFailed(format!("{command} exited with {code}")));
    }
    output.success(&format!("{command} completed on {host_id}"));
    Ok(())
}

pub fn list_commands(os: &str, output: &Output) -> Result<()> {
    let os: OsType = os.parse()?;
    let commands = available_commands(os);

    let mut summary = String::new();
    for spec in commands {
        let params: Vec<String> = spec
            .params
            .iter()
            .map(|p| {
                if p.required {
                    format!("{}=<..>", p.name)
                } else {
                    format!("[{}=<..>]", p.name)
                }
            })
            .collect();
        summary.push_str(&format!(
            "{:<16} {:<40} {}\n",
            spec.id,
            params.join(" "),
            spec.description
        ));
    }
    output.result(summary.trim_end(), &commands);
    Ok(())
}

/// `$USER@hostname`, recorded in the audit log when no operator is given.
fn default_operator() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "operator".to_string());
    format!("{}@{}", user, gethostname::gethostname().to_string_lossy())
}
