// ABOUTME: Renders a swarm's settings.ini from the deployment's step payloads.
// ABOUTME: The swarm's heartbeat agent and API server read this file at startup.

use std::fmt::Write as _;

use crate::model::{AgentRoster, CustomerStep};
use crate::types::{RepoRef, SwarmId, SwarmName};

use super::schedule::ResolvedSchedule;

/// Where and how often the swarm pushes heartbeats.
#[derive(Debug, Clone, Copy)]
pub struct HeartbeatTarget<'a> {
    pub monitor_url: Option<&'a str>,
    pub api_key: Option<&'a str>,
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct SettingsContext<'a> {
    pub swarm_id: &'a SwarmId,
    pub name: &'a SwarmName,
    pub repository: &'a RepoRef,
    pub branch: Option<&'a str>,
    pub schedule: &'a ResolvedSchedule,
    pub agents: &'a AgentRoster,
    pub customer: &'a CustomerStep,
    pub heartbeat: HeartbeatTarget<'a>,
    pub api_port: u16,
}

/// Minimal INI writer. Values are flattened onto one line so user input
/// cannot open new sections or keys, and `%` is doubled because the swarm
/// reads the file with interpolation enabled.
#[derive(Default)]
struct Ini {
    out: String,
}

impl Ini {
    fn section(&mut self, name: &str) -> &mut Self {
        if !self.out.is_empty() {
            self.out.push('\n');
        }
        let _ = writeln!(self.out, "[{name}]");
        self
    }

    fn set(&mut self, key: &str, value: impl AsRef<str>) -> &mut Self {
        let value: String = value
            .as_ref()
            .chars()
            .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
            .collect();
        let _ = writeln!(self.out, "{key} = {}", value.trim().replace('%', "%%"));
        self
    }

    fn set_opt(&mut self, key: &str, value: Option<&str>) -> &mut Self {
        match value {
            Some(v) => self.set(key, v),
            None => self,
        }
    }
}

pub fn settings_ini(ctx: &SettingsContext<'_>) -> String {
    let mut ini = Ini::default();

    ini.section("swarm")
        .set("name", ctx.name.as_str())
        .set("swarm_id", ctx.swarm_id.as_str());

    ini.section("heartbeat")
        .set("swarm_id", ctx.swarm_id.as_str())
        .set_opt("monitor_url", ctx.heartbeat.monitor_url)
        .set_opt("api_key", ctx.heartbeat.api_key)
        .set("interval", ctx.heartbeat.interval_secs.to_string());

    ini.section("api")
        .set("host", "0.0.0.0")
        .set("port", ctx.api_port.to_string())
        .set_opt("api_key", ctx.customer.api_key.as_deref())
        .set("cors_origins", "*");

    ini.section("project_tracking")
        .set("github_repo", ctx.repository.slug())
        .set("repository_url", ctx.repository.clone_url())
        .set_opt("branch", ctx.branch);

    ini.section("schedule")
        .set_opt("preset", ctx.schedule.preset.map(|p| p.as_str()))
        .set("cron", &ctx.schedule.cron)
        .set("timezone", &ctx.schedule.timezone);

    let enabled: Vec<&str> = ctx.agents.enabled().map(|a| a.name.as_str()).collect();
    ini.section("agents")
        .set("total", ctx.agents.agents.len().to_string())
        .set("enabled", enabled.join(","));
    for (i, agent) in ctx.agents.agents.iter().enumerate() {
        ini.section(&format!("agent.{}", i + 1))
            .set("name", &agent.name)
            .set("role", &agent.role)
            .set("enabled", agent.enabled.to_string());
    }

    ini.section("customer")
        .set("name", &ctx.customer.customer_name)
        .set("email", &ctx.customer.email)
        .set_opt("plan", ctx.customer.plan.as_deref());

    ini.out
}
