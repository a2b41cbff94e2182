// ABOUTME: On-host layout of a deployed swarm and the shell commands that manage it.
// ABOUTME: Shared by the deployment orchestrator and the whitelisted command executor.

use crate::shell::{join, powershell, quote, quote_path};
use crate::types::{OsType, SwarmName};

pub const SETTINGS_FILE: &str = "settings.ini";
pub const REPO_DIR: &str = "repo";
pub const LOG_FILE: &str = "swarm.log";
pub const PID_FILE: &str = "swarm.pid";

/// Exit code the status command uses when the swarm is not running.
pub const STOPPED_EXIT_CODE: u32 = 3;

/// Where one swarm lives on its host:
///
/// ```text
/// <base_dir>/<swarm-name>/
///     settings.ini
///     swarm.log
///     swarm.pid
///     repo/
/// ```
#[derive(Debug, Clone)]
pub struct SwarmLayout {
    os: OsType,
    dir: String,
}

impl SwarmLayout {
    pub fn new(os: OsType, base_dir: &str, name: &SwarmName) -> Self {
        Self {
            os,
            dir: join(os, base_dir, name.as_str()),
        }
    }

    pub fn os(&self) -> OsType {
        self.os
    }

    pub fn dir(&self) -> &str {
        &self.dir
    }

    pub fn settings_path(&self) -> String {
        join(self.os, &self.dir, SETTINGS_FILE)
    }

    pub fn repo_dir(&self) -> String {
        join(self.os, &self.dir, REPO_DIR)
    }

    pub fn log_path(&self) -> String {
        join(self.os, &self.dir, LOG_FILE)
    }

    fn pid_path(&self) -> String {
        join(self.os, &self.dir, PID_FILE)
    }

    fn q(&self, path: &str) -> String {
        quote_path(self.os, path)
    }

    pub fn create_dir(&self) -> String {
        match self.os {
            OsType::Linux => format!("mkdir -p {}", self.q(&self.dir)),
            OsType::Windows => powershell(&format!(
                "New-Item -ItemType Directory -Force -Path {} | Out-Null",
                self.q(&self.dir)
            )),
        }
    }

    pub fn clone_repo(&self, url: &str, branch: Option<&str>) -> String {
        let branch = branch
            .map(|b| format!("--branch {} ", quote(self.os, b)))
            .unwrap_or_default();
        let clone = format!(
            "git clone --depth 1 {}{} {}",
            branch,
            quote(self.os, url),
            self.q(&self.repo_dir())
        );
        match self.os {
            OsType::Linux => clone,
            OsType::Windows => powershell(&clone),
        }
    }

    pub fn install_dependencies(&self) -> String {
        let repo = self.q(&self.repo_dir());
        match self.os {
            OsType::Linux => format!(
                "cd {repo} && if [ -f requirements.txt ]; then python3 -m pip install --user -r requirements.txt; else echo 'no requirements.txt'; fi"
            ),
            OsType::Windows => powershell(&format!(
                "Set-Location {repo}; if (Test-Path 'requirements.txt') {{ python -m pip install --user -r requirements.txt }} else {{ 'no requirements.txt' }}"
            )),
        }
    }

    /// Start the swarm's API server (which runs the heartbeat agent) detached
    /// from the SSH session, recording its PID. The subshell `exec`s into the
    /// server so `$!` is the server itself under any POSIX shell.
    pub fn launch(&self, port: u16) -> String {
        let repo = self.q(&self.repo_dir());
        let settings = self.q(&self.settings_path());
        let log = self.q(&self.log_path());
        let pid = self.q(&self.pid_path());
        match self.os {
            OsType::Linux => format!(
                "(cd {repo} && exec nohup python3 -m core.api_server --config {settings} --port {port} > {log} 2>&1 < /dev/null) & echo $! > {pid}"
            ),
            OsType::Windows => powershell(&format!(
                "$p = Start-Process -FilePath python -ArgumentList '-m','core.api_server','--config',{settings},'--port','{port}' -WorkingDirectory {repo} -WindowStyle Hidden -RedirectStandardOutput {log} -PassThru; $p.Id | Set-Content -Path {pid}"
            )),
        }
    }

    pub fn stop(&self) -> String {
        let pid = self.q(&self.pid_path());
        match self.os {
            OsType::Linux => format!(
                "if [ -f {pid} ]; then kill $(cat {pid}) 2>/dev/null; rm -f {pid}; fi; echo stopped"
            ),
            OsType::Windows => powershell(&format!(
                "if (Test-Path {pid}) {{ Stop-Process -Id (Get-Content {pid}) -Force -ErrorAction SilentlyContinue; Remove-Item {pid} }}; 'stopped'"
            )),
        }
    }

    pub fn restart(&self, port: u16) -> String {
        match self.os {
            // `;` keeps the launch's trailing `&` scoped to the server alone
            OsType::Linux => format!("{}; sleep 1; {}", self.stop(), self.launch(port)),
            OsType::Windows => format!("{} && {}", self.stop(), self.launch(port)),
        }
    }

    pub fn status(&self) -> String {
        let pid = self.q(&self.pid_path());
        match self.os {
            OsType::Linux => format!(
                "if [ -f {pid} ] && kill -0 $(cat {pid}) 2>/dev/null; then echo running; else echo stopped; exit {STOPPED_EXIT_CODE}; fi"
            ),
            OsType::Windows => powershell(&format!(
                "if ((Test-Path {pid}) -and (Get-Process -Id (Get-Content {pid}) -ErrorAction SilentlyContinue)) {{ 'running' }} else {{ 'stopped'; exit {STOPPED_EXIT_CODE} }}"
            )),
        }
    }

    pub fn tail_logs(&self, lines: u32) -> String {
        let log = self.q(&self.log_path());
        match self.os {
            OsType::Linux => format!("tail -n {lines} {log}"),
            OsType::Windows => powershell(&format!("Get-Content -Path {log} -Tail {lines}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linux() -> SwarmLayout {
        SwarmLayout::new(OsType::Linux, "~/swarms", &SwarmName::new("alpha").unwrap())
    }

    #[test]
    fn linux_paths() {
        let layout = linux();
        assert_eq!(layout.dir(), "~/swarms/alpha");
        assert_eq!(layout.settings_path(), "~/swarms/alpha/settings.ini");
        assert_eq!(layout.repo_dir(), "~/swarms/alpha/repo");
    }

    #[test]
    fn create_dir_expands_home() {
        assert_eq!(linux().create_dir(), "mkdir -p \"$HOME\"/'swarms/alpha'");
    }

    #[test]
    fn clone_quotes_url_and_branch() {
        let cmd = linux().clone_repo("https://github.com/acme/app.git", Some("main"));
        assert_eq!(
            cmd,
            "git clone --depth 1 --branch 'main' 'https://github.com/acme/app.git' \"$HOME\"/'swarms/alpha/repo'"
        );
    }

    #[test]
    fn restart_keeps_launch_backgrounding_separate() {
        let cmd = linux().restart(9000);
        assert!(cmd.contains("echo stopped; sleep 1; (cd "));
        assert!(!cmd.contains("&& (cd"));
    }

    #[test]
    fn launch_detaches_and_records_pid() {
        let cmd = linux().launch(8080);
        assert!(cmd.contains("nohup python3 -m core.api_server"));
        assert!(cmd.contains("--port 8080"));
        assert!(cmd.starts_with("(cd "));
        assert!(cmd.contains("&& exec nohup python3"));
        assert!(cmd.contains("< /dev/null) & echo $! >"));
        assert!(cmd.ends_with("> \"$HOME\"/'swarms/alpha/swarm.pid'"));
    }

    #[test]
    fn windows_commands_use_powershell() {
        let layout =
            SwarmLayout::new(OsType::Windows, "~/swarms", &SwarmName::new("alpha").unwrap());
        assert_eq!(layout.dir(), "~/swarms\\alpha");
        assert!(layout.create_dir().starts_with("powershell -NoProfile"));
        assert!(layout.tail_logs(50).contains("-Tail 50"));
    }
}
