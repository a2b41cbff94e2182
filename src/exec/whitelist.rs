// ABOUTME: Per-OS whitelist of remote commands and their parameters.
// ABOUTME: Renders a whitelisted command id plus validated params into a shell command.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::remote::SwarmLayout;
use crate::types::{OsType, SwarmName};

pub type CommandParams = BTreeMap<String, String>;

pub const CHECK_STATUS: &str = "check_status";
pub const RESTART_SWARM: &str = "restart_swarm";
pub const STOP_SWARM: &str = "stop_swarm";
pub const UPDATE_SETTINGS: &str = "update_settings";
pub const GET_LOGS: &str = "get_logs";

const DEFAULT_LOG_LINES: u32 = 100;
const MAX_LOG_LINES: u32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    /// A swarm name; resolves to the swarm's directory under the base dir.
    Swarm,
    /// A positive integer within a bound.
    Count,
    /// A TCP port.
    Port,
    /// Free text shipped over stdin, never interpolated.
    Content,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CommandSpec {
    pub id: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
}

const SWARM: ParamSpec = ParamSpec {
    name: "swarm",
    kind: ParamKind::Swarm,
    required: true,
};

const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        id: CHECK_STATUS,
        description: "Report whether the swarm process is running",
        params: &[SWARM],
    },
    CommandSpec {
        id: RESTART_SWARM,
        description: "Stop and relaunch the swarm",
        params: &[
            SWARM,
            ParamSpec {
                name: "port",
                kind: ParamKind::Port,
                required: false,
            },
        ],
    },
    CommandSpec {
        id: STOP_SWARM,
        description: "Stop the swarm process",
        params: &[SWARM],
    },
    CommandSpec {
        id: UPDATE_SETTINGS,
        description: "Replace the swarm's settings.ini",
        params: &[
            SWARM,
            ParamSpec {
                name: "content",
                kind: ParamKind::Content,
                required: true,
            },
        ],
    },
    CommandSpec {
        id: GET_LOGS,
        description: "Show the tail of the swarm log",
        params: &[
            SWARM,
            ParamSpec {
                name: "lines",
                kind: ParamKind::Count,
                required: false,
            },
        ],
    },
];

/// Commands permitted on hosts of `os`.
pub fn available_commands(os: OsType) -> &'static [CommandSpec] {
    // Both shells support the same operations; only the rendering differs.
    match os {
        OsType::Linux | OsType::Windows => COMMANDS,
    }
}

pub fn lookup(command_type: &str, os: OsType) -> Option<&'static CommandSpec> {
    available_commands(os).iter().find(|c| c.id == command_type)
}

pub fn is_whitelisted(command_type: &str, os: OsType) -> bool {
    lookup(command_type, os).is_some()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid parameter '{name}': {reason}")]
pub struct ParamError {
    pub name: String,
    pub reason: String,
}

impl ParamError {
    fn new(name: &str, reason: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Parameters that passed validation against a [`CommandSpec`].
#[derive(Debug, Clone)]
pub struct ValidatedParams {
    pub swarm: SwarmName,
    pub lines: u32,
    pub port: Option<u16>,
    pub content: Option<String>,
}

/// Check `params` against the command's declared parameters. Unknown keys,
/// missing required keys, and malformed values are rejected.
pub fn validate(spec: &CommandSpec, params: &CommandParams) -> Result<ValidatedParams, ParamError> {
    if let Some(unknown) = params
        .keys()
        .find(|k| !spec.params.iter().any(|p| p.name == k.as_str()))
    {
        return Err(ParamError::new(unknown, format!("not accepted by {}", spec.id)));
    }
    for p in spec.params.iter().filter(|p| p.required) {
        if !params.contains_key(p.name) {
            return Err(ParamError::new(p.name, "required"));
        }
    }

    let swarm = params
        .get(SWARM.name)
        .ok_or_else(|| ParamError::new(SWARM.name, "required"))?;
    let mut out = ValidatedParams {
        swarm: SwarmName::new(swarm).map_err(|e| ParamError::new(SWARM.name, e.to_string()))?,
        lines: DEFAULT_LOG_LINES,
        port: None,
        content: None,
    };

    for (name, value) in params {
        let Some(p) = spec.params.iter().find(|p| p.name == name.as_str()) else {
            continue;
        };
        match p.kind {
            ParamKind::Swarm => {}
            ParamKind::Count => {
                let n: u32 = value
                    .parse()
                    .map_err(|_| ParamError::new(name, "expected a positive integer"))?;
                if n == 0 || n > MAX_LOG_LINES {
                    return Err(ParamError::new(
                        name,
                        format!("must be between 1 and {MAX_LOG_LINES}"),
                    ));
                }
                out.lines = n;
            }
            ParamKind::Port => {
                let port: u16 = value
                    .parse()
                    .map_err(|_| ParamError::new(name, "expected a port number"))?;
                if port == 0 {
                    return Err(ParamError::new(name, "must be non-zero"));
                }
                out.port = Some(port);
            }
            ParamKind::Content => out.content = Some(value.clone()),
        }
    }
    Ok(out)
}

/// Shell command for a whitelisted, non-upload command.
pub fn render(
    spec: &CommandSpec,
    layout: &SwarmLayout,
    params: &ValidatedParams,
    default_port: u16,
) -> Option<String> {
    let cmd = match spec.id {
        CHECK_STATUS => layout.status(),
        RESTART_SWARM => layout.restart(params.port.unwrap_or(default_port)),
        STOP_SWARM => layout.stop(),
        GET_LOGS => layout.tail_logs(params.lines),
        _ => return None,
    };
    Some(cmd)
}
