// ABOUTME: Config values that may come from the environment instead of the file.
// ABOUTME: Used for secrets such as the heartbeat API key.

use crate::error::{Error, Result};
use serde::Deserialize;

/// Either `key: literal` or `key: { env: VAR, default: fallback }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Literal(String),
    FromEnv {
        #[serde(rename = "env")]
        var: String,
        #[serde(default)]
        default: Option<String>,
    },
}

impl EnvValue {
    pub fn resolve(&self) -> Result<String> {
        self.resolve_with(|var| std::env::var(var).ok())
    }

    fn resolve_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<String> {
        match self {
            EnvValue::Literal(s) => Ok(s.clone()),
            EnvValue::FromEnv { var, default } => lookup(var)
                .or_else(|| default.clone())
                .ok_or_else(|| Error::MissingEnvVar(var.clone())),
        }
    }
}
