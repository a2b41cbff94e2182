// ABOUTME: Git repository reference parsing and validation.
// ABOUTME: Handles owner/name shorthand, https:// URLs, and git@host:owner/name forms.

use std::fmt;
use thiserror::Error;

const DEFAULT_HOST: &str = "github.com";

#[derive(Debug, Error)]
pub enum ParseRepoRefError {
    #[error("repository reference cannot be empty")]
    Empty,

    #[error("invalid character in repository reference: {0}")]
    InvalidChar(char),

    #[error("invalid repository reference format: {0}")]
    InvalidFormat(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    host: String,
    owner: String,
    name: String,
    ssh: bool,
}

impl RepoRef {
    pub fn parse(input: &str) -> Result<Self, ParseRepoRefError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseRepoRefError::Empty);
        }

        for c in input.chars() {
            if !c.is_ascii_alphanumeric() && !matches!(c, '/' | ':' | '.' | '-' | '_' | '@') {
                return Err(ParseRepoRefError::InvalidChar(c));
            }
        }

        let (host, path, ssh) = if let Some(rest) = input.strip_prefix("https://") {
            let (host, path) = rest
                .split_once('/')
                .ok_or_else(|| ParseRepoRefError::InvalidFormat(input.to_string()))?;
            (host, path, false)
        } else if let Some(rest) = input.strip_prefix("git@") {
            let (host, path) = rest
                .split_once(':')
                .ok_or_else(|| ParseRepoRefError::InvalidFormat(input.to_string()))?;
            (host, path, true)
        } else if input.contains(':') || input.contains('@') {
            return Err(ParseRepoRefError::InvalidFormat(input.to_string()));
        } else {
            (DEFAULT_HOST, input, false)
        };

        let path = path.trim_end_matches('/');
        let path = path.strip_suffix(".git").unwrap_or(path);

        let (owner, name) = match path.split('/').collect::<Vec<_>>().as_slice() {
            [owner, name] if !owner.is_empty() && !name.is_empty() => {
                ((*owner).to_string(), (*name).to_string())
            }
            _ => return Err(ParseRepoRefError::InvalidFormat(input.to_string())),
        };

        if host.is_empty() || owner.starts_with('-') || name.starts_with('-') {
            return Err(ParseRepoRefError::InvalidFormat(input.to_string()));
        }

        Ok(Self {
            host: host.to_string(),
            owner,
            name,
            ssh,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `owner/name` form, as tracked by the swarm's project tracker.
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// URL suitable for `git clone`.
    pub fn clone_url(&self) -> String {
        if self.ssh {
            format!("git@{}:{}/{}.git", self.host, self.owner, self.name)
        } else {
            format!("https://{}/{}/{}.git", self.host, self.owner, self.name)
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.host, self.slug())
    }
}
