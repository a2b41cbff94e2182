// ABOUTME: Validated swarm name.
// ABOUTME: Names become remote directory components, so they follow RFC 1123 label rules.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SwarmNameError {
    #[error("swarm name cannot be empty")]
    Empty,

    #[error("swarm name exceeds maximum length of 63 characters")]
    TooLong,

    #[error("swarm name cannot start with a hyphen")]
    StartsWithHyphen,

    #[error("swarm name cannot end with a hyphen")]
    EndsWithHyphen,

    #[error("swarm name must be lowercase")]
    NotLowercase,

    #[error("invalid character in swarm name: '{0}'")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SwarmName(String);

impl SwarmName {
    pub fn new(value: &str) -> Result<Self, SwarmNameError> {
        if value.is_empty() {
            return Err(SwarmNameError::Empty);
        }

        if value.len() > 63 {
            return Err(SwarmNameError::TooLong);
        }

        if value.starts_with('-') {
            return Err(SwarmNameError::StartsWithHyphen);
        }

        if value.ends_with('-') {
            return Err(SwarmNameError::EndsWithHyphen);
        }

        for c in value.chars() {
            if c.is_ascii_uppercase() {
                return Err(SwarmNameError::NotLowercase);
            }
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' {
                return Err(SwarmNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SwarmName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for SwarmName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SwarmName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        SwarmName::new(&s).map_err(serde::de::Error::custom)
    }
}
