// ABOUTME: Validated container reference (daemon ID or container name).
// ABOUTME: Rejects malformed refs before they can reach the daemon.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Longest reference accepted from clients.
pub const MAX_REF_LEN: usize = 128;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContainerRefError {
    #[error("container reference cannot be empty")]
    Empty,

    #[error("container reference exceeds maximum length of {MAX_REF_LEN} characters")]
    TooLong,

    #[error("container reference must start with a letter or digit")]
    InvalidStart,

    #[error("invalid character in container reference: '{0}'")]
    InvalidChar(char),
}

/// Stable identifier for a container: a daemon-assigned ID (or ID prefix) or a name.
///
/// Accepts the daemon's name grammar `[a-zA-Z0-9][a-zA-Z0-9_.-]*`. A single leading
/// `/`, as the daemon reports names, is stripped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerRef(String);

impl ContainerRef {
    pub fn parse(input: &str) -> Result<Self, ContainerRefError> {
        let value = input.strip_prefix('/').unwrap_or(input);

        if value.is_empty() {
            return Err(ContainerRefError::Empty);
        }

        if value.len() > MAX_REF_LEN {
            return Err(ContainerRefError::TooLong);
        }

        let mut chars = value.chars();
        if let Some(first) = chars.next()
            && !first.is_ascii_alphanumeric()
        {
            return Err(ContainerRefError::InvalidStart);
        }

        for c in chars {
            if !c.is_ascii_alphanumeric() && c != '_' && c != '.' && c != '-' {
                return Err(ContainerRefError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    /// A fresh name: `prefix` followed by 8 random hex digits.
    ///
    /// `prefix` must itself be a valid reference start.
    pub fn generate(prefix: &str) -> Self {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let name = format!("{}{}", prefix, &id[..8]);
        debug_assert!(Self::parse(&name).is_ok(), "invalid prefix: {prefix}");
        Self(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ContainerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ContainerRef {
    type Err = ContainerRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ContainerRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ContainerRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(serde::de::Error::custom)
    }
}
