// ABOUTME: Inbound request shapes and their validation.
// ABOUTME: Everything here runs before the daemon is contacted; failures are BadRequest.

use super::error::ApiError;
use crate::runtime::{ContainerConfig, ContainerFilters, EventFilter, LogOptions, PortMapping};
use crate::types::{ContainerRef, ImageRef};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Raw query string pairs, in order, repeated keys kept.
pub type QueryPairs = Vec<(String, String)>;

/// Event types the daemon can filter on.
const EVENT_TYPES: &[&str] = &[
    "container", "image", "volume", "network", "daemon", "plugin", "node", "service", "secret",
    "config",
];

const MAX_FILTER_LEN: usize = 256;

pub fn parse_ref(raw: &str) -> Result<ContainerRef, ApiError> {
    ContainerRef::parse(raw).map_err(|e| ApiError::bad_request(e.to_string()))
}

pub fn parse_image(raw: &str) -> Result<ImageRef, ApiError> {
    ImageRef::parse(raw).map_err(|e| ApiError::bad_request(format!("invalid image: {e}")))
}

/// Query flags accept `?all`, `?all=true`, `?all=1`, `?all=false`, `?all=0`.
fn parse_flag(key: &str, value: &str) -> Result<bool, ApiError> {
    match value.to_ascii_lowercase().as_str() {
        "" | "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ApiError::bad_request(format!(
            "invalid value for {key}: expected a boolean"
        ))),
    }
}

fn unknown_param(key: &str) -> ApiError {
    ApiError::bad_request(format!("unknown query parameter: {key}"))
}

fn filter_value(key: &str, value: &str) -> Result<String, ApiError> {
    if value.is_empty() {
        return Err(ApiError::bad_request(format!("{key} filter cannot be empty")));
    }
    if value.len() > MAX_FILTER_LEN {
        return Err(ApiError::bad_request(format!("{key} filter is too long")));
    }
    if value.chars().any(char::is_control) {
        return Err(ApiError::bad_request(format!(
            "{key} filter contains control characters"
        )));
    }
    Ok(value.to_string())
}

/// `GET /containers`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub all: bool,
    pub name: Option<String>,
    pub labels: HashMap<String, String>,
}

impl ListQuery {
    pub fn from_pairs(pairs: &[(String, String)]) -> Result<Self, ApiError> {
        let mut query = ListQuery::default();
        for (key, value) in pairs {
            match key.as_str() {
                "all" => query.all = parse_flag(key, value)?,
                "name" => query.name = Some(filter_value(key, value)?),
                "label" => {
                    let value = filter_value(key, value)?;
                    let (k, v) = value.split_once('=').unwrap_or((value.as_str(), ""));
                    if k.is_empty() {
                        return Err(ApiError::bad_request("label filter needs a key"));
                    }
                    query.labels.insert(k.to_string(), v.to_string());
                }
                other => return Err(unknown_param(other)),
            }
        }
        Ok(query)
    }

    pub fn into_filters(self) -> ContainerFilters {
        ContainerFilters {
            labels: self.labels,
            name: self.name,
            all: self.all,
        }
    }
}

/// `POST /containers/{ref}/stop`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StopQuery {
    pub timeout: Option<Duration>,
}

impl StopQuery {
    pub fn from_pairs(pairs: &[(String, String)]) -> Result<Self, ApiError> {
        let mut query = StopQuery::default();
        for (key, value) in pairs {
            match key.as_str() {
                "timeout" | "t" => {
                    let secs: u64 = value.parse().map_err(|_| {
                        ApiError::bad_request("timeout must be a whole number of seconds")
                    })?;
                    query.timeout = Some(Duration::from_secs(secs));
                }
                other => return Err(unknown_param(other)),
            }
        }
        Ok(query)
    }
}

/// `POST /containers/{ref}/remove` and `POST /images/{ref}/remove`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveQuery {
    pub force: bool,
}

impl RemoveQuery {
    pub fn from_pairs(pairs: &[(String, String)]) -> Result<Self, ApiError> {
        let mut query = RemoveQuery::default();
        for (key, value) in pairs {
            match key.as_str() {
                "force" => query.force = parse_flag(key, value)?,
                other => return Err(unknown_param(other)),
            }
        }
        Ok(query)
    }
}

/// `GET /containers/{ref}/logs`
pub fn log_options_from_pairs(pairs: &[(String, String)]) -> Result<LogOptions, ApiError> {
    let mut opts = LogOptions::default();
    for (key, value) in pairs {
        match key.as_str() {
            "follow" => opts.follow = parse_flag(key, value)?,
            "stdout" => opts.stdout = parse_flag(key, value)?,
            "stderr" => opts.stderr = parse_flag(key, value)?,
            "timestamps" => opts.timestamps = parse_flag(key, value)?,
            "tail" => {
                opts.tail = match value.as_str() {
                    "" | "all" => None,
                    n => Some(n.parse().map_err(|_| {
                        ApiError::bad_request("tail must be a number of lines or \"all\"")
                    })?),
                }
            }
            other => return Err(unknown_param(other)),
        }
    }

    if !opts.stdout && !opts.stderr {
        return Err(ApiError::bad_request(
            "at least one of stdout or stderr must be selected",
        ));
    }
    Ok(opts)
}

/// `GET /events`
pub fn event_filter_from_pairs(pairs: &[(String, String)]) -> Result<EventFilter, ApiError> {
    let mut filter = EventFilter::default();
    for (key, value) in pairs {
        match key.as_str() {
            "type" => {
                if !EVENT_TYPES.contains(&value.as_str()) {
                    return Err(ApiError::bad_request(format!(
                        "unknown event type: {}",
                        value.escape_default()
                    )));
                }
                filter.types.push(value.clone());
            }
            "container" => filter.containers.push(parse_ref(value)?.into_inner()),
            "action" | "event" => filter.actions.push(filter_value("action", value)?),
            other => return Err(unknown_param(other)),
        }
    }
    Ok(filter)
}

/// `POST /containers` body.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateRequest {
    pub image: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub command: Option<Vec<String>>,

    #[serde(default)]
    pub env: HashMap<String, String>,

    #[serde(default)]
    pub labels: HashMap<String, String>,

    #[serde(default)]
    pub ports: Vec<String>,

    /// Pull the image first when it is not present locally.
    #[serde(default)]
    pub pull: bool,
}

impl CreateRequest {
    /// Validate into a daemon-ready config. `generate_name` supplies the name
    /// when the client did not.
    pub fn into_config<F>(self, generate_name: F) -> Result<ContainerConfig, ApiError>
    where
        F: FnOnce() -> ContainerRef,
    {
        let image = parse_image(&self.image)?;

        let name = match self.name {
            Some(ref raw) => parse_ref(raw)?,
            None => generate_name(),
        };

        for key in self.env.keys() {
            validate_env_key(key)?;
        }

        for key in self.labels.keys() {
            if key.is_empty() || key.chars().any(|c| c.is_control() || c == '=') {
                return Err(ApiError::bad_request(format!(
                    "invalid label key: {}",
                    key.escape_default()
                )));
            }
        }

        let ports = self
            .ports
            .iter()
            .map(|p| PortMapping::parse(p).map_err(ApiError::bad_request))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(ref command) = self.command
            && command.is_empty()
        {
            return Err(ApiError::bad_request("command cannot be an empty list"));
        }

        Ok(ContainerConfig {
            name,
            image,
            env: self.env,
            labels: self.labels,
            ports,
            command: self.command,
        })
    }
}

fn validate_env_key(key: &str) -> Result<(), ApiError> {
    let valid = !key.is_empty()
        && !key.starts_with(|c: char| c.is_ascii_digit())
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!(
            "invalid environment variable name: {}",
            key.escape_default()
        )))
    }
}
