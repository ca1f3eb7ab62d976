// ABOUTME: Configuration types and parsing for nocli.yml.
// ABOUTME: Handles YAML parsing, environment overrides, and validation.

mod daemon;
mod health;
mod init;
pub mod listen;
mod streams;

pub use daemon::DaemonConfig;
pub use health::HealthConfig;
pub use init::init_config;
pub use streams::{OverflowPolicy, StreamsConfig};

use crate::error::{Error, Result};
use crate::runtime::DaemonEndpoint;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "nocli.yml";
pub const CONFIG_FILENAME_ALT: &str = "nocli.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".nocli/config.yml";

/// Environment variable carrying the listen port. Wins over [`ENV_PORT`].
pub const ENV_API_PORT: &str = "API_PORT";
pub const ENV_PORT: &str = "PORT";
pub const ENV_DOCKER_HOST: &str = "DOCKER_HOST";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "listen::default_listen", with = "listen")]
    pub listen: SocketAddr,

    #[serde(default)]
    pub daemon: DaemonConfig,

    /// Deadline for every non-streaming daemon call.
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Grace the daemon gives a container before killing it on stop.
    #[serde(default = "default_stop_timeout", with = "humantime_serde")]
    pub stop_timeout: Duration,

    #[serde(default)]
    pub streams: StreamsConfig,

    #[serde(default)]
    pub health: HealthConfig,
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_stop_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen: listen::default_listen(),
            daemon: DaemonConfig::default(),
            request_timeout: default_request_timeout(),
            stop_timeout: default_stop_timeout(),
            streams: StreamsConfig::default(),
            health: HealthConfig::default(),
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty file is a valid, all-defaults config
        if yaml.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!("Loading config from {}", path.display());
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Load `explicit` if given, else discover in `dir`, else use defaults.
    ///
    /// The service runs without a config file; environment variables and
    /// flags are enough.
    pub fn resolve(dir: &Path, explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        match Self::discover(dir) {
            Ok(config) => Ok(config),
            Err(Error::ConfigNotFound(_)) => {
                tracing::debug!("No config file in {}, using defaults", dir.display());
                Ok(Config::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Apply `API_PORT` / `PORT` and `DOCKER_HOST` from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides read through `lookup`.
    ///
    /// A port that does not parse is ignored with a warning and the
    /// configured listen address stays in effect.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = lookup(ENV_API_PORT)
            .filter(|v| !v.trim().is_empty())
            .map(|v| (ENV_API_PORT, v))
            .or_else(|| {
                lookup(ENV_PORT)
                    .filter(|v| !v.trim().is_empty())
                    .map(|v| (ENV_PORT, v))
            });

        if let Some((key, value)) = port {
            match listen::parse_port(&value) {
                Ok(port) => self.listen.set_port(port),
                Err(e) => tracing::warn!(
                    "Ignoring {}: {}; listening on {}",
                    key,
                    e,
                    self.listen
                ),
            }
        }

        if let Some(host) = lookup(ENV_DOCKER_HOST).filter(|v| !v.trim().is_empty()) {
            self.daemon.endpoint = Some(host);
        }

        Ok(())
    }

    /// Apply command-line overrides. These win over file and environment.
    pub fn apply_overrides(&mut self, listen: Option<&str>, daemon: Option<&str>) -> Result<()> {
        if let Some(addr) = listen {
            self.listen = listen::parse_listen(addr).map_err(Error::InvalidConfig)?;
        }
        if let Some(endpoint) = daemon {
            self.daemon.endpoint = Some(endpoint.to_string());
        }
        Ok(())
    }

    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "request_timeout must be greater than zero".to_string(),
            ));
        }
        if self.stop_timeout >= self.request_timeout {
            return Err(Error::InvalidConfig(format!(
                "stop_timeout ({:?}) must be shorter than request_timeout ({:?})",
                self.stop_timeout, self.request_timeout
            )));
        }
        if self.streams.buffer_limit == 0 {
            return Err(Error::InvalidConfig(
                "streams.buffer_limit must be at least 1".to_string(),
            ));
        }
        if self.health.timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "health.timeout must be greater than zero".to_string(),
            ));
        }
        if self.health.interval.is_some_and(|i| i.is_zero()) {
            return Err(Error::InvalidConfig(
                "health.interval must be greater than zero".to_string(),
            ));
        }
        if let Some(ref endpoint) = self.daemon.endpoint {
            endpoint
                .parse::<DaemonEndpoint>()
                .map_err(|e| Error::InvalidConfig(format!("daemon.endpoint: {e}")))?;
        }
        Ok(())
    }

    /// Render the effective configuration as YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(Error::from)
    }
}
