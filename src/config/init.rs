// ABOUTME: Config scaffolding for new deployments.
// ABOUTME: Creates nocli.yml template files.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::CONFIG_FILENAME;

const TEMPLATE: &str = r#"# nocli configuration. Every key is optional.
listen: "0.0.0.0:8080"

daemon:
  # unix:///var/run/docker.sock, /run/podman/podman.sock or tcp://host:2375.
  # Unset: DOCKER_HOST, then local Podman and Docker sockets.
  # endpoint: unix:///var/run/docker.sock
  connect_timeout: 2m

request_timeout: 30s
stop_timeout: 10s

streams:
  buffer_limit: 256
  # block | drop-oldest
  overflow: block
  shutdown_grace: 5s

health:
  timeout: 3s
  # interval: 30s
"#;

/// Write a template config into `dir`. Returns the written path.
pub fn init_config(dir: &Path, force: bool) -> Result<PathBuf> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    std::fs::write(&config_path, TEMPLATE)?;

    Ok(config_path)
}
