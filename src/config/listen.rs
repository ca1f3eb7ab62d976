// ABOUTME: Listen address parsing for the HTTP server.
// ABOUTME: Accepts `ip:port`, `:port` or a bare port number.

use serde::{Deserialize, Deserializer, Serializer};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

pub const DEFAULT_PORT: u16 = 8080;

pub fn default_listen() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT)
}

/// Parse a listen address. A missing host binds all interfaces.
pub fn parse_listen(s: &str) -> Result<SocketAddr, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("listen address cannot be empty".to_string());
    }

    let port_only = s.strip_prefix(':').unwrap_or(s);
    if port_only.chars().all(|c| c.is_ascii_digit()) {
        let port = parse_port(port_only)?;
        return Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port));
    }

    s.parse::<SocketAddr>()
        .map_err(|_| format!("invalid listen address: {s} (expected ip:port or :port)"))
}

/// Parse a TCP port, rejecting 0.
pub fn parse_port(s: &str) -> Result<u16, String> {
    match s.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(format!("invalid port: {s}")),
        Ok(port) => Ok(port),
    }
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<SocketAddr, D::Error>
where
    D: Deserializer<'de>,
{
    // YAML turns a bare `8080` into an integer
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Port(u16),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Port(port) => parse_listen(&port.to_string()),
        Raw::Text(s) => parse_listen(&s),
    }
    .map_err(serde::de::Error::custom)
}

pub fn serialize<S>(addr: &SocketAddr, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(addr)
}
