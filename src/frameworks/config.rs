// Platform-keyed JSON config loading, matching the on-disk format of the
// original deployment: `{"platform": "<name>", "<name>": {...}}`. Falls back
// to hard-coded defaults on any read or parse failure.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
struct PlatformSection {
    #[serde(rename = "apiRoot")]
    api_root: String,
    #[serde(rename = "apiSecret")]
    api_secret: String,
    #[serde(rename = "socketHost")]
    socket_host: String,
    #[serde(rename = "httpHost")]
    http_host: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    platform: String,
    #[serde(flatten)]
    platforms: std::collections::HashMap<String, PlatformSection>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_root: String,
    pub api_secret: String,
    pub socket_addr: SocketAddr,
    pub http_addr: SocketAddr,
}

impl Config {
    /// Hard-coded defaults matching the original deployment's platform file.
    pub fn defaults() -> Self {
        Self {
            api_root: "http://192.168.55.101:30083/api/1.1.0".to_string(),
            api_secret: "kqlzV1bJLHJ6asF7qPNmcfsjBgPYRt7Tki".to_string(),
            socket_addr: parse_host(":31401").unwrap_or_else(|| ([0, 0, 0, 0], 31401).into()),
            http_addr: parse_host(":31402").unwrap_or_else(|| ([0, 0, 0, 0], 31402).into()),
        }
    }

    /// Loads from `path`, falling back to defaults on any failure, then
    /// applies environment-variable overrides.
    pub fn load(path: &str) -> Self {
        let mut config = Self::load_from_file(path).unwrap_or_else(|err| {
            tracing::warn!(%path, error = %err, "failed to load config file, using defaults");
            Self::defaults()
        });

        if let Ok(socket_host) = env::var("SOCKET_HOST") {
            match parse_host(&socket_host) {
                Some(addr) => config.socket_addr = addr,
                None => tracing::warn!(socket_host = %socket_host, "invalid SOCKET_HOST override, ignoring"),
            }
        }
        if let Ok(http_host) = env::var("HTTP_HOST") {
            match parse_host(&http_host) {
                Some(addr) => config.http_addr = addr,
                None => tracing::warn!(http_host = %http_host, "invalid HTTP_HOST override, ignoring"),
            }
        }

        config
    }

    fn load_from_file(path: &str) -> Result<Self, crate::domain::RelayError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|err| crate::domain::RelayError::Config(format!("reading {path}: {err}")))?;
        let file: ConfigFile = serde_json::from_str(&contents)
            .map_err(|err| crate::domain::RelayError::Config(format!("parsing {path}: {err}")))?;
        let section = file
            .platforms
            .get(&file.platform)
            .ok_or_else(|| crate::domain::RelayError::Config(format!("platform `{}` not found", file.platform)))?;
        let socket_addr = parse_host(&section.socket_host)
            .ok_or_else(|| crate::domain::RelayError::Config(format!("invalid socketHost `{}`", section.socket_host)))?;
        let http_addr = parse_host(&section.http_host)
            .ok_or_else(|| crate::domain::RelayError::Config(format!("invalid httpHost `{}`", section.http_host)))?;

        Ok(Self {
            api_root: section.api_root.clone(),
            api_secret: section.api_secret.clone(),
            socket_addr,
            http_addr,
        })
    }
}

/// Parses a `"host:port"` or `":port"` string into a bind address, defaulting
/// an empty host to all interfaces like the original Go `:port` shorthand.
fn parse_host(value: &str) -> Option<SocketAddr> {
    let normalized = if let Some(port) = value.strip_prefix(':') {
        format!("0.0.0.0:{port}")
    } else {
        value.to_string()
    };
    normalized.parse().ok()
}

pub fn config_path() -> String {
    env::var("RELAY_CONFIG_PATH").unwrap_or_else(|_| "config.json".to_string())
}

pub fn back_office_timeout() -> Duration {
    let millis = env::var("BACK_OFFICE_TIMEOUT_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(5000);
    Duration::from_millis(millis)
}
