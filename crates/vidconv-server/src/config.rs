//! Server configuration.

use std::net::{AddrParseError, IpAddr, SocketAddr};
use std::path::PathBuf;

use tracing::warn;

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Path or name of the ffmpeg binary.
    pub ffmpeg_path: PathBuf,
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 3001,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            enable_cors: true,
        }
    }
}

impl ServerConfig {
    /// Load from environment variables, falling back to defaults.
    ///
    /// Supported env vars:
    /// - `BIND_ADDRESS` (an IP literal, e.g. "127.0.0.1" or "::")
    /// - `PORT` (e.g. "8080")
    /// - `FFMPEG_PATH` (e.g. "/usr/local/bin/ffmpeg")
    /// - `ENABLE_CORS` ("false" or "0" to disable)
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(bind_address) = get("BIND_ADDRESS") {
            config.bind_address = bind_address.trim().to_string();
        }

        if let Some(port) = get("PORT") {
            match port.trim().parse::<u16>() {
                Ok(parsed) => config.port = parsed,
                Err(_) => warn!(port = %port, default = config.port, "ignoring invalid PORT"),
            }
        }

        if let Some(path) = get("FFMPEG_PATH") {
            config.ffmpeg_path = PathBuf::from(path);
        }

        if let Some(cors) = get("ENABLE_CORS") {
            config.enable_cors = !matches!(cors.trim().to_ascii_lowercase().as_str(), "false" | "0" | "no");
        }

        config
    }

    /// Listen address. IPv6 literals such as `::` are accepted without
    /// brackets.
    pub fn socket_address(&self) -> Result<SocketAddr, AddrParseError> {
        let ip: IpAddr = self.bind_address.trim().parse()?;
        Ok(SocketAddr::new(ip, self.port))
    }
}
