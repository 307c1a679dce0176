use std::env;
use std::net::SocketAddr;

use thiserror::Error;

pub const ENV_BIND_ADDR: &str = "RELAY_BIND_ADDR";
pub const ENV_RPC_PATH: &str = "RELAY_RPC_PATH";
pub const ENV_CORS: &str = "RELAY_CORS";
pub const ENV_MAX_BODY_SIZE: &str = "RELAY_MAX_BODY_SIZE";

/// Configuration for the HTTP JSON-RPC server
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_address: SocketAddr,
    /// Path of the JSON-RPC endpoint
    pub rpc_path: String,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum request body size in bytes
    pub max_body_size: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("RELAY_BIND_ADDR must be a socket address, got '{0}'")]
    InvalidBindAddress(String),
    #[error("RELAY_RPC_PATH must start with '/', got '{0}'")]
    InvalidRpcPath(String),
    #[error("RELAY_CORS must be a boolean, got '{0}'")]
    InvalidCors(String),
    #[error("RELAY_MAX_BODY_SIZE must be a positive integer, got '{0}'")]
    InvalidMaxBodySize(String),
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 3000)),
            rpc_path: "/rpc".to_string(),
            enable_cors: true,
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `RELAY_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|key| env::var(key).ok())
    }

    /// Same as [`ServerConfig::from_env`] with an explicit variable source
    pub fn from_env_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let bind_address = var(ENV_BIND_ADDR)
            .map(|value| {
                value
                    .parse::<SocketAddr>()
                    .map_err(|_| ConfigError::InvalidBindAddress(value))
            })
            .transpose()?
            .unwrap_or(defaults.bind_address);

        let rpc_path = var(ENV_RPC_PATH)
            .map(|value| {
                if value.starts_with('/') {
                    Ok(value)
                } else {
                    Err(ConfigError::InvalidRpcPath(value))
                }
            })
            .transpose()?
            .unwrap_or(defaults.rpc_path);

        let enable_cors = var(ENV_CORS)
            .map(|value| parse_bool(&value).ok_or(ConfigError::InvalidCors(value)))
            .transpose()?
            .unwrap_or(defaults.enable_cors);

        let max_body_size = var(ENV_MAX_BODY_SIZE)
            .map(|value| match value.parse::<usize>() {
                Ok(size) if size > 0 => Ok(size),
                _ => Err(ConfigError::InvalidMaxBodySize(value)),
            })
            .transpose()?
            .unwrap_or(defaults.max_body_size);

        Ok(Self {
            bind_address,
            rpc_path,
            enable_cors,
            max_body_size,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
