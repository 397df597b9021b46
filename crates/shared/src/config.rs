use std::collections::HashSet;
use std::net::IpAddr;
use std::path::PathBuf;

use thiserror::Error;

use crate::config_env::{env_value, ip_list_env, parsed_env, required_env};

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_SNAPSHOT_TTL_SECONDS: u64 = 300;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: String,
    pub database_url: String,
    pub database_max_connections: u32,
    pub migrations_dir: PathBuf,
    pub snapshot_ttl_seconds: u64,
    pub trusted_proxy_ips: HashSet<IpAddr>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    MissingVar(String),
    #[error("invalid integer in env var {0}")]
    ParseInt(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let snapshot_ttl_seconds =
            parsed_env("SNAPSHOT_TTL_SECONDS", DEFAULT_SNAPSHOT_TTL_SECONDS)?;
        if snapshot_ttl_seconds == 0 {
            return Err(ConfigError::InvalidConfiguration(
                "SNAPSHOT_TTL_SECONDS must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            bind_addr: env_value("API_BIND_ADDR")
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            database_url: required_env("DATABASE_URL")?,
            database_max_connections: parsed_env("DATABASE_MAX_CONNECTIONS", 10)?,
            migrations_dir: env_value("MIGRATIONS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| {
                    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../db/migrations")
                }),
            snapshot_ttl_seconds,
            trusted_proxy_ips: ip_list_env("TRUSTED_PROXY_IPS")?
                .into_iter()
                .collect(),
        })
    }
}

/// Loads a `.env` file from the working directory when one exists.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}
