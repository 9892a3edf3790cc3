// room-chat/crates/room-chat/src/config.rs

use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::room_db::DEFAULT_EMBEDDING_DIMENSION;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_host: String,
    pub api_port: u16,
    pub database_path: PathBuf,
    pub db_pool_size: u32,
    pub embedding_dimension: usize,
    pub request_timeout_seconds: u64,
    pub cors_allow_any: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_host: "127.0.0.1".to_string(),
            api_port: 8000,
            database_path: PathBuf::from("./data/rooms.db"),
            db_pool_size: 10,
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
            request_timeout_seconds: 30,
            cors_allow_any: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            warn!("Failed to load .env file: {}. Using system environment variables.", e);
        } else {
            info!("Loaded environment variables from .env file");
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup; unset keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let embedding_dimension: usize = parse_or(&lookup, "EMBEDDING_DIMENSION", defaults.embedding_dimension)?;
        if embedding_dimension == 0 {
            return Err(anyhow::anyhow!("EMBEDDING_DIMENSION must be greater than zero"));
        }

        Ok(Self {
            api_host: lookup("API_HOST").unwrap_or(defaults.api_host),
            api_port: parse_or(&lookup, "API_PORT", defaults.api_port)?,
            database_path: lookup("DATABASE_PATH").map(PathBuf::from).unwrap_or(defaults.database_path),
            db_pool_size: parse_or(&lookup, "DB_POOL_SIZE", defaults.db_pool_size)?,
            embedding_dimension,
            request_timeout_seconds: parse_or(&lookup, "REQUEST_TIMEOUT_SECONDS", defaults.request_timeout_seconds)?,
            cors_allow_any: parse_or(&lookup, "CORS_ALLOW_ANY", defaults.cors_allow_any)?,
        })
    }

    pub fn print_config(&self) {
        info!("Current Configuration:");
        info!("- API: {}:{}", self.api_host, self.api_port);
        info!("- Database: {}", self.database_path.display());
        info!("- DB Pool Size: {}", self.db_pool_size);
        info!("- Embedding Dimension: {}", self.embedding_dimension);
        info!("- Request Timeout: {}s", self.request_timeout_seconds);
        info!("- CORS Allow Any: {}", self.cors_allow_any);
    }

    pub fn api_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.api_host, self.api_port)
            .parse()
            .with_context(|| format!("Invalid API address {}:{}", self.api_host, self.api_port))
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}
