//! Configuration management for Stacks Server

use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

/// Default upload body limit (100MB)
const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Default lifetime of a staged upload awaiting finalize
const DEFAULT_STAGING_TTL_SECS: u64 = 60 * 60;

/// Default ceiling on bytes held by all staged uploads together (1GB)
const DEFAULT_MAX_STAGED_BYTES: usize = 1024 * 1024 * 1024;

/// Default time limit for a single metadata extraction
const DEFAULT_EXTRACT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub library: LibraryConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Where finalized documents and covers are written
#[derive(Debug, Clone, Deserialize)]
pub struct LibraryConfig {
    pub root: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub max_upload_bytes: usize,
    pub staging_ttl_secs: u64,
    pub max_staged_bytes: usize,
    pub extract_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: "sqlite:./stacks.db".to_string(),
            },
            library: LibraryConfig {
                root: PathBuf::from("./library"),
            },
            upload: UploadConfig {
                max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
                staging_ttl_secs: DEFAULT_STAGING_TTL_SECS,
                max_staged_bytes: DEFAULT_MAX_STAGED_BYTES,
                extract_timeout_secs: DEFAULT_EXTRACT_TIMEOUT_SECS,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_var("SERVER_PORT", 3000)?,
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:./stacks.db".to_string()),
            },
            library: LibraryConfig {
                root: env::var("LIBRARY_ROOT")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("./library")),
            },
            upload: UploadConfig {
                max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
                staging_ttl_secs: parse_var("STAGING_TTL_SECS", DEFAULT_STAGING_TTL_SECS)?,
                max_staged_bytes: parse_var("MAX_STAGED_BYTES", DEFAULT_MAX_STAGED_BYTES)?,
                extract_timeout_secs: parse_var(
                    "EXTRACT_TIMEOUT_SECS",
                    DEFAULT_EXTRACT_TIMEOUT_SECS,
                )?,
            },
        })
    }
}

/// Read a numeric variable, falling back to `default` only when it is unset
fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        Err(_) => Ok(default),
    }
}
