use clap::{Parser, ValueEnum};
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::time::Duration;

pub const LISTEN_ADDR_ENV: &str = "SNIP_LISTEN_ADDR";
pub const PUBLIC_BASE_URL_ENV: &str = "SNIP_PUBLIC_BASE_URL";
pub const ENV_ENV: &str = "SNIP_ENV";
pub const LOG_ENV: &str = "SNIP_LOG";
pub const STORAGE_BACKEND_ENV: &str = "SNIP_STORAGE_BACKEND";
pub const SQLITE_URL_ENV: &str = "SNIP_SQLITE_URL";
pub const MYSQL_DSN_ENV: &str = "SNIP_MYSQL_DSN";
pub const MAX_DB_CONNECTIONS_ENV: &str = "SNIP_MAX_DB_CONNECTIONS";
pub const MAX_ATTEMPTS_ENV: &str = "SNIP_MAX_ATTEMPTS";
pub const REQUEST_TIMEOUT_ENV: &str = "SNIP_REQUEST_TIMEOUT_MS";
pub const SHUTDOWN_TIMEOUT_ENV: &str = "SNIP_SHUTDOWN_TIMEOUT_MS";

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_ENV: &str = "PROD";
pub const DEFAULT_LOG: &str = "info";
pub const DEFAULT_MAX_DB_CONNECTIONS: u32 = 20;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "sqlite")]
    Sqlite,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Sqlite => write!(f, "sqlite"),
            StorageBackendArg::Mysql => write!(f, "mysql"),
        }
    }
}

/// Deployment environment. Selects the log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Prod,
}

impl Environment {
    /// Parses `DEV`/`PROD` case-insensitively. Unknown values fall back to
    /// `Prod` and are returned so the caller can warn once logging is up.
    pub fn resolve(raw: &str) -> (Self, Option<String>) {
        match raw.to_ascii_uppercase().as_str() {
            "DEV" => (Environment::Dev, None),
            "PROD" => (Environment::Prod, None),
            _ => (Environment::Prod, Some(raw.to_string())),
        }
    }
}

impl Display for Environment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Dev => write!(f, "DEV"),
            Environment::Prod => write!(f, "PROD"),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "snip-gateway")]
pub struct CLI {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    #[arg(long, env = PUBLIC_BASE_URL_ENV, default_value = DEFAULT_PUBLIC_BASE_URL)]
    pub public_base_url: String,

    #[arg(long, env = ENV_ENV, default_value = DEFAULT_ENV)]
    pub env: String,

    #[arg(long, env = LOG_ENV, default_value = DEFAULT_LOG)]
    pub log: String,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::Sqlite
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = SQLITE_URL_ENV, default_value = snip_storage::DEFAULT_SQLITE_URL)]
    pub sqlite_url: String,

    #[arg(long, env = MYSQL_DSN_ENV, required_if_eq("storage", "mysql"))]
    pub mysql_dsn: Option<String>,

    #[arg(
        long,
        env = MAX_DB_CONNECTIONS_ENV,
        default_value_t = DEFAULT_MAX_DB_CONNECTIONS,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_db_connections: u32,

    #[arg(
        long,
        env = MAX_ATTEMPTS_ENV,
        default_value_t = snip_allocator::DEFAULT_MAX_ATTEMPTS,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_attempts: u32,

    #[arg(
        long,
        env = REQUEST_TIMEOUT_ENV,
        default_value_t = DEFAULT_REQUEST_TIMEOUT_MS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub request_timeout_ms: u64,

    #[arg(long, env = SHUTDOWN_TIMEOUT_ENV, default_value_t = DEFAULT_SHUTDOWN_TIMEOUT_MS)]
    pub shutdown_timeout_ms: u64,
}

impl CLI {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}
