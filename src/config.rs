use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::AppError;

const LOOPBACK_API_URL: &str = "http://localhost:3000";
const EMULATOR_API_URL: &str = "http://10.0.2.2:3000";

#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub platform: String,
    pub storage_dir: PathBuf,
    pub database_url: String,
    pub listen_addr: SocketAddr,
}

impl Config {
    pub fn new_from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let platform = lookup("TODO_PLATFORM").unwrap_or_else(|| env::consts::OS.to_string());
        let api_base_url =
            lookup("TODO_API_URL").unwrap_or_else(|| default_api_url(&platform).to_string());
        let storage_dir = lookup("TODO_STORAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".todo-sync"));
        let database_url = lookup("DATABASE_URL")
            .unwrap_or_else(|| "sqlite://tasks.db?mode=rwc".to_string());
        let listen_addr = lookup("TODO_LISTEN_ADDR")
            .unwrap_or_else(|| "127.0.0.1:3000".to_string());
        let listen_addr = listen_addr.parse::<SocketAddr>().map_err(|e| {
            AppError::Config(format!("TODO_LISTEN_ADDR {:?} is invalid: {}", listen_addr, e))
        })?;

        Ok(Self {
            api_base_url,
            platform,
            storage_dir,
            database_url,
            listen_addr,
        })
    }
}

/// Android emulators reach the host through a fixed alias instead of loopback.
pub fn default_api_url(platform: &str) -> &'static str {
    if platform.eq_ignore_ascii_case("android") {
        EMULATOR_API_URL
    } else {
        LOOPBACK_API_URL
    }
}
