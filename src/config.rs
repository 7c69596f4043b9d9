use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

fn default_max_file_size() -> usize {
    // 10 MB in bytes
    10 * 1024 * 1024
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub max_file_size: usize,
    pub password_salt: String,
    pub token_ttl_hours: u64,
    pub chat_history_limit: usize,
    /// SQLite file backing the store; the in-memory store is used when unset.
    pub database_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            max_file_size: default_max_file_size(),
            password_salt: "cortexcloud-salt".to_string(),
            token_ttl_hours: 24 * 7,
            chat_history_limit: 50,
            database_path: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file first
        dotenv().ok();

        let defaults = Config::default();
        Ok(Config {
            host: env_or("HOST", defaults.host)?,
            port: env_or("PORT", defaults.port)?,
            max_file_size: env_or("MAX_FILE_SIZE", defaults.max_file_size)?,
            password_salt: std::env::var("PASSWORD_SALT").unwrap_or(defaults.password_salt),
            token_ttl_hours: env_or("TOKEN_TTL_HOURS", defaults.token_ttl_hours)?,
            chat_history_limit: env_or("CHAT_HISTORY_LIMIT", defaults.chat_history_limit)?,
            database_path: std::env::var("DATABASE_PATH").ok().filter(|p| !p.is_empty()),
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Failed to parse {}={}", key, raw)),
        Err(_) => Ok(default),
    }
}

pub fn load_config() -> Result<Config> {
    let config = Config::from_env()?;
    tracing::info!(
        "Loaded config: addr={}, max_file_size={}KB, storage={}",
        config.socket_addr(),
        config.max_file_size / 1024,
        config.database_path.as_deref().unwrap_or("memory")
    );
    Ok(config)
}
