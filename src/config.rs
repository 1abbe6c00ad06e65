use std::{env, path::PathBuf};
use thiserror::Error;

use crate::session::DEFAULT_SESSION_TTL_SECS;

const LOCAL_JWT_SECRET: &str = "super-secure-test-secret-value-local";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_BRAND: &str = "Academy Portal";

/// AppConfig
///
/// Holds the application's entire configuration state. Immutable once loaded and pulled
/// into handlers through `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls the local login bypass.
    pub env: Env,
    // Postgres connection string. Absent locally means the in-memory repository.
    pub database_url: Option<String>,
    // Secret used to validate tokens issued by the external auth provider.
    pub jwt_secret: String,
    // File backing the durable identity store. Absent means sessions live in memory.
    pub session_store_path: Option<PathBuf>,
    // Seconds a login stays valid, unless the login token expires sooner.
    pub session_ttl_secs: i64,
    pub bind_addr: String,
    // Shown in the shell header and footer.
    pub brand: String,
}

/// Env
///
/// Runtime context: local development conveniences versus hardened production.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Env {
    Local,
    Production,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    MissingInProduction(&'static str),
    #[error("{0} must be a positive number of seconds")]
    InvalidSeconds(&'static str),
}

impl Default for AppConfig {
    /// Safe values for test state scaffolding; never reads the environment.
    fn default() -> Self {
        Self {
            env: Env::Local,
            database_url: None,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            session_store_path: None,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            brand: DEFAULT_BRAND.to_string(),
        }
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables. Production refuses to start
    /// without its database and token secret; local development falls back to defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match var("APP_ENV").as_deref() {
            Some("production") => Env::Production,
            _ => Env::Local,
        };

        let (database_url, jwt_secret) = match env {
            Env::Production => (
                Some(var("DATABASE_URL").ok_or(ConfigError::MissingInProduction("DATABASE_URL"))?),
                var("SUPABASE_JWT_SECRET")
                    .ok_or(ConfigError::MissingInProduction("SUPABASE_JWT_SECRET"))?,
            ),
            Env::Local => (
                var("DATABASE_URL"),
                var("SUPABASE_JWT_SECRET").unwrap_or_else(|| LOCAL_JWT_SECRET.to_string()),
            ),
        };

        let session_ttl_secs = match var("SESSION_TTL_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidSeconds("SESSION_TTL_SECS"))?,
            None => DEFAULT_SESSION_TTL_SECS,
        };

        Ok(Self {
            env,
            database_url,
            jwt_secret,
            session_store_path: var("SESSION_STORE_PATH").map(PathBuf::from),
            session_ttl_secs,
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            brand: var("APP_BRAND").unwrap_or_else(|| DEFAULT_BRAND.to_string()),
        })
    }
}
