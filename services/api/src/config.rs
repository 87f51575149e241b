//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Which concrete store adapter backs the scheduling engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

/// How request scopes are resolved: one fixed shared scope for the no-account
/// deployment, or one scope per authenticated user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeModeSetting {
    Shared,
    User,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub scope_mode: ScopeModeSetting,
    pub shared_scope: String,
    pub frontend_origin: String,
    pub log_level: Level,
    pub auth_session_ttl_days: i64,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        // --- Load Store Settings ---
        let store_backend_str =
            std::env::var("STORE_BACKEND").unwrap_or_else(|_| "postgres".to_string());
        let store_backend = match store_backend_str.to_lowercase().as_str() {
            "postgres" => StoreBackend::Postgres,
            "memory" => StoreBackend::Memory,
            other => {
                return Err(ConfigError::InvalidValue(
                    "STORE_BACKEND".to_string(),
                    format!("'{}' is not one of: postgres, memory", other),
                ))
            }
        };

        let database_url = std::env::var("DATABASE_URL").ok();
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingVar("DATABASE_URL".to_string()));
        }

        // --- Load Scope Settings ---
        let scope_mode_str = std::env::var("SCOPE_MODE").unwrap_or_else(|_| "shared".to_string());
        let scope_mode = match scope_mode_str.to_lowercase().as_str() {
            "shared" => ScopeModeSetting::Shared,
            "user" => ScopeModeSetting::User,
            other => {
                return Err(ConfigError::InvalidValue(
                    "SCOPE_MODE".to_string(),
                    format!("'{}' is not one of: shared, user", other),
                ))
            }
        };

        let shared_scope =
            std::env::var("SHARED_SCOPE").unwrap_or_else(|_| "study-reviews".to_string());

        let frontend_origin = std::env::var("FRONTEND_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        // --- Load Logging and Auth Settings ---
        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let auth_session_ttl_days = match std::env::var("AUTH_SESSION_TTL_DAYS") {
            Ok(raw) => raw.parse::<i64>().map_err(|_| {
                ConfigError::InvalidValue(
                    "AUTH_SESSION_TTL_DAYS".to_string(),
                    format!("'{}' is not a whole number of days", raw),
                )
            })?,
            Err(_) => 30,
        };

        Ok(Self {
            bind_address,
            store_backend,
            database_url,
            scope_mode,
            shared_scope,
            frontend_origin,
            log_level,
            auth_session_ttl_days,
        })
    }
}
