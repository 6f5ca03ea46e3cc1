use crate::core::{AppError, Result};
use serde::Deserialize;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::env;
use std::time::Duration;

// Idle connections are closed after ten minutes; every connection is
// recycled once it reaches the lifetime cap regardless of use.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);
const IDLE_TIMEOUT: Duration = Duration::from_secs(600);
const MAX_LIFETIME: Duration = Duration::from_secs(1800);

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    /// Connections the pool keeps warm
    pub pool_size: u32,
    /// Hard ceiling under load
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self> {
        let url = env::var("DATABASE_URL")
            .map_err(|_| AppError::Configuration("DATABASE_URL not set".to_string()))?;
        let pool_size = parsed_var("DATABASE_POOL_SIZE", 10)?;
        let max_connections = parsed_var("DATABASE_MAX_CONNECTIONS", 20)?;

        Ok(DatabaseConfig {
            url,
            pool_size,
            max_connections,
        })
    }

    /// Open a PostgreSQL pool sized from this config. Connections are
    /// validated before reuse so the pool survives database restarts.
    pub async fn create_pool(&self) -> Result<PgPool> {
        PgPoolOptions::new()
            .min_connections(self.pool_size)
            .max_connections(self.max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .idle_timeout(IDLE_TIMEOUT)
            .max_lifetime(MAX_LIFETIME)
            .test_before_acquire(true)
            .connect(&self.url)
            .await
            .map_err(AppError::Database)
    }
}

fn parsed_var(name: &str, default: u32) -> Result<u32> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AppError::Configuration(format!("Invalid {}", name))),
        Err(_) => Ok(default),
    }
}
