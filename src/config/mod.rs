use crate::core::{AppError, Result};
use serde::Deserialize;
use std::env;

pub mod database;
pub mod server;

pub use database::DatabaseConfig;
pub use server::ServerConfig;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub stripe: StripeConfig,
    pub mailer: MailerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub log_level: String,
    /// Public base URL used when composing invoice links in emails.
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailerConfig {
    pub api_key: String,
    pub endpoint: String,
    pub from_address: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = Config {
            app: AppConfig {
                env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
                base_url: env::var("APP_BASE_URL")
                    .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            },
            database: DatabaseConfig::from_env()?,
            server: ServerConfig::from_env()?,
            stripe: StripeConfig {
                secret_key: env::var("STRIPE_SECRET_KEY")
                    .map_err(|_| AppError::Configuration("STRIPE_SECRET_KEY not set".to_string()))?,
                webhook_secret: env::var("STRIPE_WEBHOOK_SECRET").map_err(|_| {
                    AppError::Configuration("STRIPE_WEBHOOK_SECRET not set".to_string())
                })?,
                base_url: env::var("STRIPE_BASE_URL")
                    .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
            },
            mailer: MailerConfig {
                api_key: env::var("MAILER_API_KEY")
                    .map_err(|_| AppError::Configuration("MAILER_API_KEY not set".to_string()))?,
                endpoint: env::var("MAILER_ENDPOINT")
                    .map_err(|_| AppError::Configuration("MAILER_ENDPOINT not set".to_string()))?,
                from_address: env::var("MAILER_FROM_ADDRESS")
                    .unwrap_or_else(|_| "no-reply@billcycle.app".to_string()),
            },
        };

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.database.pool_size == 0 || self.database.max_connections == 0 {
            return Err(AppError::Configuration(
                "Database pool sizes must be greater than 0".to_string(),
            ));
        }

        if self.stripe.webhook_secret.trim().is_empty() {
            return Err(AppError::Configuration(
                "Stripe webhook secret must not be empty".to_string(),
            ));
        }

        if !self.mailer.from_address.contains('@') {
            return Err(AppError::Configuration(
                "Mailer from address must be an email address".to_string(),
            ));
        }

        Ok(())
    }
}
