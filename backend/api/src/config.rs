//! Application configuration loaded from environment variables.

use gradeup_protocol::payments::DEFAULT_PLATFORM_FEE_BPS;

use crate::errors::{ApiError, Result};

/// Which [`crate::store::Store`] implementation backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file
    pub database_url: String,
    pub store_backend: StoreBackend,
    /// Port for the REST API server
    pub api_port: u16,
    /// Bearer token required on `/api/*` routes; unset disables the check
    pub api_token: Option<String>,
    /// Payment gateway base URL (e.g. https://api.stripe.com)
    pub payment_api_url: String,
    pub payment_api_key: String,
    /// Shared secret for webhook signatures
    pub webhook_secret: String,
    /// Accepted clock skew for webhook timestamps
    pub webhook_tolerance_secs: i64,
    pub platform_fee_bps: u32,
    /// Timeout for outbound gateway calls
    pub gateway_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            database_url: env_var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./gradeup.db".to_string()),
            store_backend: match env_var("STORE_BACKEND")
                .unwrap_or_else(|_| "sqlite".to_string())
                .as_str()
            {
                "sqlite" => StoreBackend::Sqlite,
                "memory" => StoreBackend::Memory,
                other => {
                    return Err(ApiError::Config(format!("Invalid STORE_BACKEND: {other}")))
                }
            },
            api_port: env_var("API_PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .map_err(|_| ApiError::Config("Invalid API_PORT".to_string()))?,
            api_token: env_var("API_TOKEN").ok().filter(|t| !t.is_empty()),
            payment_api_url: env_var("PAYMENT_API_URL")
                .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
            payment_api_key: env_var("PAYMENT_API_KEY").map_err(|_| {
                ApiError::Config("PAYMENT_API_KEY environment variable is required".to_string())
            })?,
            webhook_secret: env_var("PAYMENT_WEBHOOK_SECRET").map_err(|_| {
                ApiError::Config(
                    "PAYMENT_WEBHOOK_SECRET environment variable is required".to_string(),
                )
            })?,
            webhook_tolerance_secs: env_var("WEBHOOK_TOLERANCE_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .map_err(|_| ApiError::Config("Invalid WEBHOOK_TOLERANCE_SECS".to_string()))?,
            platform_fee_bps: env_var("PLATFORM_FEE_BPS")
                .unwrap_or_else(|_| DEFAULT_PLATFORM_FEE_BPS.to_string())
                .parse()
                .ok()
                .filter(|bps| *bps <= 10_000)
                .ok_or_else(|| ApiError::Config("Invalid PLATFORM_FEE_BPS".to_string()))?,
            gateway_timeout_secs: env_var("GATEWAY_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| ApiError::Config("Invalid GATEWAY_TIMEOUT_SECS".to_string()))?,
        })
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| ApiError::Config(format!("Missing env var: {key}")))
}
