//! Application configuration loaded from environment variables.

use std::env;

/// Which persistence backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    /// Process-local store; data is lost on restart.
    Memory,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Firebase project ID (expected token audience)
    pub firebase_project_id: String,
    /// GCP project holding the Firestore database
    pub gcp_project_id: String,
    pub store_backend: StoreBackend,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Days before period end at which the next billing is scheduled
    pub pre_billing_offset_days: i64,
}

impl Config {
    /// Deterministic config for tests.
    pub fn test_default() -> Self {
        Self {
            firebase_project_id: "betty-test".to_string(),
            gcp_project_id: "betty-test".to_string(),
            store_backend: StoreBackend::Memory,
            frontend_url: "http://localhost:5173".to_string(),
            port: 8000,
            pre_billing_offset_days: 0,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let firebase_project_id = env::var("FIREBASE_PROJECT_ID")
            .map(|v| v.trim().to_string())
            .map_err(|_| ConfigError::Missing("FIREBASE_PROJECT_ID"))?;

        let store_backend = match env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "firestore".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "firestore" => StoreBackend::Firestore,
            "memory" => StoreBackend::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    name: "STORE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        let pre_billing_offset_days = match env::var("PRE_BILLING_OFFSET_DAYS") {
            Ok(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|days| *days >= 0)
                .ok_or(ConfigError::Invalid {
                    name: "PRE_BILLING_OFFSET_DAYS",
                    value: raw,
                })?,
            Err(_) => 0,
        };

        Ok(Self {
            gcp_project_id: env::var("GCP_PROJECT_ID")
                .unwrap_or_else(|_| firebase_project_id.clone()),
            firebase_project_id,
            store_backend,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .unwrap_or(8000),
            pre_billing_offset_days,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}
