//! Service configuration.

use serde::Deserialize;
use std::path::Path;

use infograph_core::PriceTable;

/// Default Razorpay REST endpoint.
pub const DEFAULT_RAZORPAY_API_URL: &str = "https://api.razorpay.com/v1";

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// PostgreSQL connection string. Takes precedence over `data_dir`.
    pub database_url: Option<String>,

    /// `RocksDB` data directory (used with the `rocksdb-backend` feature).
    pub data_dir: Option<String>,

    /// HS256 secret shared with the identity provider.
    pub auth_jwt_secret: String,

    /// Expected JWT audience. Not checked when unset.
    pub auth_audience: Option<String>,

    /// Razorpay key id (public, handed to checkout).
    pub razorpay_key_id: Option<String>,

    /// Razorpay key secret (signs payment confirmations).
    pub razorpay_key_secret: Option<String>,

    /// Razorpay API base URL.
    pub razorpay_api_url: String,

    /// Timeout for each outbound provider call, in seconds.
    pub provider_timeout_seconds: u64,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Price table for credit packs.
    pub pricing: PriceTable,
}

/// Razorpay secrets file structure.
#[derive(Debug, Deserialize)]
struct RazorpaySecrets {
    key_id: String,
    key_secret: String,
    #[serde(default)]
    api_url: Option<String>,
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        let (razorpay_key_id, razorpay_key_secret, razorpay_api_url) = load_razorpay_secrets();

        if std::env::var("AUTH_JWT_SECRET").is_err() {
            tracing::warn!("AUTH_JWT_SECRET not set - authenticated endpoints will reject every token");
        }

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            database_url: std::env::var("DATABASE_URL").ok(),
            data_dir: std::env::var("DATA_DIR").ok(),
            auth_jwt_secret: std::env::var("AUTH_JWT_SECRET").unwrap_or_default(),
            auth_audience: std::env::var("AUTH_AUDIENCE").ok(),
            razorpay_key_id,
            razorpay_key_secret,
            razorpay_api_url: razorpay_api_url
                .unwrap_or_else(|| DEFAULT_RAZORPAY_API_URL.into()),
            provider_timeout_seconds: env_parse("PROVIDER_TIMEOUT_SECONDS").unwrap_or(10),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: env_parse("MAX_BODY_BYTES").unwrap_or(64 * 1024), // 64KB
            request_timeout_seconds: env_parse("REQUEST_TIMEOUT_SECONDS").unwrap_or(30),
            pricing: PriceTable::default(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

/// Load Razorpay secrets from file or environment.
fn load_razorpay_secrets() -> (Option<String>, Option<String>, Option<String>) {
    let secret_paths = [
        ".secrets/razorpay.json",
        "infograph/.secrets/razorpay.json",
        "../.secrets/razorpay.json",
    ];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<RazorpaySecrets>(path) {
            tracing::info!(path = %path, "Loaded Razorpay secrets from file");
            return (
                Some(secrets.key_id),
                Some(secrets.key_secret),
                secrets.api_url.or_else(|| std::env::var("RAZORPAY_API_URL").ok()),
            );
        }
    }

    tracing::debug!("Razorpay secrets file not found, using environment variables");
    (
        std::env::var("RAZORPAY_KEY_ID").ok(),
        std::env::var("RAZORPAY_KEY_SECRET").ok(),
        std::env::var("RAZORPAY_API_URL").ok(),
    )
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            database_url: None,
            data_dir: None,
            auth_jwt_secret: String::new(),
            auth_audience: None,
            razorpay_key_id: None,
            razorpay_key_secret: None,
            razorpay_api_url: DEFAULT_RAZORPAY_API_URL.into(),
            provider_timeout_seconds: 10,
            cors_origins: vec!["*".into()],
            max_body_bytes: 64 * 1024,
            request_timeout_seconds: 30,
            pricing: PriceTable::default(),
        }
    }
}
