use std::{env, time::Duration};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Base URL of the REST backend that stores addresses and orders.
    pub api_base: String,
    /// Origin serving the storefront shell, fronted by the sync cache.
    pub asset_origin: String,
    pub jwt_secret: String,
    pub jwt_audience: Option<String>,
    pub currency: String,
    pub payment_key_id: Option<String>,
    pub backend_timeout: Duration,
    pub payment_timeout: Duration,
    pub session_idle: Duration,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret = env::var("JWT_SECRET")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let api_base = env::var("API_BASE").unwrap_or_else(|_| "http://localhost:4000".to_string());
        let asset_origin =
            env::var("ASSET_ORIGIN").unwrap_or_else(|_| "http://localhost:5173".to_string());
        let jwt_audience = env::var("JWT_AUDIENCE").ok().filter(|a| !a.is_empty());
        let currency = env::var("CURRENCY").unwrap_or_else(|_| "INR".to_string());
        let payment_key_id = env::var("PAYMENT_KEY_ID").ok().filter(|k| !k.is_empty());
        let backend_timeout = Duration::from_secs(secs_from_env("BACKEND_TIMEOUT_SECS", 15));
        let payment_timeout = Duration::from_secs(secs_from_env("PAYMENT_TIMEOUT_SECS", 900));
        let session_idle = Duration::from_secs(secs_from_env("SESSION_IDLE_SECS", 3600));

        Ok(Self {
            host,
            port,
            api_base,
            asset_origin,
            jwt_secret,
            jwt_audience,
            currency,
            payment_key_id,
            backend_timeout,
            payment_timeout,
            session_idle,
        })
    }
}

fn secs_from_env(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}
