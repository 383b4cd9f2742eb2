use std::time::Duration;

use reqwest::Url;

use crate::errors::ConfigError;

pub const DEFAULT_BASE_URL: &str = "https://job-matching-api.onrender.com";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Client configuration loaded from environment variables.
/// Every variable is optional; defaults point at the hosted matching service.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: Url,
    pub request_timeout: Duration,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let base_url = std::env::var("MATCHING_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        Ok(Config {
            base_url: parse_base_url(&base_url)?,
            request_timeout: match std::env::var("REQUEST_TIMEOUT_SECS") {
                Ok(raw) => parse_timeout("REQUEST_TIMEOUT_SECS", &raw)?,
                Err(_) => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            },
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

/// Accepts `http`/`https` URLs only; a trailing slash is normalized away
/// when endpoint paths are joined.
pub fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidBaseUrl {
        value: raw.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidBaseUrl {
            value: raw.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    Ok(url)
}

fn parse_timeout(key: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidTimeout {
            key,
            value: raw.to_string(),
        }),
    }
}
