use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::AppError;

const DEFAULT_BACKEND_URL: &str = "http://localhost:8080";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug)]
pub struct TrackerConfig {
    pub backend_url: String,
    pub bind_addr: SocketAddr,
    pub request_timeout: Duration,
}

impl TrackerConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let backend_url = lookup("BACKEND_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());
        let backend_url = backend_url.trim_end_matches('/').to_string();
        if !backend_url.starts_with("http://") && !backend_url.starts_with("https://") {
            return Err(AppError::Config(format!(
                "BACKEND_URL must be an http(s) url, got {}",
                backend_url
            )));
        }

        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| AppError::Config(format!("BIND_ADDR is invalid: {}", e)))?;

        let timeout_secs = match lookup("REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|e| AppError::Config(format!("REQUEST_TIMEOUT_SECS is invalid: {}", e)))?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            backend_url,
            bind_addr,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}
