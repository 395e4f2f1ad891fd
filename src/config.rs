use std::env;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub notify_worker_count: usize,
    pub notify_visibility_timeout_secs: u64,
    pub notify_max_attempts: u32,
    pub reaper_interval_secs: u64,
    pub event_buffer_size: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            notify_worker_count: parse_or_default("NOTIFY_WORKER_COUNT", 2)?,
            notify_visibility_timeout_secs: parse_or_default("NOTIFY_VISIBILITY_TIMEOUT_SECS", 30)?,
            notify_max_attempts: parse_or_default("NOTIFY_MAX_ATTEMPTS", 3)?,
            reaper_interval_secs: parse_or_default("REAPER_INTERVAL_SECS", 5)?,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            log_level: "info".to_string(),
            notify_worker_count: 2,
            notify_visibility_timeout_secs: 30,
            notify_max_attempts: 3,
            reaper_interval_secs: 5,
            event_buffer_size: 1024,
        }
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
