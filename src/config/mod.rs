use std::env::{self, VarError};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for environment variable {var}")]
    InvalidEnvVar { var: &'static str, value: String },
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    /// 未设置时使用内存存储
    pub database_url: Option<String>,
    pub default_search_radius_km: f64,
    pub max_search_radius_km: f64,
    pub default_distance_window_hours: u64,
    pub store_timeout_ms: u64,
    pub ingest_queue_capacity: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key))
    }

    /// 从任意键值来源读取配置，缺省项使用默认值
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let default_distance_window_hours = match lookup("DEFAULT_DISTANCE_WINDOW") {
            Ok(raw) => raw
                .trim()
                .trim_end_matches('h')
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidEnvVar {
                    var: "DEFAULT_DISTANCE_WINDOW",
                    value: raw.clone(),
                })?,
            Err(_) => 24,
        };

        let default_search_radius_km = parse_or(&lookup, "DEFAULT_SEARCH_RADIUS_KM", 5.0_f64)?;
        // 半个地球周长，超过它的半径没有意义
        let max_search_radius_km = parse_or(&lookup, "MAX_SEARCH_RADIUS_KM", 20037.5_f64)?;
        for (var, value) in [
            ("DEFAULT_SEARCH_RADIUS_KM", default_search_radius_km),
            ("MAX_SEARCH_RADIUS_KM", max_search_radius_km),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidEnvVar {
                    var,
                    value: value.to_string(),
                });
            }
        }

        Ok(Config {
            server_host: lookup("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            server_port: parse_or(&lookup, "SERVER_PORT", 3000)?,
            database_url: lookup("DATABASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            default_search_radius_km,
            max_search_radius_km,
            default_distance_window_hours,
            store_timeout_ms: parse_or(&lookup, "STORE_TIMEOUT_MS", 5000)?,
            ingest_queue_capacity: parse_or(&lookup, "INGEST_QUEUE_CAPACITY", 1024)?,
        })
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn default_distance_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.default_distance_window_hours as i64)
    }
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Result<String, VarError>,
    T: FromStr,
{
    match lookup(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidEnvVar { var, value: raw }),
        Err(_) => Ok(default),
    }
}
