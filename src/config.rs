use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::models::GeoPoint;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub data_dir: String,
    pub session_secret: String,
    pub session_ttl_hours: i64,
    /// Applies to every scrape and geocode call
    pub upstream_timeout_secs: u64,
    pub geocoder_url: String,
    /// Where never-geocoded records are scattered on the map
    pub map_center: GeoPoint,
    /// Render listing pages in headless Chrome instead of a plain GET
    pub browser_scraping: bool,
}

impl AppConfig {
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialAppConfig {
    bind_addr: Option<String>,
    data_dir: Option<String>,
    session_secret: Option<String>,
    session_ttl_hours: Option<i64>,
    upstream_timeout_secs: Option<u64>,
    geocoder_url: Option<String>,
    map_center_lat: Option<f64>,
    map_center_lng: Option<f64>,
    browser_scraping: Option<bool>,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_geocoder_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

const DEFAULT_MAP_CENTER: GeoPoint = GeoPoint {
    lat: 32.0853,
    lng: 34.7818,
};

impl AppConfig {
    /// Defaults, overridden by the optional TOML file, overridden by the
    /// process environment (after `.env` is loaded).
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_sources(config_path, |key| std::env::var(key).ok())
    }

    pub fn from_sources(
        config_path: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        // 1. Load from file (optional)
        let file_config = match config_path {
            Some(path_str) if Path::new(path_str).exists() => {
                let contents = fs::read_to_string(path_str)
                    .with_context(|| format!("Failed to read config file at {path_str}"))?;
                toml::from_str(&contents)
                    .with_context(|| format!("Failed to parse TOML from config file at {path_str}"))?
            }
            _ => PartialAppConfig::default(),
        };

        // 2. Load from environment variables
        let env_config = PartialAppConfig {
            bind_addr: env("BIND_ADDR"),
            data_dir: env("DATA_DIR"),
            session_secret: env("SESSION_SECRET"),
            session_ttl_hours: parse_env(&env, "SESSION_TTL_HOURS")?,
            upstream_timeout_secs: parse_env(&env, "UPSTREAM_TIMEOUT_SECS")?,
            geocoder_url: env("GEOCODER_URL"),
            map_center_lat: parse_env(&env, "MAP_CENTER_LAT")?,
            map_center_lng: parse_env(&env, "MAP_CENTER_LNG")?,
            browser_scraping: parse_env(&env, "BROWSER_SCRAPING")?,
        };

        // 3. Merge: environment overrides file
        Ok(AppConfig {
            bind_addr: env_config
                .bind_addr
                .or(file_config.bind_addr)
                .unwrap_or_else(default_bind_addr),
            data_dir: env_config
                .data_dir
                .or(file_config.data_dir)
                .unwrap_or_else(default_data_dir),
            session_secret: env_config
                .session_secret
                .or(file_config.session_secret)
                .filter(|s| !s.is_empty())
                .context("SESSION_SECRET is required")?,
            session_ttl_hours: env_config
                .session_ttl_hours
                .or(file_config.session_ttl_hours)
                .unwrap_or(24 * 30),
            upstream_timeout_secs: env_config
                .upstream_timeout_secs
                .or(file_config.upstream_timeout_secs)
                .unwrap_or(30),
            geocoder_url: env_config
                .geocoder_url
                .or(file_config.geocoder_url)
                .unwrap_or_else(default_geocoder_url),
            map_center: GeoPoint {
                lat: env_config
                    .map_center_lat
                    .or(file_config.map_center_lat)
                    .unwrap_or(DEFAULT_MAP_CENTER.lat),
                lng: env_config
                    .map_center_lng
                    .or(file_config.map_center_lng)
                    .unwrap_or(DEFAULT_MAP_CENTER.lng),
            },
            browser_scraping: env_config
                .browser_scraping
                .or(file_config.browser_scraping)
                .unwrap_or(false),
        })
    }
}

fn parse_env<T>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("Invalid value for {key}: {e}")),
        None => Ok(None),
    }
}
