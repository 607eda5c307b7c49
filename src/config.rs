//! Application configuration loaded from environment variables.
//!
//! Loaded once at startup. A `.env` file is honored for local development.

use std::env;
use std::net::IpAddr;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,

    // --- AI commentary provider (optional) ---
    pub ai_api_url: Option<String>,
    pub ai_api_key: Option<String>,
    /// Replaces the built-in fallback insights when set
    pub fallback_insights_path: Option<String>,

    // --- Tuning ---
    pub summary_cache_ttl_secs: u64,
    pub rate_limit_max_requests: u32,
    pub rate_limit_window_secs: u64,
    pub report_ttl_days: i64,
    /// Calculations included in a report when the request doesn't say
    pub report_recent_limit: u32,
    /// Reverse proxies whose `X-Forwarded-For` / `X-Real-IP` are believed
    pub trusted_proxies: Vec<IpAddr>,

    // --- Secrets ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let jwt_signing_key = optional("JWT_SIGNING_KEY")
            .ok_or(ConfigError::Missing("JWT_SIGNING_KEY"))?
            .into_bytes();

        Ok(Self {
            frontend_url: optional("FRONTEND_URL")
                .unwrap_or_else(|| "http://localhost:5173".to_string()),
            gcp_project_id: optional("GCP_PROJECT_ID").unwrap_or_else(|| "local-dev".to_string()),
            port: parse_or(&lookup, "PORT", 8080)?,
            ai_api_url: optional("AI_API_URL"),
            ai_api_key: optional("AI_API_KEY"),
            fallback_insights_path: optional("FALLBACK_INSIGHTS_PATH"),
            summary_cache_ttl_secs: parse_in(&lookup, "SUMMARY_CACHE_TTL_SECS", 30, 0..=86_400)?,
            rate_limit_max_requests: parse_in(
                &lookup,
                "RATE_LIMIT_MAX_REQUESTS",
                120,
                1..=u32::MAX,
            )?,
            rate_limit_window_secs: parse_in(&lookup, "RATE_LIMIT_WINDOW_SECS", 60, 1..=86_400)?,
            report_ttl_days: parse_in(&lookup, "REPORT_TTL_DAYS", 90, 1..=MAX_REPORT_TTL_DAYS)?,
            report_recent_limit: parse_in(&lookup, "REPORT_RECENT_LIMIT", 10, 1..=100)?,
            trusted_proxies: parse_ip_list(&lookup, "TRUSTED_PROXIES")?,
            jwt_signing_key,
        })
    }

    /// Config for tests: no AI provider, generous rate limit.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            ai_api_url: None,
            ai_api_key: None,
            fallback_insights_path: None,
            summary_cache_ttl_secs: 30,
            rate_limit_max_requests: 1000,
            rate_limit_window_secs: 60,
            report_ttl_days: 90,
            report_recent_limit: 10,
            trusted_proxies: Vec::new(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
        }
    }

    pub fn summary_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.summary_cache_ttl_secs)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn report_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.report_ttl_days)
    }
}

/// Ten years.
const MAX_REPORT_TTL_DAYS: i64 = 3650;

fn parse_or<T, F>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name).map(|v| v.trim().to_string()) {
        Some(raw) if !raw.is_empty() => raw
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        _ => Ok(default),
    }
}

/// Like `parse_or`, rejecting values outside `range`.
fn parse_in<T, F>(
    lookup: &F,
    name: &'static str,
    default: T,
    range: RangeInclusive<T>,
) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + ToString,
    F: Fn(&str) -> Option<String>,
{
    let value = parse_or(lookup, name, default)?;
    if !range.contains(&value) {
        return Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
        });
    }
    Ok(value)
}

/// Comma-separated IP addresses. Unset or blank means none.
fn parse_ip_list<F>(lookup: &F, name: &'static str) -> Result<Vec<IpAddr>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return Ok(Vec::new());
    };

    raw.split(',')
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(|ip| {
            ip.parse().map_err(|_| ConfigError::Invalid {
                name,
                value: ip.to_string(),
            })
        })
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: '{value}'")]
    Invalid { name: &'static str, value: String },
}
