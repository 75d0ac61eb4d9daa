//! Configuration module for the admin sync client.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// A malformed configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub variable: &'static str,
    pub value: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid value {:?} for {}", self.value, self.variable)
    }
}

impl std::error::Error for ConfigError {}

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the admin REST API (without the `/api` suffix)
    pub api_url: String,
    /// Base URL of the realtime push server, if any
    pub realtime_url: Option<String>,
    /// File holding the admin bearer token
    pub token_path: PathBuf,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
    /// Default transport timeout for API calls
    pub request_timeout: Duration,
    /// Timeout for binary attachment previews
    pub preview_timeout: Duration,
    /// How long a notification stays visible
    pub notification_ttl: Duration,
    /// Default page size for list queries
    pub page_size: u32,
    /// Collection watched by the binary
    pub watch: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:5000".to_string(),
            realtime_url: None,
            token_path: PathBuf::from("./data/admin-token"),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            request_timeout: Duration::from_secs(30),
            preview_timeout: Duration::from_secs(20),
            notification_ttl: Duration::from_millis(4000),
            page_size: 25,
            watch: "jobs".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let api_url = env::var("SITE_ADMIN_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_url);

        let realtime_url = env::var("SITE_ADMIN_REALTIME_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .map(|url| url.trim_end_matches('/').to_string());

        let token_path = env::var("SITE_ADMIN_TOKEN_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.token_path);

        let log_level = env::var("SITE_ADMIN_LOG_LEVEL").unwrap_or(defaults.log_level);

        let log_format = match env::var("SITE_ADMIN_LOG_FORMAT") {
            Ok(value) => match value.to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" | "" => LogFormat::Pretty,
                _ => {
                    return Err(ConfigError {
                        variable: "SITE_ADMIN_LOG_FORMAT",
                        value,
                    })
                }
            },
            Err(_) => defaults.log_format,
        };

        let request_timeout = parse_var("SITE_ADMIN_REQUEST_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        let preview_timeout = parse_var("SITE_ADMIN_PREVIEW_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.preview_timeout);

        let notification_ttl = parse_var("SITE_ADMIN_NOTIFICATION_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.notification_ttl);

        let page_size = match parse_var("SITE_ADMIN_PAGE_SIZE")? {
            Some(0) => {
                return Err(ConfigError {
                    variable: "SITE_ADMIN_PAGE_SIZE",
                    value: "0".to_string(),
                })
            }
            Some(size) => u32::try_from(size).map_err(|_| ConfigError {
                variable: "SITE_ADMIN_PAGE_SIZE",
                value: size.to_string(),
            })?,
            None => defaults.page_size,
        };

        let watch = env::var("SITE_ADMIN_WATCH").unwrap_or(defaults.watch);

        Ok(Self {
            api_url,
            realtime_url,
            token_path,
            log_level,
            log_format,
            request_timeout,
            preview_timeout,
            notification_ttl,
            page_size,
            watch,
        })
    }
}

fn parse_var(variable: &'static str) -> Result<Option<u64>, ConfigError> {
    match env::var(variable) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError { variable, value }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: &[&str] = &[
        "SITE_ADMIN_API_URL",
        "SITE_ADMIN_REALTIME_URL",
        "SITE_ADMIN_TOKEN_PATH",
        "SITE_ADMIN_LOG_LEVEL",
        "SITE_ADMIN_LOG_FORMAT",
        "SITE_ADMIN_REQUEST_TIMEOUT_SECS",
        "SITE_ADMIN_PREVIEW_TIMEOUT_SECS",
        "SITE_ADMIN_NOTIFICATION_MS",
        "SITE_ADMIN_PAGE_SIZE",
        "SITE_ADMIN_WATCH",
    ];

    // Both cases touch the process environment, so they run in one test.
    #[test]
    fn test_env_config() {
        for var in VARS {
            env::remove_var(var);
        }

        let config = Config::from_env().unwrap();
        assert_eq!(config.api_url, "http://127.0.0.1:5000");
        assert!(config.realtime_url.is_none());
        assert_eq!(config.token_path, PathBuf::from("./data/admin-token"));
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.notification_ttl, Duration::from_millis(4000));
        assert_eq!(config.page_size, 25);
        assert_eq!(config.watch, "jobs");

        env::set_var("SITE_ADMIN_API_URL", "http://admin.local:8080/");
        env::set_var("SITE_ADMIN_PAGE_SIZE", "10");
        env::set_var("SITE_ADMIN_LOG_FORMAT", "json");
        let config = Config::from_env().unwrap();
        assert_eq!(config.api_url, "http://admin.local:8080");
        assert_eq!(config.page_size, 10);
        assert_eq!(config.log_format, LogFormat::Json);

        env::set_var("SITE_ADMIN_PAGE_SIZE", "ten");
        let err = Config::from_env().unwrap_err();
        assert_eq!(err.variable, "SITE_ADMIN_PAGE_SIZE");

        for var in VARS {
            env::remove_var(var);
        }
    }
}
