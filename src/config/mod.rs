//! Application configuration management

use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use url::Url;

use crate::db::DatabaseOptions;
use crate::pagination::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, PageLimits};

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" | "text" => Ok(Self::Pretty),
            other => bail!("Unknown log format '{other}' (expected 'json' or 'pretty')"),
        }
    }
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Public base URL used for pagination links. When unset, links are
    /// built from the request's `Host` header.
    pub public_url: Option<Url>,

    /// Address to listen on
    pub bind_address: IpAddr,

    /// Server port
    pub port: u16,

    /// SQLite URL or path of the catalog database
    pub database_url: String,

    pub database_max_connections: u32,

    /// Open the catalog read-only
    pub database_read_only: bool,

    /// Page size bounds for listings
    pub page_limits: PageLimits,

    /// Deadline for all store work of one request
    pub query_timeout: Duration,

    /// Allowed CORS origins. Empty allows any origin.
    pub cors_origins: Vec<String>,

    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // Prefer DATABASE_PATH, fall back to DATABASE_URL
        let database_url = var("DATABASE_PATH")
            .or_else(|| var("DATABASE_URL"))
            .unwrap_or_else(|| "./data/gutenberg.db".to_string());

        let public_url = var("PUBLIC_URL")
            .filter(|v| !v.trim().is_empty())
            .map(|v| Url::parse(v.trim()).with_context(|| format!("Invalid PUBLIC_URL '{v}'")))
            .transpose()?;

        let max_size: u32 = parse_or(&var, "MAX_PAGE_SIZE", MAX_PAGE_SIZE)?;
        let default_size: u32 = parse_or(&var, "DEFAULT_PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        if max_size == 0 || default_size == 0 {
            bail!("DEFAULT_PAGE_SIZE and MAX_PAGE_SIZE must be positive");
        }

        let query_timeout_secs: u64 = parse_or(&var, "QUERY_TIMEOUT_SECS", 30)?;
        if query_timeout_secs == 0 {
            bail!("QUERY_TIMEOUT_SECS must be positive");
        }

        Ok(Self {
            public_url,

            bind_address: parse_or(&var, "BIND_ADDRESS", IpAddr::V4(Ipv4Addr::UNSPECIFIED))?,

            port: parse_or(&var, "PORT", 8000)?,

            database_url,

            database_max_connections: parse_or(&var, "DATABASE_MAX_CONNECTIONS", 10)?,

            database_read_only: var("DATABASE_READ_ONLY")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),

            page_limits: PageLimits {
                default_size: default_size.min(max_size),
                max_size,
            },

            query_timeout: Duration::from_secs(query_timeout_secs),

            cors_origins: var("CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|o| !o.is_empty() && *o != "*")
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),

            log_format: var("LOG_FORMAT")
                .map(|v| v.parse::<LogFormat>())
                .transpose()?
                .unwrap_or_default(),
        })
    }

    /// Connection settings for the catalog database
    pub fn database_options(&self) -> DatabaseOptions {
        DatabaseOptions {
            url: self.database_url.clone(),
            max_connections: self.database_max_connections,
            read_only: self.database_read_only,
            ..Default::default()
        }
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("Invalid {key} '{value}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.database_url, "./data/gutenberg.db");
        assert!(config.database_read_only);
        assert_eq!(config.page_limits, PageLimits::default());
        assert_eq!(config.query_timeout, Duration::from_secs(30));
        assert!(config.public_url.is_none());
        assert!(config.cors_origins.is_empty());
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_database_path_preferred() {
        let config = config(&[
            ("DATABASE_URL", "sqlite:other.db"),
            ("DATABASE_PATH", "/srv/catalog.db"),
        ])
        .unwrap();
        assert_eq!(config.database_url, "/srv/catalog.db");
        assert_eq!(config.database_options().url, "/srv/catalog.db");
    }

    #[test]
    fn test_page_limits() {
        let limits = config(&[("DEFAULT_PAGE_SIZE", "50"), ("MAX_PAGE_SIZE", "40")])
            .unwrap()
            .page_limits;
        assert_eq!(limits.max_size, 40);
        assert_eq!(limits.default_size, 40);

        assert!(config(&[("MAX_PAGE_SIZE", "0")]).is_err());
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(config(&[("PORT", "eighty")]).is_err());
        assert!(config(&[("PUBLIC_URL", "not a url")]).is_err());
        assert!(config(&[("LOG_FORMAT", "xml")]).is_err());
        assert!(config(&[("QUERY_TIMEOUT_SECS", "0")]).is_err());
    }

    #[test]
    fn test_public_url_and_cors() {
        let config = config(&[
            ("PUBLIC_URL", "https://catalog.example.org"),
            ("CORS_ORIGINS", "https://a.example, https://b.example ,"),
            ("LOG_FORMAT", "pretty"),
        ])
        .unwrap();
        assert_eq!(
            config.public_url.unwrap().as_str(),
            "https://catalog.example.org/"
        );
        assert_eq!(
            config.cors_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert_eq!(config.log_format, LogFormat::Pretty);
    }
}
