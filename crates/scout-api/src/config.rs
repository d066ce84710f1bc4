//! Server configuration read from the environment.
//!
//! Component settings (caches, timeouts, inference, scoring) are read by the
//! components' own `from_env` constructors. This struct holds what only the
//! binary needs.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use scout_core::defaults;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Use Elasticsearch as the primary lexical backend.
    pub es_enabled: bool,
    /// Projection artifact. Without one the raw model width is used unchanged.
    pub projection_path: Option<PathBuf>,
    pub rate_limit_enabled: bool,
    pub rate_limit_requests: u64,
    pub rate_limit_period: Duration,
    pub allowed_origins: Vec<String>,
    pub cache_reclaim_interval: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/scout".to_string(),
            host: "0.0.0.0".to_string(),
            port: defaults::SERVER_PORT,
            es_enabled: true,
            projection_path: None,
            rate_limit_enabled: true,
            rate_limit_requests: defaults::RATE_LIMIT_REQUESTS,
            rate_limit_period: Duration::from_secs(defaults::RATE_LIMIT_PERIOD_SECS),
            allowed_origins: vec!["http://localhost:3000".to_string()],
            cache_reclaim_interval: Duration::from_secs(defaults::CACHE_RECLAIM_INTERVAL_SECS),
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            database_url: std::env::var("DATABASE_URL").unwrap_or(base.database_url),
            host: std::env::var("HOST").unwrap_or(base.host),
            port: parse_env("PORT").unwrap_or(base.port),
            es_enabled: flag_env("ES_ENABLED").unwrap_or(base.es_enabled),
            projection_path: std::env::var("PROJECTION_PATH")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            rate_limit_enabled: flag_env("RATE_LIMIT_ENABLED").unwrap_or(base.rate_limit_enabled),
            rate_limit_requests: parse_env("RATE_LIMIT_REQUESTS")
                .filter(|n| *n > 0)
                .unwrap_or(base.rate_limit_requests),
            rate_limit_period: parse_env("RATE_LIMIT_PERIOD_SECS")
                .filter(|n| *n > 0)
                .map(Duration::from_secs)
                .unwrap_or(base.rate_limit_period),
            allowed_origins: std::env::var("ALLOWED_ORIGINS")
                .map(|v| parse_origins(&v))
                .unwrap_or(base.allowed_origins),
            cache_reclaim_interval: parse_env("CACHE_RECLAIM_INTERVAL_SECS")
                .filter(|n| *n > 0)
                .map(Duration::from_secs)
                .unwrap_or(base.cache_reclaim_interval),
        }
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn flag_env(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
}

/// Comma-separated origin list; blanks dropped.
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins_skips_blanks() {
        assert_eq!(
            parse_origins("http://a.example, ,http://b.example,"),
            vec!["http://a.example", "http://b.example"]
        );
    }

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.rate_limit_requests, 20);
        assert!(config.es_enabled);
        assert_eq!(config.bind_addr().unwrap().port(), 3000);
    }
}
