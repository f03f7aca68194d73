//! Configuration Module
//!
//! Handles loading cache and feed configuration from environment variables.

use std::env;
use std::path::PathBuf;

/// Runtime configuration for the cache and feed services.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the SQLite file backing the persistent cache
    pub db_path: PathBuf,
    /// Base URL of the Bible chapter API
    pub bible_api_base_url: String,
    /// Translation used when the caller does not name one
    pub default_bible_version: String,
    /// Capacity of each in-memory media cache
    pub media_cache_capacity: usize,
    /// Number of posts requested per feed page
    pub feed_page_size: usize,
    /// Timeout for remote chapter requests in milliseconds
    pub http_timeout_ms: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `DB_PATH` - SQLite file (default: ./fellowship-cache.sqlite)
    /// - `BIBLE_API_BASE_URL` - Chapter API (default: https://bible-api.com)
    /// - `DEFAULT_BIBLE_VERSION` - Translation (default: kjv)
    /// - `MEDIA_CACHE_CAPACITY` - Media entries per cache (default: 50)
    /// - `FEED_PAGE_SIZE` - Posts per page (default: 10)
    /// - `HTTP_TIMEOUT_MS` - Remote fetch timeout (default: 10000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            db_path: env::var("DB_PATH")
                .ok()
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            bible_api_base_url: env::var("BIBLE_API_BASE_URL")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.bible_api_base_url),
            default_bible_version: env::var("DEFAULT_BIBLE_VERSION")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.default_bible_version),
            media_cache_capacity: env::var("MEDIA_CACHE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.media_cache_capacity),
            feed_page_size: env::var("FEED_PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.feed_page_size),
            http_timeout_ms: env::var("HTTP_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.http_timeout_ms),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./fellowship-cache.sqlite"),
            bible_api_base_url: "https://bible-api.com".to_string(),
            default_bible_version: "kjv".to_string(),
            media_cache_capacity: 50,
            feed_page_size: 10,
            http_timeout_ms: 10_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.db_path, PathBuf::from("./fellowship-cache.sqlite"));
        assert_eq!(config.bible_api_base_url, "https://bible-api.com");
        assert_eq!(config.default_bible_version, "kjv");
        assert_eq!(config.media_cache_capacity, 50);
        assert_eq!(config.feed_page_size, 10);
        assert_eq!(config.http_timeout_ms, 10_000);
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("DB_PATH");
        env::remove_var("BIBLE_API_BASE_URL");
        env::remove_var("DEFAULT_BIBLE_VERSION");
        env::remove_var("MEDIA_CACHE_CAPACITY");
        env::remove_var("FEED_PAGE_SIZE");
        env::remove_var("HTTP_TIMEOUT_MS");

        let config = Config::from_env();
        assert_eq!(config.media_cache_capacity, 50);
        assert_eq!(config.feed_page_size, 10);
        assert_eq!(config.default_bible_version, "kjv");
    }
}
