use std::time::Duration;

use common::utils::config::AppConfig;

/// Bounds applied to every store call made while ingesting one document.
#[derive(Debug, Clone)]
pub struct IngestionConfig {
    pub link_ttl: Duration,
    pub lookup_timeout: Duration,
    pub write_timeout: Duration,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            link_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            lookup_timeout: Duration::from_secs(3),
            write_timeout: Duration::from_secs(10),
        }
    }
}

impl From<&AppConfig> for IngestionConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            link_ttl: config.link_ttl(),
            lookup_timeout: config.lookup_timeout(),
            write_timeout: config.write_timeout(),
        }
    }
}
