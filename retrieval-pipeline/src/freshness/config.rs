use std::time::Duration;

use common::utils::config::AppConfig;

#[derive(Debug, Clone)]
pub struct FreshnessConfig {
    /// Validity of links minted during a refresh.
    pub link_ttl: Duration,
    /// Links expiring within this window are refreshed early. Zero refreshes only expired links.
    pub refresh_margin: Duration,
    pub lookup_timeout: Duration,
    pub write_timeout: Duration,
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        Self {
            link_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            refresh_margin: Duration::ZERO,
            lookup_timeout: Duration::from_secs(3),
            write_timeout: Duration::from_secs(10),
        }
    }
}

impl From<&AppConfig> for FreshnessConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            link_ttl: config.link_ttl(),
            refresh_margin: config.link_refresh_margin(),
            lookup_timeout: config.lookup_timeout(),
            write_timeout: config.write_timeout(),
        }
    }
}
