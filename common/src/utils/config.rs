use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Clone, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Local,
    Memory,
    S3,
}

fn default_storage_kind() -> StorageKind {
    StorageKind::Local
}

#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    pub surrealdb_address: String,
    pub surrealdb_username: String,
    pub surrealdb_password: String,
    pub surrealdb_namespace: String,
    pub surrealdb_database: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    pub http_port: u16,
    #[serde(default = "default_storage_kind")]
    pub storage: StorageKind,
    #[serde(default)]
    pub s3_bucket: Option<String>,
    #[serde(default)]
    pub s3_region: Option<String>,
    #[serde(default)]
    pub s3_endpoint: Option<String>,
    #[serde(default)]
    pub s3_access_key_id: Option<String>,
    #[serde(default)]
    pub s3_secret_access_key: Option<String>,
    /// Externally reachable base URL used when the service signs links itself.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    /// Secret for locally signed links. Required by the local backend; the memory backend
    /// falls back to a per-process secret.
    #[serde(default)]
    pub link_signing_secret: Option<String>,
    #[serde(default = "default_link_ttl_secs")]
    pub link_ttl_secs: u64,
    #[serde(default)]
    pub link_refresh_margin_secs: u64,
    #[serde(default = "default_lookup_timeout_ms")]
    pub lookup_timeout_ms: u64,
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
    #[serde(default = "default_upload_max_bytes")]
    pub upload_max_bytes: usize,
}

impl AppConfig {
    pub fn link_ttl(&self) -> Duration {
        Duration::from_secs(self.link_ttl_secs)
    }

    pub fn link_refresh_margin(&self) -> Duration {
        Duration::from_secs(self.link_refresh_margin_secs)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            surrealdb_address: "mem://".to_string(),
            surrealdb_username: "root".to_string(),
            surrealdb_password: "root".to_string(),
            surrealdb_namespace: "bookshelf".to_string(),
            surrealdb_database: "bookshelf".to_string(),
            data_dir: default_data_dir(),
            http_port: 4000,
            storage: default_storage_kind(),
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            s3_access_key_id: None,
            s3_secret_access_key: None,
            public_base_url: default_public_base_url(),
            link_signing_secret: None,
            link_ttl_secs: default_link_ttl_secs(),
            link_refresh_margin_secs: 0,
            lookup_timeout_ms: default_lookup_timeout_ms(),
            write_timeout_ms: default_write_timeout_ms(),
            upload_max_bytes: default_upload_max_bytes(),
        }
    }
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:4000".to_string()
}

fn default_link_ttl_secs() -> u64 {
    7 * 24 * 60 * 60
}

fn default_lookup_timeout_ms() -> u64 {
    3_000
}

fn default_write_timeout_ms() -> u64 {
    10_000
}

fn default_upload_max_bytes() -> usize {
    16 << 20
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}
