use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub listen: ListenConfig,
    /// Directory with a pre-built front-end, served for unmatched paths.
    #[serde(default)]
    pub appdir: Option<String>,
    #[serde(default = "default_cachedir")]
    pub cachedir: String,
    /// Root for celebrity images stored with a server-relative path.
    #[serde(default)]
    pub imagedir: Option<String>,
    #[serde(default)]
    pub dbdir: Option<String>,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub admin: Option<AdminConfig>,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(skip)]
    pub debug_logs: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenConfig {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default)]
    pub tlscert: Option<String>,
    #[serde(default)]
    pub tlskey: Option<String>,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: None,
            port: default_port(),
            tlscert: None,
            tlskey: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub sqlite: Option<SqliteConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SqliteConfig {
    pub filename: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteConfig {
    #[serde(default = "default_site_name")]
    pub name: String,
    #[serde(alias = "baseurl", default = "default_base_url")]
    pub base_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: default_site_name(),
            base_url: default_base_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Lifetime of a cached celebrity profile response, in seconds.
    #[serde(default = "default_celebrity_ttl")]
    pub celebrity_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            celebrity_ttl_secs: default_celebrity_ttl(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default)]
    pub secure_cookie: bool,
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            secure_cookie: false,
            session_ttl_hours: default_session_ttl_hours(),
            bcrypt_cost: default_bcrypt_cost(),
        }
    }
}

/// Credentials for the admin account created on first start.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdminConfig {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalyticsConfig {
    #[serde(default = "default_rollup_interval")]
    pub rollup_interval_secs: u64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            rollup_interval_secs: default_rollup_interval(),
        }
    }
}

fn default_port() -> String {
    "3000".to_string()
}

fn default_cachedir() -> String {
    "./cache".to_string()
}

fn default_site_name() -> String {
    "Celebrity Bio".to_string()
}

fn default_base_url() -> String {
    "https://celebritybio.com".to_string()
}

fn default_celebrity_ttl() -> u64 {
    3600
}

fn default_cookie_name() -> String {
    "session".to_string()
}

fn default_session_ttl_hours() -> i64 {
    24 * 30
}

fn default_bcrypt_cost() -> u32 {
    12
}

fn default_rollup_interval() -> u64 {
    3600
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_string(), e))?;

        Self::from_yaml(&content).map_err(|e| ConfigError::ParseError(path.to_string(), e))
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    pub fn get_database_path(&self) -> Option<String> {
        if let Some(ref sqlite) = self.database.sqlite {
            return Some(sqlite.filename.clone());
        }

        if let Some(ref dbdir) = self.dbdir {
            let path = PathBuf::from(dbdir).join("celebrity-bio.db");
            return Some(path.to_string_lossy().to_string());
        }

        None
    }

    pub fn image_cache_dir(&self) -> PathBuf {
        PathBuf::from(&self.cachedir).join("images")
    }

    pub fn original_image_dir(&self) -> PathBuf {
        PathBuf::from(&self.cachedir).join("originals")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    ReadError(String, std::io::Error),
    #[error("Failed to parse config file {0}: {1}")]
    ParseError(String, serde_yaml::Error),
}
