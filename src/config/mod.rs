//! Configuration management
//!
//! Configuration is read from `config.yml` and may be overridden through
//! `GAZETTE_*` environment variables. Missing values fall back to defaults,
//! so a bare binary with no config file starts against `data/gazette.db`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub session: SessionConfig,
    /// Staff account created on first start when the users table is empty
    #[serde(default)]
    pub admin: Option<AdminBootstrapConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (cookie sessions need an explicit origin)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub driver: DatabaseDriver,
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/gazette.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    #[default]
    Sqlite,
    Mysql,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
    #[serde(default = "default_cache_capacity")]
    pub max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl(),
            max_entries: default_cache_capacity(),
        }
    }
}

fn default_ttl() -> u64 {
    600
}

fn default_cache_capacity() -> u64 {
    10_000
}

/// Page sizes for paginated listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Posts per page on the full listing, category and tag pages
    #[serde(default = "default_list_page_size")]
    pub list_page_size: u32,
    /// Posts per page on search results
    #[serde(default = "default_search_page_size")]
    pub search_page_size: u32,
    /// Rows per page on staff listings (comments, contacts, subscribers)
    #[serde(default = "default_admin_page_size")]
    pub admin_page_size: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            list_page_size: default_list_page_size(),
            search_page_size: default_search_page_size(),
            admin_page_size: default_admin_page_size(),
        }
    }
}

fn default_list_page_size() -> u32 {
    10
}

fn default_search_page_size() -> u32 {
    3
}

fn default_admin_page_size() -> u32 {
    20
}

/// Upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Root directory; images land in `<path>/<kind>/%Y/%m/%d/`
    #[serde(default = "default_upload_path")]
    pub path: PathBuf,
    /// Maximum file size in bytes (default: 10MB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            path: default_upload_path(),
            max_file_size: default_max_file_size(),
            allowed_types: default_allowed_types(),
        }
    }
}

fn default_upload_path() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

fn default_allowed_types() -> Vec<String> {
    vec![
        "image/jpeg".to_string(),
        "image/png".to_string(),
        "image/gif".to_string(),
        "image/webp".to_string(),
    ]
}

impl UploadConfig {
    pub fn is_type_allowed(&self, mime_type: &str) -> bool {
        self.allowed_types.iter().any(|t| t == mime_type)
    }

    pub fn extension_for(&self, mime_type: &str) -> &'static str {
        match mime_type {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            _ => "bin",
        }
    }
}

/// Session lifetime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_ttl_hours")]
    pub ttl_hours: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_hours: default_session_ttl_hours(),
        }
    }
}

fn default_session_ttl_hours() -> i64 {
    24 * 7
}

/// Initial staff account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminBootstrapConfig {
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub password: String,
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
}

impl Config {
    /// Load configuration from file.
    ///
    /// A missing or empty file yields the defaults. Invalid YAML is an error
    /// carrying the line and column of the problem.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        Ok(config)
    }

    /// Load configuration from file, then apply environment overrides.
    ///
    /// Recognised variables:
    /// - GAZETTE_SERVER_HOST, GAZETTE_SERVER_PORT, GAZETTE_SERVER_CORS_ORIGIN
    /// - GAZETTE_DATABASE_DRIVER, GAZETTE_DATABASE_URL
    /// - GAZETTE_CACHE_TTL_SECONDS
    /// - GAZETTE_PAGINATION_LIST_PAGE_SIZE, GAZETTE_PAGINATION_SEARCH_PAGE_SIZE
    /// - GAZETTE_UPLOAD_PATH
    /// - GAZETTE_ADMIN_USERNAME, GAZETTE_ADMIN_EMAIL, GAZETTE_ADMIN_PASSWORD
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("GAZETTE_SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parsed::<u16>("GAZETTE_SERVER_PORT") {
            self.server.port = port;
        }
        if let Ok(cors_origin) = std::env::var("GAZETTE_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(driver) = std::env::var("GAZETTE_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {}
            }
        }
        if let Ok(url) = std::env::var("GAZETTE_DATABASE_URL") {
            self.database.url = url;
        }

        if let Some(ttl) = env_parsed::<u64>("GAZETTE_CACHE_TTL_SECONDS") {
            self.cache.ttl_seconds = ttl;
        }

        if let Some(size) = env_parsed::<u32>("GAZETTE_PAGINATION_LIST_PAGE_SIZE") {
            if size > 0 {
                self.pagination.list_page_size = size;
            }
        }
        if let Some(size) = env_parsed::<u32>("GAZETTE_PAGINATION_SEARCH_PAGE_SIZE") {
            if size > 0 {
                self.pagination.search_page_size = size;
            }
        }

        if let Ok(path) = std::env::var("GAZETTE_UPLOAD_PATH") {
            self.upload.path = PathBuf::from(path);
        }

        if let (Ok(username), Ok(password)) = (
            std::env::var("GAZETTE_ADMIN_USERNAME"),
            std::env::var("GAZETTE_ADMIN_PASSWORD"),
        ) {
            self.admin = Some(AdminBootstrapConfig {
                username,
                email: std::env::var("GAZETTE_ADMIN_EMAIL").unwrap_or_default(),
                password,
            });
        }
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

/// Format YAML parsing error with location
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
