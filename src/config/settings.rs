//! Settings structures for UQE-API configuration

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Default listen port
pub const DEFAULT_PORT: u16 = 9000;

/// Default MySQL port (TiDB Cloud)
pub const DEFAULT_DB_PORT: u16 = 4000;

/// Default table holding quality records
pub const DEFAULT_TABLE: &str = "uqe_data";

/// Errors raised while validating settings
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Main settings structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub outgoing: OutgoingSettings,
    pub cache: CacheSettings,
    pub search: SearchSettings,
    pub restart: RestartSettings,
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_yaml::from_str(&content)?;
        Ok(settings)
    }

    /// Merge with process environment variables
    pub fn merge_env(&mut self) -> std::result::Result<(), ConfigError> {
        self.merge_env_from(|key| std::env::var(key).ok())
    }

    /// Merge with variables resolved by `lookup`. Empty values count as unset;
    /// values that do not parse are rejected.
    pub fn merge_env_from<F>(&mut self, lookup: F) -> std::result::Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(val) = var("PORT") {
            self.server.port = parse_var("PORT", &val)?;
        }
        if let Some(val) = var("BIND_ADDRESS") {
            self.server.bind_address = val;
        }

        // Database
        if let Some(val) = var("DB_HOST") {
            self.database.mysql.host = Some(val);
        }
        if let Some(val) = var("DB_PORT") {
            self.database.mysql.port = parse_var("DB_PORT", &val)?;
        }
        if let Some(val) = var("DB_USER") {
            self.database.mysql.user = Some(val);
        }
        if let Some(val) = var("DB_PASSWORD").or_else(|| var("DB_PASS")) {
            self.database.mysql.password = Some(val);
        }
        if let Some(val) = var("DB_NAME") {
            self.database.mysql.name = Some(val);
        }
        if let Some(val) = var("DB_SSL_MODE") {
            self.database.mysql.ssl_mode = val;
        }
        if let Some(val) = var("DB_MAX_CONNECTIONS") {
            self.database.mysql.max_connections = parse_var("DB_MAX_CONNECTIONS", &val)?;
        }
        if let Some(val) = var("SUPABASE_URL") {
            self.database.supabase.url = Some(val);
        }
        if let Some(val) = var("SUPABASE_SERVICE_ROLE_KEY") {
            self.database.supabase.service_role_key = Some(val);
        }
        if let Some(val) = var("RECORDS_TABLE") {
            self.database.table = val;
        }

        match var("DATA_BACKEND").map(|v| v.trim().to_lowercase()) {
            Some(ref v) if v == "supabase" => self.database.backend = Backend::Supabase,
            Some(ref v) if v == "mysql" => self.database.backend = Backend::MySql,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    field: "DATA_BACKEND",
                    reason: format!("unknown backend '{}', expected mysql or supabase", other),
                })
            }
            None => {
                if var("SUPABASE_URL").is_some() {
                    self.database.backend = Backend::Supabase;
                }
            }
        }

        // Restart proxy
        if let Some(val) = var("RENDER_SERVICE_ID") {
            self.restart.service_id = Some(val);
        }
        if let Some(val) = var("RENDER_API_KEY") {
            self.restart.api_key = Some(val);
        }
        if let Some(val) = var("RENDER_API_BASE_URL") {
            self.restart.api_base_url = val;
        }

        if let Some(val) = var("REQUEST_TIMEOUT_SECS") {
            self.outgoing.request_timeout = parse_var("REQUEST_TIMEOUT_SECS", &val)?;
        }
        if let Some(val) = var("SUGGESTION_CACHE_TTL_SECS") {
            self.cache.suggestion_ttl_secs = parse_var("SUGGESTION_CACHE_TTL_SECS", &val)?;
        }
        if let Some(val) = var("SUGGESTION_CACHE_CAPACITY") {
            self.cache.suggestion_capacity = parse_var("SUGGESTION_CACHE_CAPACITY", &val)?;
        }

        Ok(())
    }

    /// Check that every value required by the selected backend is present
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !is_identifier(&self.database.table) {
            return Err(ConfigError::Invalid {
                field: "database.table",
                reason: format!("'{}' is not a plain identifier", self.database.table),
            });
        }

        match self.database.backend {
            Backend::MySql => {
                let mysql = &self.database.mysql;
                if mysql.host.is_none() {
                    return Err(ConfigError::Missing("DB_HOST"));
                }
                if mysql.user.is_none() {
                    return Err(ConfigError::Missing("DB_USER"));
                }
                if mysql.name.is_none() {
                    return Err(ConfigError::Missing("DB_NAME"));
                }
                if mysql.max_connections == 0 {
                    return Err(ConfigError::Invalid {
                        field: "database.mysql.max_connections",
                        reason: "must be at least 1".to_string(),
                    });
                }
                if mysql.ssl_mode.parse::<sqlx::mysql::MySqlSslMode>().is_err() {
                    return Err(ConfigError::Invalid {
                        field: "DB_SSL_MODE",
                        reason: format!("unknown ssl mode '{}'", mysql.ssl_mode),
                    });
                }
            }
            Backend::Supabase => {
                let supabase = &self.database.supabase;
                let url = supabase
                    .url
                    .as_deref()
                    .ok_or(ConfigError::Missing("SUPABASE_URL"))?;
                url::Url::parse(url).map_err(|e| ConfigError::Invalid {
                    field: "SUPABASE_URL",
                    reason: e.to_string(),
                })?;
                if supabase.service_role_key.is_none() {
                    return Err(ConfigError::Missing("SUPABASE_SERVICE_ROLE_KEY"));
                }
            }
        }

        match (&self.restart.service_id, &self.restart.api_key) {
            (Some(_), None) => return Err(ConfigError::Missing("RENDER_API_KEY")),
            (None, Some(_)) => return Err(ConfigError::Missing("RENDER_SERVICE_ID")),
            (Some(_), Some(_)) => {
                url::Url::parse(&self.restart.api_base_url).map_err(|e| {
                    ConfigError::Invalid {
                        field: "RENDER_API_BASE_URL",
                        reason: e.to_string(),
                    }
                })?;
            }
            (None, None) => {}
        }

        let timeout = self.outgoing.request_timeout;
        if !(timeout.is_finite() && timeout > 0.0) {
            return Err(ConfigError::Invalid {
                field: "outgoing.request_timeout",
                reason: format!("must be a positive number of seconds, got {}", timeout),
            });
        }
        if self.cache.suggestion_ttl_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "cache.suggestion_ttl_secs",
                reason: "must be positive".to_string(),
            });
        }
        if !(1..=1000).contains(&self.search.autocomplete_limit) {
            return Err(ConfigError::Invalid {
                field: "search.autocomplete_limit",
                reason: "must be between 1 and 1000".to_string(),
            });
        }

        Ok(())
    }
}

fn parse_var<T>(field: &'static str, raw: &str) -> std::result::Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        field,
        reason: format!("'{}': {}", raw.trim(), e),
    })
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Server port
    pub port: u16,
    /// Bind address
    pub bind_address: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_address: "0.0.0.0".to_string(),
        }
    }
}

/// Which store backs the record endpoints
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    MySql,
    Supabase,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::MySql => "mysql",
            Backend::Supabase => "supabase",
        }
    }
}

/// Record store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub backend: Backend,
    /// Table holding quality records
    pub table: String,
    pub mysql: MySqlSettings,
    pub supabase: SupabaseSettings,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            table: DEFAULT_TABLE.to_string(),
            mysql: MySqlSettings::default(),
            supabase: SupabaseSettings::default(),
        }
    }
}

/// MySQL-compatible connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MySqlSettings {
    pub host: Option<String>,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    /// One of: disabled, preferred, required, verify_ca, verify_identity
    pub ssl_mode: String,
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection
    pub acquire_timeout: u64,
}

impl Default for MySqlSettings {
    fn default() -> Self {
        Self {
            host: None,
            port: DEFAULT_DB_PORT,
            user: None,
            password: None,
            name: None,
            ssl_mode: "verify_identity".to_string(),
            max_connections: 10,
            acquire_timeout: 10,
        }
    }
}

/// Supabase (PostgREST) settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SupabaseSettings {
    pub url: Option<String>,
    pub service_role_key: Option<String>,
}

/// Outgoing request settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutgoingSettings {
    /// Request timeout in seconds
    pub request_timeout: f64,
    /// Pool max idle connections per host
    pub pool_maxsize: usize,
}

impl Default for OutgoingSettings {
    fn default() -> Self {
        Self {
            request_timeout: 10.0,
            pool_maxsize: 20,
        }
    }
}

/// Suggestion cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub suggestion_ttl_secs: u64,
    pub suggestion_capacity: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            suggestion_ttl_secs: 5,
            suggestion_capacity: 1000,
        }
    }
}

/// Search behavior settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Maximum number of distinct article numbers returned by autocomplete
    pub autocomplete_limit: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            autocomplete_limit: 200,
        }
    }
}

/// Render restart proxy settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RestartSettings {
    pub service_id: Option<String>,
    pub api_key: Option<String>,
    pub api_base_url: String,
}

impl Default for RestartSettings {
    fn default() -> Self {
        Self {
            service_id: None,
            api_key: None,
            api_base_url: "https://api.render.com/v1".to_string(),
        }
    }
}
