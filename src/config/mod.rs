//! Bridge configuration
//!
//! One YAML document covers the HTTP listener, the audit database, logging,
//! retention, the per-tenant feature flag seed and the directory the
//! built-in platform gateway serves. `GUILD_BRIDGE_*` variables override it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub features: FeaturesConfig,
    #[serde(default)]
    pub economy: EconomyConfig,
    #[serde(default)]
    pub platform: PlatformConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5060
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_database_url() -> String {
    "sqlite://./data/guild-bridge.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_connect_timeout() -> u64 {
    30
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    /// Log output target (console or file)
    #[serde(default)]
    pub target: LogTarget,
    /// Directory for log files (used when target is "file" or "both")
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Log file name prefix
    #[serde(default = "default_log_prefix")]
    pub log_prefix: String,
    /// Enable daily log rotation
    #[serde(default = "default_log_rotation")]
    pub daily_rotation: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

/// Log output target
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// Log to console (stdout/stderr) - default for development
    #[default]
    Console,
    /// Log to file with optional rotation - recommended for production
    File,
    /// Log to both console and file
    Both,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("/var/log/guild-bridge")
}

fn default_log_prefix() -> String {
    "guild-bridge".to_string()
}

fn default_log_rotation() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            target: LogTarget::default(),
            log_dir: default_log_dir(),
            log_prefix: default_log_prefix(),
            daily_rotation: default_log_rotation(),
        }
    }
}

/// Service-to-service authentication
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Shared secret the dashboard backend presents on every REST call
    #[serde(default = "default_service_token")]
    pub service_token: String,
}

fn default_service_token() -> String {
    "change-me-in-production".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            service_token: default_service_token(),
        }
    }
}

/// Pub/sub bridge configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BridgeConfig {
    /// Outbound queue depth per connection; overflow is dropped
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Automatic reconnect attempts before a session stays closed
    #[serde(default = "default_reconnect_attempts")]
    pub reconnect_attempts: u32,
    /// Fixed delay between reconnect attempts
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,
}

fn default_channel_capacity() -> usize {
    256
}

fn default_reconnect_attempts() -> u32 {
    5
}

fn default_reconnect_delay() -> u64 {
    2000
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            reconnect_attempts: default_reconnect_attempts(),
            reconnect_delay_ms: default_reconnect_delay(),
        }
    }
}

/// Audit log configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuditConfig {
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// Interval of the background retention sweep (0 disables it)
    #[serde(default = "default_purge_interval")]
    pub purge_interval_secs: u64,
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

fn default_retention_days() -> u32 {
    90
}

fn default_purge_interval() -> u64 {
    86400 // once a day
}

fn default_page_size() -> u32 {
    50
}

fn default_max_page_size() -> u32 {
    200
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            purge_interval_secs: default_purge_interval(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

/// Recent activity buffer configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HistoryConfig {
    /// Entries kept per tenant
    #[serde(default = "default_history_capacity")]
    pub capacity: usize,
}

fn default_history_capacity() -> usize {
    100
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_history_capacity(),
        }
    }
}

/// Feature flag seed and refresh configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeaturesConfig {
    /// Value of a flag that has no explicit entry for a tenant
    #[serde(default = "default_feature_enabled")]
    pub default_enabled: bool,
    /// tenant id -> feature name -> enabled
    #[serde(default)]
    pub tenants: HashMap<String, HashMap<String, bool>>,
    /// Optional YAML file reloaded periodically (same shape as `tenants`)
    #[serde(default)]
    pub refresh_file: Option<PathBuf>,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
}

fn default_feature_enabled() -> bool {
    true
}

fn default_refresh_interval() -> u64 {
    60
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            default_enabled: default_feature_enabled(),
            tenants: HashMap::new(),
            refresh_file: None,
            refresh_interval_secs: default_refresh_interval(),
        }
    }
}

/// Economy action configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EconomyConfig {
    /// Balance credited to members the ledger has not seen yet
    #[serde(default = "default_opening_balance")]
    pub opening_balance: i64,
}

fn default_opening_balance() -> i64 {
    10_000
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            opening_balance: default_opening_balance(),
        }
    }
}

/// Seed directory for the built-in platform gateway
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct PlatformConfig {
    #[serde(default)]
    pub tenants: Vec<TenantSeed>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TenantSeed {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub members: Vec<MemberSeed>,
    #[serde(default)]
    pub channels: Vec<NamedSeed>,
    #[serde(default)]
    pub roles: Vec<NamedSeed>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MemberSeed {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub is_bot: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NamedSeed {
    pub id: String,
    pub name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            auth: AuthConfig::default(),
            bridge: BridgeConfig::default(),
            audit: AuditConfig::default(),
            history: HistoryConfig::default(),
            features: FeaturesConfig::default(),
            economy: EconomyConfig::default(),
            platform: PlatformConfig::default(),
        }
    }
}

impl AppConfig {
    /// Build the effective configuration
    ///
    /// Defaults, then the YAML file named by `GUILD_BRIDGE_CONFIG` (or the
    /// first one found in the usual places), then `GUILD_BRIDGE_*` variables.
    /// A `.env` file in the working directory is read first when present.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let explicit = std::env::var_os("GUILD_BRIDGE_CONFIG").map(PathBuf::from);
        let mut config = match explicit.or_else(Self::find_config_file) {
            Some(path) if path.is_file() => {
                // Logging is not up yet
                eprintln!("[CONFIG] Reading {}", path.display());
                Self::from_file(&path)?
            }
            Some(path) => {
                eprintln!("[CONFIG] {} does not exist, using defaults", path.display());
                AppConfig::default()
            }
            None => AppConfig::default(),
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_norway::from_str(&contents)
            .with_context(|| format!("Invalid YAML in config file {}", path.display()))
    }

    fn find_config_file() -> Option<PathBuf> {
        let user_config = dirs::config_dir().map(|dir| dir.join("guild-bridge").join("config.yaml"));

        [
            Some(PathBuf::from("guild-bridge.yaml")),
            Some(PathBuf::from("config/guild-bridge.yaml")),
            user_config,
            Some(PathBuf::from("/etc/guild-bridge/config.yaml")),
        ]
        .into_iter()
        .flatten()
        .find(|candidate| candidate.is_file())
    }

    fn apply_env_overrides(&mut self) {
        if let Some(host) = env_var("GUILD_BRIDGE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parse("GUILD_BRIDGE_PORT") {
            self.server.port = port;
        }
        if let Some(url) = env_var("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(token) = env_var("GUILD_BRIDGE_SERVICE_TOKEN") {
            self.auth.service_token = token;
        }

        if let Some(level) = env_var("RUST_LOG") {
            self.logging.level = level;
        }
        if let Some(format) = env_var("GUILD_BRIDGE_LOG_FORMAT") {
            self.logging.format = match format.to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "compact" => LogFormat::Compact,
                _ => LogFormat::Pretty,
            };
        }
        if let Some(target) = env_var("GUILD_BRIDGE_LOG_TARGET") {
            self.logging.target = match target.to_ascii_lowercase().as_str() {
                "file" => LogTarget::File,
                "both" => LogTarget::Both,
                _ => LogTarget::Console,
            };
        }
        if let Some(dir) = env_var("GUILD_BRIDGE_LOG_DIR") {
            self.logging.log_dir = PathBuf::from(dir);
        }

        if let Some(days) = env_parse("GUILD_BRIDGE_AUDIT_RETENTION_DAYS") {
            self.audit.retention_days = days;
        }
        if let Some(capacity) = env_parse("GUILD_BRIDGE_HISTORY_CAPACITY") {
            self.history.capacity = capacity;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.auth.service_token.len() < 16 {
            anyhow::bail!("Service token must be at least 16 characters long");
        }

        if self.server.port == 0 {
            anyhow::bail!("Server port cannot be 0");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.history.capacity == 0 {
            anyhow::bail!("History capacity must be greater than 0");
        }

        if self.bridge.channel_capacity == 0 {
            anyhow::bail!("Bridge channel capacity must be greater than 0");
        }

        if self.audit.retention_days == 0 {
            anyhow::bail!("Audit retention must be at least 1 day");
        }

        if self.economy.opening_balance < 0 {
            anyhow::bail!("Economy opening balance cannot be negative");
        }

        if self.audit.default_page_size == 0 || self.audit.default_page_size > self.audit.max_page_size {
            anyhow::bail!(
                "Audit default page size must be between 1 and {}",
                self.audit.max_page_size
            );
        }

        Ok(())
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Unparseable values are ignored so a typo falls back to the file value
fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_var(key).and_then(|value| value.trim().parse().ok())
}
