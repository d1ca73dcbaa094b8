use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to read config: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration for the CogniCode backend
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CogniCodeConfig {
    /// Listener and connection settings
    #[serde(default)]
    pub server: ServerSettings,

    /// Request validation limits
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Result cache sizing and expiry
    #[serde(default)]
    pub cache: CacheSettings,

    /// Worker pool sizing
    #[serde(default)]
    pub pool: PoolSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// "development" or "production"; development relaxes CORS
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Maximum number of concurrently connected sessions
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Allowed CORS origins outside development
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl ServerSettings {
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            max_connections: default_max_connections(),
            cors_origins: default_cors_origins(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Largest accepted snippet, in bytes
    #[serde(default = "default_max_code_bytes")]
    pub max_code_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_code_bytes: default_max_code_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Maximum number of cached analyses
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,

    /// Entry time-to-live in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,

    /// Interval of the background expiry sweep in seconds
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSettings {
    /// Upper bound on workers per capability when the pool grows
    #[serde(default = "default_max_workers")]
    pub max_workers_per_capability: usize,
    /// Add a worker when every existing one for the capability is busy
    #[serde(default)]
    pub grow_on_contention: bool,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_workers_per_capability: default_max_workers(),
            grow_on_contention: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "pretty", "compact", "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_environment() -> String {
    "production".to_string()
}
fn default_max_connections() -> usize {
    100
}
fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "https://cognicode-agent.vercel.app".to_string(),
    ]
}
fn default_max_code_bytes() -> usize {
    16 * 1024 * 1024
}
fn default_cache_capacity() -> usize {
    1000
}
fn default_cache_ttl_secs() -> u64 {
    3600
}
fn default_cleanup_interval_secs() -> u64 {
    300
}
fn default_max_workers() -> usize {
    3
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

/// Configuration manager with layered sources
pub struct ConfigManager {
    config: CogniCodeConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with the following precedence:
    /// 1. Environment variables (.env file)
    /// 2. Config file (.cognicode.toml)
    /// 3. Defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_dotenv();
        let (config, config_path) = Self::load_config_file()?;
        Self::finish(config, config_path)
    }

    /// Load from an explicit file path, still honouring env overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        Self::load_dotenv();
        let config = Self::read_toml_file(path)?;
        Self::finish(config, Some(path.to_path_buf()))
    }

    fn finish(config: CogniCodeConfig, config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config = Self::apply_env_overrides(config);
        Self::validate_config(&config)?;

        info!(
            config_file = %config_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "NONE (using defaults)".to_string()),
            environment = %config.server.environment,
            cache_capacity = config.cache.capacity,
            cache_ttl_secs = config.cache.ttl_secs,
            pool_size = config.pool.max_workers_per_capability,
            pool_grow = config.pool.grow_on_contention,
            "Configuration loaded"
        );

        Ok(Self {
            config,
            config_path,
        })
    }

    fn load_dotenv() {
        if Path::new(".env").exists() {
            if let Err(e) = dotenv::from_filename(".env") {
                warn!("Failed to load .env file: {}", e);
            }
            return;
        }

        if let Some(home) = dirs::home_dir() {
            let home_env = home.join(".cognicode.env");
            if home_env.exists() {
                if let Err(e) = dotenv::from_path(&home_env) {
                    warn!("Failed to load .cognicode.env: {}", e);
                }
            }
        }
    }

    /// Search order: ./.cognicode.toml, ~/.cognicode/config.toml, defaults
    fn load_config_file() -> Result<(CogniCodeConfig, Option<PathBuf>), ConfigError> {
        let local_config = Path::new(".cognicode.toml");
        if local_config.exists() {
            let config = Self::read_toml_file(local_config)?;
            return Ok((config, Some(local_config.to_path_buf())));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".cognicode").join("config.toml");
            if user_config.exists() {
                let config = Self::read_toml_file(&user_config)?;
                return Ok((config, Some(user_config)));
            }
        }

        Ok((CogniCodeConfig::default(), None))
    }

    fn read_toml_file(path: &Path) -> Result<CogniCodeConfig, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    fn apply_env_overrides(mut config: CogniCodeConfig) -> CogniCodeConfig {
        fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
            std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
        }

        if let Ok(env) = std::env::var("COGNICODE_ENV").or_else(|_| std::env::var("FLASK_ENV")) {
            config.server.environment = env;
        }
        if let Ok(host) = std::env::var("HOST") {
            config.server.host = host;
        }
        if let Some(port) = parsed("PORT") {
            config.server.port = port;
        }
        if let Some(max) = parsed("MAX_CONNECTIONS") {
            config.server.max_connections = max;
        }
        if let Some(size) = parsed("AGENT_POOL_SIZE") {
            config.pool.max_workers_per_capability = size;
        }
        if let Some(grow) = parsed("AGENT_POOL_GROW") {
            config.pool.grow_on_contention = grow;
        }
        if let Some(ttl) = parsed("CACHE_TIMEOUT") {
            config.cache.ttl_secs = ttl;
        }
        if let Some(capacity) = parsed("CACHE_CAPACITY") {
            config.cache.capacity = capacity;
        }
        if let Some(bytes) = parsed("MAX_CODE_BYTES") {
            config.limits.max_code_bytes = bytes;
        }
        // Full filter directives are left for the subscriber to parse.
        if let Ok(level) = std::env::var("RUST_LOG") {
            if LOG_LEVELS.contains(&level.as_str()) {
                config.logging.level = level;
            }
        }

        config
    }

    pub fn validate_config(config: &CogniCodeConfig) -> Result<(), ConfigError> {
        if config.cache.capacity == 0 {
            return Err(ConfigError::ValidationError(
                "cache.capacity must be at least 1".to_string(),
            ));
        }
        if config.cache.ttl_secs == 0 {
            return Err(ConfigError::ValidationError(
                "cache.ttl_secs must be at least 1".to_string(),
            ));
        }
        if config.pool.max_workers_per_capability == 0 {
            return Err(ConfigError::ValidationError(
                "pool.max_workers_per_capability must be at least 1".to_string(),
            ));
        }
        if config.limits.max_code_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_code_bytes must be at least 1".to_string(),
            ));
        }

        if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log level: {}. Must be one of: {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }

    pub fn config(&self) -> &CogniCodeConfig {
        &self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn into_config(self) -> CogniCodeConfig {
        self.config
    }
}
