//! Application configuration management.

use std::time::Duration;

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Register behavior.
    #[serde(default)]
    pub register: RegisterSettings,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Settings governing register writes and reads.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterSettings {
    /// How long an append may wait for the per-item lock.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    /// Page size used when the caller does not ask for one.
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    /// Upper bound on the page size of register listings.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
    /// Reject disposals witnessed by the performing user.
    #[serde(default = "default_require_distinct_witness")]
    pub require_distinct_witness: bool,
}

fn default_lock_timeout_ms() -> u64 {
    5000
}

fn default_page_size() -> u32 {
    50
}

fn default_max_page_size() -> u32 {
    100
}

fn default_require_distinct_witness() -> bool {
    true
}

impl Default for RegisterSettings {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            require_distinct_witness: default_require_distinct_witness(),
        }
    }
}

impl RegisterSettings {
    /// Returns the lock wait bound as a `Duration`.
    #[must_use]
    pub const fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// A `.env` file is honored when present.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("CUSTODIA").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
