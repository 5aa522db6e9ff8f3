//! Application configuration management.

use serde::Deserialize;

/// Longest time a request may wait for an account lock.
pub const MAX_LOCK_WAIT_MS: u64 = 1_000;

/// Longest lease an account lock may be held for.
pub const MAX_LOCK_LEASE_MS: u64 = 15_000;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Account lock configuration.
    #[serde(default)]
    pub lock: LockConfig,
    /// Log output configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
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

/// Where account locks are coordinated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockBackendKind {
    /// Lease rows in the shared database; safe across server instances.
    #[default]
    Database,
    /// Process-local leases; only valid for a single server instance.
    Memory,
}

/// Account lock configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LockConfig {
    /// Lock coordination backend.
    #[serde(default)]
    pub backend: LockBackendKind,
    /// How long a request waits for a contended lock, in milliseconds.
    #[serde(default = "default_lock_wait_ms")]
    pub wait_ms: u64,
    /// How long an acquired lock is honored before auto-release, in milliseconds.
    #[serde(default = "default_lock_lease_ms")]
    pub lease_ms: u64,
    /// Polling interval while waiting on the database backend, in milliseconds.
    #[serde(default = "default_lock_retry_interval_ms")]
    pub retry_interval_ms: u64,
    /// Proceed without the lock when the backend itself is unreachable.
    #[serde(default)]
    pub fail_open: bool,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            backend: LockBackendKind::default(),
            wait_ms: default_lock_wait_ms(),
            lease_ms: default_lock_lease_ms(),
            retry_interval_ms: default_lock_retry_interval_ms(),
            fail_open: false,
        }
    }
}

fn default_lock_wait_ms() -> u64 {
    MAX_LOCK_WAIT_MS
}

fn default_lock_lease_ms() -> u64 {
    MAX_LOCK_LEASE_MS
}

fn default_lock_retry_interval_ms() -> u64 {
    50
}

impl LockConfig {
    /// Checks the wait window and lease against their upper bounds.
    ///
    /// # Errors
    ///
    /// Returns an error if a duration is zero or exceeds its bound.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.wait_ms == 0 || self.wait_ms > MAX_LOCK_WAIT_MS {
            return Err(config::ConfigError::Message(format!(
                "lock.wait_ms must be within 1..={MAX_LOCK_WAIT_MS}, got {}",
                self.wait_ms
            )));
        }
        if self.lease_ms == 0 || self.lease_ms > MAX_LOCK_LEASE_MS {
            return Err(config::ConfigError::Message(format!(
                "lock.lease_ms must be within 1..={MAX_LOCK_LEASE_MS}, got {}",
                self.lease_ms
            )));
        }
        if self.retry_interval_ms == 0 {
            return Err(config::ConfigError::Message(
                "lock.retry_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Log output configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or is out of bounds.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("TALLY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.lock.validate()?;
        Ok(config)
    }
}
