/// Centralized environment configuration.
/// All env vars and defaults are defined here.
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL. Required.
    pub database_url: String,

    /// Upper bound on pooled connections.
    /// Default: 5
    pub database_max_connections: u32,

    /// Seconds to wait for a free connection before failing.
    /// Default: 3
    pub database_acquire_timeout_secs: u64,

    /// View invalidation adapter: "log" or "none".
    /// Default: log
    pub invalidation_adapter: String,
}

impl Config {
    /// Build config from environment variables.
    /// Returns an error if required vars are missing.
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL must be set in .env")?;

        let database_max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or("DATABASE_MAX_CONNECTIONS must be a positive integer")?;

        let database_acquire_timeout_secs = std::env::var("DATABASE_ACQUIRE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "3".to_string())
            .parse::<u64>()
            .map_err(|_| "DATABASE_ACQUIRE_TIMEOUT_SECS must be a whole number of seconds")?;

        let invalidation_adapter = std::env::var("INVALIDATION_ADAPTER")
            .unwrap_or_else(|_| "log".to_string());

        Ok(Self {
            database_url,
            database_max_connections,
            database_acquire_timeout_secs,
            invalidation_adapter,
        })
    }

    /// Config for tests. Uses an in-memory database on a single connection and the log invalidator.
    pub fn for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            database_max_connections: 1,
            database_acquire_timeout_secs: 3,
            invalidation_adapter: "log".to_string(),
        }
    }
}
