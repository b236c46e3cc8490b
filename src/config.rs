//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of entries the read cache can hold
    pub cache_capacity: usize,
    /// Number of pooled durable-store connections
    pub pool_size: usize,
    /// Threads available to run blocking service calls
    pub worker_threads: usize,
    /// HTTP server port
    pub server_port: u16,
    /// Snapshot file for the durable table; volatile when unset
    pub data_file: Option<PathBuf>,
    /// Upper bound on waiting for a pooled connection; unbounded when unset
    pub acquire_timeout_ms: Option<u64>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Cache entries (default: 20)
    /// - `POOL_SIZE` - Pooled connections (default: 8)
    /// - `WORKER_THREADS` - Blocking worker threads (default: 8)
    /// - `SERVER_PORT` - HTTP server port (default: 8080)
    /// - `DATA_FILE` - Durable table snapshot path (default: none)
    /// - `ACQUIRE_TIMEOUT_MS` - Connection wait bound in ms (default: none)
    ///
    /// Zero and unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_capacity: positive("CACHE_CAPACITY").unwrap_or(defaults.cache_capacity),
            pool_size: positive("POOL_SIZE").unwrap_or(defaults.pool_size),
            worker_threads: positive("WORKER_THREADS").unwrap_or(defaults.worker_threads),
            server_port: positive("SERVER_PORT").unwrap_or(defaults.server_port),
            data_file: env::var_os("DATA_FILE")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            acquire_timeout_ms: positive("ACQUIRE_TIMEOUT_MS"),
        }
    }

    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout_ms.map(Duration::from_millis)
    }
}

fn positive<T>(name: &str) -> Option<T>
where
    T: FromStr + PartialOrd + Default,
{
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .filter(|v| *v > T::default())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_capacity: 20,
            pool_size: 8,
            worker_threads: 8,
            server_port: 8080,
            data_file: None,
            acquire_timeout_ms: None,
        }
    }
}
