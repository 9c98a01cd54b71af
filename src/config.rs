//! Runtime configuration.
//!
//! Plain structs with sensible defaults and `with_*` builders. With the
//! `serde` feature every type derives `Serialize`/`Deserialize` (missing
//! fields fall back to their defaults) and [`VfsConfig::from_json_str`] parses
//! a JSON document.
//!
//! ```rust
//! use std::time::Duration;
//! use anyfile::{ConnectionConfig, VfsConfig};
//!
//! let config = VfsConfig::default()
//!     .with_attribute_ttl(Duration::from_secs(5))
//!     .with_connection(ConnectionConfig::default().with_idle_timeout(Duration::from_secs(30)));
//! assert_eq!(config.attribute_ttl, Duration::from_secs(5));
//! ```

use std::time::Duration;

use crate::buffer::DEFAULT_MAX_POOL_BYTES;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct VfsConfig {
    /// How long remote attribute snapshots stay authoritative.
    pub attribute_ttl: Duration,
    /// Connection pool settings.
    pub connection: ConnectionConfig,
    /// Byte cap of the buffer pool.
    pub buffer_pool_max_bytes: usize,
    /// HTTP backend settings.
    pub http: HttpConfig,
}

impl Default for VfsConfig {
    fn default() -> Self {
        Self {
            attribute_ttl: Duration::from_secs(60),
            connection: ConnectionConfig::default(),
            buffer_pool_max_bytes: DEFAULT_MAX_POOL_BYTES,
            http: HttpConfig::default(),
        }
    }
}

impl VfsConfig {
    /// Set the attribute TTL.
    pub fn with_attribute_ttl(mut self, ttl: Duration) -> Self {
        self.attribute_ttl = ttl;
        self
    }

    /// Set the connection settings.
    pub fn with_connection(mut self, connection: ConnectionConfig) -> Self {
        self.connection = connection;
        self
    }

    /// Set the buffer pool cap.
    pub fn with_buffer_pool_max_bytes(mut self, max_bytes: usize) -> Self {
        self.buffer_pool_max_bytes = max_bytes;
        self
    }

    /// Set the HTTP settings.
    pub fn with_http(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }

    /// Parse a JSON document. Absent fields keep their defaults.
    #[cfg(feature = "serde")]
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Connection pool settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ConnectionConfig {
    /// Idle handlers older than this are closed by pruning.
    pub idle_timeout: Duration,
    /// Period between keep-alives, `None` for backends that need none.
    pub keep_alive_period: Option<Duration>,
    /// How often the background monitor runs.
    pub monitor_interval: Duration,
    /// Retry policy for establishing a session.
    pub retry: RetryPolicy,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(5 * 60),
            keep_alive_period: None,
            monitor_interval: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

impl ConnectionConfig {
    /// Set the idle timeout.
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Enable keep-alives with the given period.
    pub fn with_keep_alive(mut self, period: Duration) -> Self {
        self.keep_alive_period = Some(period);
        self
    }

    /// Set the monitor interval.
    pub fn with_monitor_interval(mut self, interval: Duration) -> Self {
        self.monitor_interval = interval;
        self
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Exponential backoff with a capped delay.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RetryPolicy {
    /// Total attempts, including the first. `1` disables retry.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Upper bound for any delay.
    pub max_delay: Duration,
    /// Growth factor between consecutive delays.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryPolicy {
    /// A single attempt.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }

    /// Exponential backoff with `max_attempts` attempts.
    pub fn exponential(max_attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            max_delay,
            multiplier: 2.0,
        }
    }

    /// Delay before attempt `attempt` (0-based; attempt 0 has none).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = self.multiplier.max(1.0).powi(attempt.saturating_sub(1) as i32);
        self.initial_delay.mul_f64(factor).min(self.max_delay)
    }

    /// The delays between consecutive attempts.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (1..self.max_attempts).map(|attempt| self.delay_for(attempt))
    }
}

/// HTTP backend settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HttpConfig {
    /// Per-request timeout.
    pub timeout: Duration,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: concat!("anyfile/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
