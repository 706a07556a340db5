//! Runtime configuration loaded from the environment

use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5000;
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_MAX_RETRIES: u32 = 1;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
const MAX_RETRIES_CAP: u32 = 5;

/// Retry policy for transport failures.
/// The n-th retry waits `base_delay * n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt.max(1))
    }

    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    pub api_url: String,
    pub poll_interval: Duration,
    pub http_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            http_timeout: Duration::from_millis(DEFAULT_HTTP_TIMEOUT_MS),
            retry: RetryPolicy::default(),
        }
    }
}

impl TrackerConfig {
    /// Load from `SCOREBOARD_*` variables, falling back to defaults on
    /// missing, unparsable or zero values.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let millis = |key: &str, default: u64| {
            lookup(key)
                .and_then(|s| s.trim().parse::<u64>().ok())
                .filter(|&n| n > 0)
                .map(Duration::from_millis)
                .unwrap_or(Duration::from_millis(default))
        };

        let api_url = lookup("SCOREBOARD_API_URL")
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let max_retries = lookup("SCOREBOARD_MAX_RETRIES")
            .and_then(|s| s.trim().parse::<u32>().ok())
            .filter(|&n| n > 0)
            .map(|n| n.min(MAX_RETRIES_CAP))
            .unwrap_or(DEFAULT_MAX_RETRIES);

        Self {
            api_url,
            poll_interval: millis("SCOREBOARD_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS),
            http_timeout: millis("SCOREBOARD_HTTP_TIMEOUT_MS", DEFAULT_HTTP_TIMEOUT_MS),
            retry: RetryPolicy {
                max_retries,
                base_delay: millis("SCOREBOARD_RETRY_DELAY_MS", DEFAULT_RETRY_DELAY_MS),
            },
        }
    }
}
