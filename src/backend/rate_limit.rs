//! Client-side request pacing for the remote store
//!
//! A governor token bucket shared by every operation of one `RemoteStore`.
//! It keeps a query loop from draining a table's provisioned capacity.

use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Request pacing settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    /// Sustained store requests per second
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
    /// Requests allowed back to back before pacing starts
    #[serde(default = "default_burst_size")]
    pub burst_size: u32,
}

fn default_requests_per_second() -> u32 {
    10
}

fn default_burst_size() -> u32 {
    10
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_requests_per_second(),
            burst_size: default_burst_size(),
        }
    }
}

impl RateLimiterConfig {
    pub fn new(requests_per_second: u32, burst_size: u32) -> Self {
        Self {
            requests_per_second,
            burst_size,
        }
    }
}

/// Token bucket in front of store requests
#[derive(Clone)]
pub struct RateLimiter {
    bucket: Arc<Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>,
}

impl RateLimiter {
    /// Zero settings are raised to one request
    pub fn new(config: &RateLimiterConfig) -> Self {
        let per_second = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::MIN);

        Self {
            bucket: Arc::new(Governor::direct(
                Quota::per_second(per_second).allow_burst(burst),
            )),
        }
    }

    /// Wait for the next request slot
    pub async fn acquire(&self) {
        self.bucket.until_ready().await;
    }

    /// Take a slot if one is free right now
    pub fn try_acquire(&self) -> bool {
        self.bucket.check().is_ok()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_from_yaml() {
        let config: RateLimiterConfig = serde_yaml::from_str("requests_per_second: 25\n").unwrap();
        assert_eq!(config, RateLimiterConfig::new(25, 10));
    }

    #[tokio::test]
    async fn test_burst_then_paced() {
        let limiter = RateLimiter::new(&RateLimiterConfig::new(10, 3));

        for _ in 0..3 {
            assert!(limiter.try_acquire());
        }
        assert!(!limiter.try_acquire());
    }

    #[tokio::test]
    async fn test_zero_settings_allow_one_request() {
        let limiter = RateLimiter::new(&RateLimiterConfig::new(0, 0));
        limiter.acquire().await;
        assert!(!limiter.try_acquire());
    }
}
