//! Per-worker Reading Rate Limiting
//!
//! Keyed GCRA limiter from `governor`: each worker gets its own cell budget,
//! replenished at `readings_per_second`. No background task is needed; stale
//! keys are pruned by [`ReadingLimiter::retain_recent`].

use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use tracing::info;

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Readings accepted per worker per second; 0 disables limiting
    pub readings_per_second: u32,
    /// Burst size; defaults to `readings_per_second`
    pub burst_size: Option<u32>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            readings_per_second: 2,
            burst_size: None,
        }
    }
}

impl RateLimitConfig {
    /// No limiting, for replays and tests
    pub fn disabled() -> Self {
        Self {
            readings_per_second: 0,
            burst_size: None,
        }
    }

    fn quota(&self) -> Option<Quota> {
        let rate = NonZeroU32::new(self.readings_per_second)?;
        let burst = self.burst_size.and_then(NonZeroU32::new).unwrap_or(rate);
        Some(Quota::per_second(rate).allow_burst(burst))
    }
}

/// Admission check for reading submissions
pub struct ReadingLimiter {
    limiter: Option<DefaultKeyedRateLimiter<String>>,
}

impl ReadingLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let limiter = config.quota().map(RateLimiter::keyed);
        match &limiter {
            Some(_) => info!(
                readings_per_second = config.readings_per_second,
                "Per-worker rate limiting enabled"
            ),
            None => info!("Per-worker rate limiting disabled"),
        }
        Self { limiter }
    }

    pub fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }

    /// Take one cell for the worker; false when over budget
    pub fn check(&self, worker_id: &str) -> bool {
        match &self.limiter {
            Some(limiter) => limiter.check_key(&worker_id.to_string()).is_ok(),
            None => true,
        }
    }

    /// Drop keys whose budget has fully replenished
    pub fn retain_recent(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.retain_recent();
        }
    }
}
