//! Rate Limiting Infrastructure
//!
//! Fixed-window counters. The store decides where counters live (Postgres in
//! production, [`MemoryRateLimitStore`] for tests and single-process setups).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests allowed in the window
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    pub fn window_ms(&self) -> i64 {
        self.window.as_millis() as i64
    }

    /// Start of the window containing `now_ms`
    pub fn window_start_ms(&self, now_ms: i64) -> i64 {
        let window = self.window_ms().max(1);
        now_ms - now_ms.rem_euclid(window)
    }

    /// Turn the counter value after increment into a decision
    pub fn decide(&self, count: u32, window_start_ms: i64, now_ms: i64) -> RateLimitDecision {
        let reset_at_ms = window_start_ms + self.window_ms();
        let allowed = count <= self.max_requests;
        let retry_after_secs = if allowed {
            0
        } else {
            ((reset_at_ms - now_ms).max(0) as u64).div_ceil(1000).max(1)
        };

        RateLimitDecision {
            allowed,
            remaining: self.max_requests.saturating_sub(count),
            reset_at_ms,
            retry_after_secs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at_ms: i64,
    /// Seconds until the window resets; 0 when allowed
    pub retry_after_secs: u64,
}

pub type RateLimitStoreError = Box<dyn std::error::Error + Send + Sync>;

#[trait_variant::make(RateLimitStore: Send)]
pub trait LocalRateLimitStore {
    /// Count one hit for `key` and report whether it is within the limit
    async fn check_and_increment(
        &self,
        key: &str,
        config: &RateLimitConfig,
    ) -> Result<RateLimitDecision, RateLimitStoreError>;
}

pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// In-process store; counters are lost on restart
#[derive(Debug, Default)]
pub struct MemoryRateLimitStore {
    windows: Mutex<HashMap<String, (i64, u32)>>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same as `check_and_increment` with an explicit clock
    pub fn hit_at(&self, key: &str, config: &RateLimitConfig, now_ms: i64) -> RateLimitDecision {
        let window_start = config.window_start_ms(now_ms);
        let count = {
            let mut windows = self
                .windows
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let entry = windows.entry(key.to_string()).or_insert((window_start, 0));
            if entry.0 != window_start {
                *entry = (window_start, 0);
            }
            entry.1 = entry.1.saturating_add(1);
            entry.1
        };
        config.decide(count, window_start, now_ms)
    }
}

impl RateLimitStore for MemoryRateLimitStore {
    async fn check_and_increment(
        &self,
        key: &str,
        config: &RateLimitConfig,
    ) -> Result<RateLimitDecision, RateLimitStoreError> {
        Ok(self.hit_at(key, config, now_ms()))
    }
}
