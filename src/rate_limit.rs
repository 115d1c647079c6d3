//! Token-bucket admission control for tool calls.
//!
//! Each tool gets its own bucket, and an optional shared bucket caps the
//! total across all tools. Buckets refill continuously as time passes
//! instead of resetting on a window boundary, so a steady caller sees a
//! smooth allowance rather than a burst at the top of each minute.
//!
//! Admission is non-blocking: a refused call is refused now, there is no
//! queue and no retry bookkeeping.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

/// Bucket key for the shared cross-tool allowance.
const GLOBAL_KEY: &str = "*";

/// Rate limiter settings.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Tokens added per second to each per-tool bucket.
    pub rate: f64,
    /// Capacity of each per-tool bucket.
    pub burst: f64,
    /// Tokens added per second to the shared bucket, when enabled.
    pub global_rate: Option<f64>,
    /// Capacity of the shared bucket, when enabled.
    pub global_burst: Option<f64>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            rate: 5.0,
            burst: 10.0,
            global_rate: None,
            global_burst: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    const fn full(burst: f64, now: Instant) -> Self {
        Self {
            tokens: burst,
            last_refill: now,
        }
    }

    fn refill(&mut self, rate: f64, burst: f64, now: Instant) {
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * rate).min(burst);
        self.last_refill = now;
    }
}

/// Token-bucket rate limiter keyed by tool name.
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl RateLimiter {
    /// Creates a limiter with the given settings.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Admits or refuses one call for `tool_name`.
    ///
    /// Consumes one token from the tool's bucket, and one from the shared
    /// bucket when configured. Tokens are only consumed when every consulted
    /// bucket can pay; a refusal leaves all balances untouched.
    #[must_use]
    pub fn allow(&self, tool_name: &str) -> bool {
        self.allow_at(tool_name, Instant::now())
    }

    fn allow_at(&self, tool_name: &str, now: Instant) -> bool {
        let mut buckets = self
            .buckets
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let tool_ok = {
            let bucket = buckets
                .entry(tool_name.to_string())
                .or_insert_with(|| Bucket::full(self.config.burst, now));
            bucket.refill(self.config.rate, self.config.burst, now);
            bucket.tokens >= 1.0
        };

        let global = match (self.config.global_rate, self.config.global_burst) {
            (Some(rate), Some(burst)) => Some((rate, burst)),
            _ => None,
        };

        let global_ok = global.map_or(true, |(rate, burst)| {
            let bucket = buckets
                .entry(GLOBAL_KEY.to_string())
                .or_insert_with(|| Bucket::full(burst, now));
            bucket.refill(rate, burst, now);
            bucket.tokens >= 1.0
        });

        if !(tool_ok && global_ok) {
            return false;
        }

        if let Some(bucket) = buckets.get_mut(tool_name) {
            bucket.tokens -= 1.0;
        }
        if global.is_some() {
            if let Some(bucket) = buckets.get_mut(GLOBAL_KEY) {
                bucket.tokens -= 1.0;
            }
        }
        true
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}
