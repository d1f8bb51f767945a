//! Per-platform outbound rate limiting.
//!
//! Token bucket with lazy refill: tokens accrue continuously at
//! `rate_limit_rpm / 60` per second, computed from elapsed time at each
//! acquire. Bucket state is the only shared mutable resource in the
//! dispatch path and lives behind a poisoning-tolerant mutex.

use std::sync::Mutex;
use std::time::Instant;

use crate::models::{Platform, Priority};

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket for one platform.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    refill_per_second: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Create a bucket holding at most one minute's worth of messages.
    #[must_use]
    pub fn new(rate_limit_rpm: u32) -> Self {
        let capacity = f64::from(rate_limit_rpm.max(1));
        Self {
            capacity,
            refill_per_second: capacity / 60.0,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Try to consume one token. Non-blocking.
    pub fn try_acquire(&self) -> bool {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Self::refill(&mut state, self.capacity, self.refill_per_second);
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Whole tokens currently available.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn available(&self) -> u64 {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Self::refill(&mut state, self.capacity, self.refill_per_second);
        state.tokens as u64
    }

    fn refill(state: &mut BucketState, capacity: f64, refill_per_second: f64) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        if elapsed > 0.0 {
            state.tokens = (state.tokens + elapsed * refill_per_second).min(capacity);
            state.last_refill = now;
        }
    }
}

/// Admission control for outbound deliveries, keyed by platform.
#[derive(Debug)]
pub struct RateLimiter {
    slack: TokenBucket,
    teams: TokenBucket,
}

impl RateLimiter {
    /// Build buckets from the configured per-platform rates.
    #[must_use]
    pub fn new(slack_rpm: u32, teams_rpm: u32) -> Self {
        Self {
            slack: TokenBucket::new(slack_rpm),
            teams: TokenBucket::new(teams_rpm),
        }
    }

    fn bucket(&self, platform: Platform) -> &TokenBucket {
        match platform {
            Platform::Slack => &self.slack,
            Platform::Teams => &self.teams,
        }
    }

    /// Non-blocking admission check for one delivery.
    ///
    /// Critical payloads are admitted unconditionally and do not consume
    /// tokens — a reliability signal must not be dropped because of noise
    /// from lower-priority traffic.
    pub fn try_acquire(&self, platform: Platform, priority: Priority) -> bool {
        if priority.bypasses_rate_limit() {
            return true;
        }
        self.bucket(platform).try_acquire()
    }

    /// Whole tokens currently available for a platform.
    #[must_use]
    pub fn available(&self, platform: Platform) -> u64 {
        self.bucket(platform).available()
    }
}
