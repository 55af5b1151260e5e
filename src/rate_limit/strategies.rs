use crate::clock::{Clock, MonotonicClock};
use crate::rate_limit::config::RateLimitConfig;
use crate::rate_limit::store::BucketTable;
use crate::rate_limit::{Decision, KeyedLimiter};
use std::sync::Arc;
use std::time::Duration;

/// A per-key token bucket limiter.
///
/// Each key gets `capacity` tokens up front and `tokens_per_interval` more for every whole
/// `refill_interval` that passes, never exceeding `capacity`. Refill is computed lazily on each
/// call; there is no background task.
///
/// Clones share the same bucket table.
#[derive(Debug, Clone)]
pub struct TokenBucketLimiter {
    config: RateLimitConfig,
    table: BucketTable,
    clock: Arc<dyn Clock>,
}

impl TokenBucketLimiter {
    /// Create a limiter for `config`, reading time from a monotonic clock.
    pub fn new(config: RateLimitConfig) -> Self {
        let table = BucketTable::new(config.max_keys());
        tracing::info!(
            target: "taskgate::rate_limit",
            capacity = config.capacity(),
            refill_interval_ms = config.refill_interval().as_millis() as u64,
            tokens_per_interval = config.tokens_per_interval(),
            bypass = config.enforcement().is_bypass(),
            "token bucket limiter configured"
        );
        Self { config, table, clock: Arc::new(MonotonicClock::default()) }
    }

    /// Override the clock (useful for deterministic tests).
    ///
    /// # Example
    /// ```
    /// use taskgate::clock::ManualClock;
    /// use taskgate::rate_limit::{KeyedLimiter, RateLimitConfig, TokenBucketLimiter};
    /// use std::time::Duration;
    /// let clock = ManualClock::new();
    /// let cfg = RateLimitConfig::new(1, Duration::from_secs(1), 1).unwrap();
    /// let limiter = TokenBucketLimiter::new(cfg).with_clock(clock.clone());
    /// assert!(limiter.admit("k").is_allowed());
    /// assert!(limiter.admit("k").is_denied());
    /// clock.advance(1_000);
    /// assert!(limiter.admit("k").is_allowed());
    /// ```
    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Number of client keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.table.len()
    }

    /// Tokens the next call for `key` would see after refill, without consuming.
    /// `None` if the key is not tracked.
    pub fn available(&self, key: &str) -> Option<u32> {
        let now = self.clock.now_millis();
        self.table.peek(key).map(|mut bucket| {
            bucket.refill(&self.config, now);
            bucket.tokens()
        })
    }

    /// Drop buckets idle for longer than the configured retention that have also refilled to
    /// capacity. A drained client is never forgotten early. Returns how many were dropped.
    pub fn purge_idle(&self) -> usize {
        let evicted = self.table.purge_idle(&self.config, self.clock.now_millis());
        if evicted > 0 {
            tracing::debug!(target: "taskgate::rate_limit", evicted, "purged idle buckets");
        }
        evicted
    }
}

impl KeyedLimiter for TokenBucketLimiter {
    fn admit(&self, key: &str) -> Decision {
        if self.config.enforcement().is_bypass() {
            return Decision::Allowed { remaining: self.config.capacity() };
        }

        let now = self.clock.now_millis();
        let cfg = &self.config;
        self.table.with_bucket(key, cfg, now, |bucket| {
            bucket.refill(cfg, now);
            match bucket.try_consume() {
                Some(remaining) => Decision::Allowed { remaining },
                None => {
                    let wait = bucket.millis_until_next_tick(cfg, now);
                    tracing::trace!(target: "taskgate::rate_limit", wait_ms = wait, "denied");
                    Decision::Denied { retry_after: Duration::from_millis(wait) }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::rate_limit::config::{Enforcement, RefillPolicy};

    fn limiter(capacity: u32, interval_ms: u64, per_tick: u32) -> (TokenBucketLimiter, ManualClock) {
        let clock = ManualClock::new();
        let cfg = RateLimitConfig::new(capacity, Duration::from_millis(interval_ms), per_tick)
            .expect("valid config");
        (TokenBucketLimiter::new(cfg).with_clock(clock.clone()), clock)
    }

    #[test]
    fn remaining_counts_down() {
        let (limiter, _clock) = limiter(3, 1_000, 1);
        assert_eq!(limiter.admit("a"), Decision::Allowed { remaining: 2 });
        assert_eq!(limiter.admit("a"), Decision::Allowed { remaining: 1 });
        assert_eq!(limiter.admit("a"), Decision::Allowed { remaining: 0 });
        assert!(limiter.admit("a").is_denied());
    }

    #[test]
    fn keys_are_independent() {
        let (limiter, _clock) = limiter(1, 1_000, 1);
        assert!(limiter.admit("a").is_allowed());
        assert!(limiter.admit("a").is_denied());
        assert!(limiter.admit("b").is_allowed());
        assert_eq!(limiter.tracked_keys(), 2);
    }

    #[test]
    fn denial_reports_time_to_next_tick() {
        let (limiter, clock) = limiter(1, 1_000, 1);
        limiter.admit("a");
        clock.advance(300);
        assert_eq!(limiter.admit("a"), Decision::Denied { retry_after: Duration::from_millis(700) });
    }

    #[test]
    fn denial_does_not_consume_or_reset_progress() {
        let (limiter, clock) = limiter(2, 1_000, 1);
        limiter.admit("a");
        limiter.admit("a");
        for _ in 0..5 {
            clock.advance(100);
            assert!(limiter.admit("a").is_denied());
        }
        clock.advance(500);
        assert_eq!(limiter.admit("a"), Decision::Allowed { remaining: 0 });
    }

    #[test]
    fn available_peeks_without_consuming() {
        let (limiter, clock) = limiter(4, 1_000, 2);
        assert_eq!(limiter.available("a"), None);
        for _ in 0..4 {
            limiter.admit("a");
        }
        assert_eq!(limiter.available("a"), Some(0));
        clock.advance(1_000);
        assert_eq!(limiter.available("a"), Some(2));
        assert_eq!(limiter.available("a"), Some(2));
    }

    #[test]
    fn bypass_admits_without_tracking() {
        let cfg = RateLimitConfig::builder()
            .capacity(1)
            .enforcement(Enforcement::Bypass)
            .build()
            .unwrap();
        let limiter = TokenBucketLimiter::new(cfg);
        for _ in 0..10 {
            assert!(limiter.admit("a").is_allowed());
        }
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[test]
    fn purge_idle_uses_configured_retention() {
        let clock = ManualClock::new();
        let cfg = RateLimitConfig::builder()
            .idle_retention(Duration::from_secs(60))
            .refill_policy(RefillPolicy::ResetToNow)
            .build()
            .unwrap();
        let limiter = TokenBucketLimiter::new(cfg).with_clock(clock.clone());
        limiter.admit("stale");
        clock.advance(30_000);
        limiter.admit("recent");
        clock.advance(30_000);
        assert_eq!(limiter.purge_idle(), 1);
        assert_eq!(limiter.available("stale"), None);
        assert!(limiter.available("recent").is_some());
    }

    #[test]
    fn clones_share_buckets() {
        let (limiter, _clock) = limiter(1, 1_000, 1);
        let other = limiter.clone();
        assert!(limiter.admit("a").is_allowed());
        assert!(other.admit("a").is_denied());
    }
}
