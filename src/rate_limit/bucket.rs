//! Per-key token bucket state and its refill/consume arithmetic.
//!
//! Time only advances when a request arrives: every call refills first, then checks.

use crate::rate_limit::config::{RateLimitConfig, RefillPolicy};

/// Admission-control state for one client key.
///
/// `tokens` stays within `0..=capacity` for the config it was created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    tokens: u32,
    last_refill_millis: u64,
    last_seen_millis: u64,
}

impl Bucket {
    /// A full bucket created at `now`.
    pub fn full(cfg: &RateLimitConfig, now: u64) -> Self {
        Self { tokens: cfg.capacity(), last_refill_millis: now, last_seen_millis: now }
    }

    pub fn tokens(&self) -> u32 {
        self.tokens
    }

    pub fn last_refill_millis(&self) -> u64 {
        self.last_refill_millis
    }

    pub fn last_seen_millis(&self) -> u64 {
        self.last_seen_millis
    }

    /// Credit whole elapsed ticks, capped at capacity.
    ///
    /// A clock that reads earlier than `last_refill` is treated as zero elapsed time.
    pub fn refill(&mut self, cfg: &RateLimitConfig, now: u64) {
        let interval = cfg.refill_interval_millis();
        let elapsed = now.saturating_sub(self.last_refill_millis);
        if elapsed < interval {
            return;
        }
        let ticks = elapsed / interval;
        let credit = ticks.saturating_mul(u64::from(cfg.tokens_per_interval()));
        let refilled = u64::from(self.tokens).saturating_add(credit).min(u64::from(cfg.capacity()));
        // capped at capacity, which is a u32
        self.tokens = refilled as u32;
        self.last_refill_millis = match cfg.refill_policy() {
            RefillPolicy::DriftFree => self.last_refill_millis + ticks * interval,
            RefillPolicy::ResetToNow => now,
        };
    }

    /// Take one token. Returns the remaining count, or `None` when empty (state untouched).
    pub fn try_consume(&mut self) -> Option<u32> {
        if self.tokens == 0 {
            return None;
        }
        self.tokens -= 1;
        Some(self.tokens)
    }

    /// Milliseconds until the next whole tick lands, at least 1.
    pub fn millis_until_next_tick(&self, cfg: &RateLimitConfig, now: u64) -> u64 {
        let elapsed = now.saturating_sub(self.last_refill_millis);
        cfg.refill_interval_millis().saturating_sub(elapsed).max(1)
    }

    pub(crate) fn touch(&mut self, now: u64) {
        self.last_seen_millis = self.last_seen_millis.max(now);
    }

    pub(crate) fn idle_for(&self, now: u64) -> u64 {
        now.saturating_sub(self.last_seen_millis)
    }

    /// Whether dropping this bucket is invisible to its client: idle for at least the configured
    /// retention and refilled to capacity by `now`, so a recreated bucket admits the same burst.
    pub(crate) fn is_reclaimable(&self, cfg: &RateLimitConfig, now: u64) -> bool {
        let retention = u64::try_from(cfg.idle_retention().as_millis()).unwrap_or(u64::MAX);
        if self.idle_for(now) < retention {
            return false;
        }
        let mut projected = *self;
        projected.refill(cfg, now);
        projected.tokens == cfg.capacity()
    }
}
