//! Validated limiter configuration.
//!
//! The policy is fixed once a limiter is built. Defaults match the login/sharing endpoints:
//! a burst of 100 requests, refilled at 16 tokens every 10 seconds (about 100 per minute).

use std::time::Duration;

/// Default bucket capacity.
pub const DEFAULT_CAPACITY: u32 = 100;
/// Default refill tick.
pub const DEFAULT_REFILL_INTERVAL: Duration = Duration::from_secs(10);
/// Default tokens restored per tick.
pub const DEFAULT_TOKENS_PER_INTERVAL: u32 = 16;
/// Default idle time after which a bucket may be evicted.
pub const DEFAULT_IDLE_RETENTION: Duration = Duration::from_secs(10 * 60);
/// Default soft cap on tracked client keys.
pub const DEFAULT_MAX_KEYS: usize = 100_000;

/// Environment variable consulted by [`Enforcement::from_env`].
pub const MODE_ENV_VAR: &str = "TASKGATE_ENV";
const PRODUCTION_MODE: &str = "production";

/// How `last_refill` advances after whole ticks are credited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefillPolicy {
    /// Advance by exactly `n * refill_interval`; partial-tick progress carries over.
    #[default]
    DriftFree,
    /// Jump to `now`; partial-tick progress is discarded.
    ResetToNow,
}

/// Whether the limiter enforces its budget or lets everything through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Enforcement {
    /// Normal operation.
    #[default]
    Enforce,
    /// Non-production pass-through. No buckets are created.
    Bypass,
}

impl Enforcement {
    /// `Enforce` only when [`MODE_ENV_VAR`] is `production`.
    pub fn from_env() -> Self {
        Self::from_env_value(std::env::var(MODE_ENV_VAR).ok().as_deref())
    }

    /// Pure form of [`Enforcement::from_env`].
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case(PRODUCTION_MODE) => Enforcement::Enforce,
            _ => Enforcement::Bypass,
        }
    }

    pub fn is_bypass(self) -> bool {
        matches!(self, Enforcement::Bypass)
    }
}

/// Errors produced when validating limiter configuration.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RateLimitConfigError {
    /// Capacity must be > 0.
    #[error("capacity must be > 0 (got {provided})")]
    InvalidCapacity {
        /// Value provided by caller.
        provided: u32,
    },
    /// Refill interval must be at least one millisecond.
    #[error("refill_interval must be >= 1ms (got {0:?})")]
    InvalidRefillInterval(Duration),
    /// Tokens per interval must be > 0.
    #[error("tokens_per_interval must be > 0 (got {provided})")]
    InvalidTokensPerInterval {
        /// Value provided by caller.
        provided: u32,
    },
    /// Key cap must be > 0.
    #[error("max_keys must be > 0 (got {provided})")]
    InvalidMaxKeys {
        /// Value provided by caller.
        provided: usize,
    },
}

/// Validated configuration for [`TokenBucketLimiter`](crate::rate_limit::strategies::TokenBucketLimiter).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    capacity: u32,
    refill_interval_millis: u64,
    tokens_per_interval: u32,
    refill_policy: RefillPolicy,
    idle_retention: Duration,
    max_keys: usize,
    enforcement: Enforcement,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            refill_interval_millis: DEFAULT_REFILL_INTERVAL.as_millis() as u64,
            tokens_per_interval: DEFAULT_TOKENS_PER_INTERVAL,
            refill_policy: RefillPolicy::default(),
            idle_retention: DEFAULT_IDLE_RETENTION,
            max_keys: DEFAULT_MAX_KEYS,
            enforcement: Enforcement::default(),
        }
    }
}

impl RateLimitConfig {
    /// Create a config with validation; other settings take their defaults.
    ///
    /// # Examples
    /// ```
    /// use taskgate::rate_limit::RateLimitConfig;
    /// use std::time::Duration;
    /// let cfg = RateLimitConfig::new(100, Duration::from_secs(10), 16).unwrap();
    /// assert_eq!(cfg.capacity(), 100);
    /// ```
    pub fn new(
        capacity: u32,
        refill_interval: Duration,
        tokens_per_interval: u32,
    ) -> Result<Self, RateLimitConfigError> {
        Self::builder()
            .capacity(capacity)
            .refill_interval(refill_interval)
            .tokens_per_interval(tokens_per_interval)
            .build()
    }

    pub fn builder() -> RateLimitConfigBuilder {
        RateLimitConfigBuilder::default()
    }

    /// Maximum tokens a bucket can hold.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Duration of one refill tick.
    pub fn refill_interval(&self) -> Duration {
        Duration::from_millis(self.refill_interval_millis)
    }

    pub(crate) fn refill_interval_millis(&self) -> u64 {
        self.refill_interval_millis
    }

    /// Tokens restored per elapsed tick.
    pub fn tokens_per_interval(&self) -> u32 {
        self.tokens_per_interval
    }

    pub fn refill_policy(&self) -> RefillPolicy {
        self.refill_policy
    }

    pub fn idle_retention(&self) -> Duration {
        self.idle_retention
    }

    pub fn max_keys(&self) -> usize {
        self.max_keys
    }

    pub fn enforcement(&self) -> Enforcement {
        self.enforcement
    }

    /// Same policy with a different enforcement switch.
    pub fn with_enforcement(mut self, enforcement: Enforcement) -> Self {
        self.enforcement = enforcement;
        self
    }

    fn validate(&self) -> Result<(), RateLimitConfigError> {
        if self.capacity == 0 {
            return Err(RateLimitConfigError::InvalidCapacity { provided: 0 });
        }
        if self.refill_interval_millis == 0 {
            return Err(RateLimitConfigError::InvalidRefillInterval(self.refill_interval()));
        }
        if self.tokens_per_interval == 0 {
            return Err(RateLimitConfigError::InvalidTokensPerInterval { provided: 0 });
        }
        if self.max_keys == 0 {
            return Err(RateLimitConfigError::InvalidMaxKeys { provided: 0 });
        }
        Ok(())
    }
}

/// Builder for [`RateLimitConfig`]. Unset fields keep their defaults.
#[derive(Debug, Clone, Default)]
pub struct RateLimitConfigBuilder {
    inner: RateLimitConfig,
    refill_interval: Option<Duration>,
}

impl RateLimitConfigBuilder {
    pub fn capacity(mut self, capacity: u32) -> Self {
        self.inner.capacity = capacity;
        self
    }

    /// Sub-millisecond precision is truncated.
    pub fn refill_interval(mut self, interval: Duration) -> Self {
        self.refill_interval = Some(interval);
        self
    }

    pub fn tokens_per_interval(mut self, tokens: u32) -> Self {
        self.inner.tokens_per_interval = tokens;
        self
    }

    pub fn refill_policy(mut self, policy: RefillPolicy) -> Self {
        self.inner.refill_policy = policy;
        self
    }

    pub fn idle_retention(mut self, retention: Duration) -> Self {
        self.inner.idle_retention = retention;
        self
    }

    pub fn max_keys(mut self, max_keys: usize) -> Self {
        self.inner.max_keys = max_keys;
        self
    }

    pub fn enforcement(mut self, enforcement: Enforcement) -> Self {
        self.inner.enforcement = enforcement;
        self
    }

    pub fn build(self) -> Result<RateLimitConfig, RateLimitConfigError> {
        let mut cfg = self.inner;
        if let Some(interval) = self.refill_interval {
            let millis = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
            if millis == 0 {
                return Err(RateLimitConfigError::InvalidRefillInterval(interval));
            }
            cfg.refill_interval_millis = millis;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}
