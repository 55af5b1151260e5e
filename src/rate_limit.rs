//! Rate limiting primitives.
//!
//! This module provides the building blocks for per-client admission control:
//! - [`KeyedLimiter`]: The core trait for admit/deny logic.
//! - [`RateLimitLayer`]: Tower middleware that answers `429` for denied clients.
//! - [`Decision`]: The result of a check (Allowed/Denied).
//!
//! # Architecture
//!
//! - **Middleware**: `RateLimitLayer` wraps your HTTP service. It derives the client key from
//!   proxy headers (see [`key`]) and asks a `KeyedLimiter`; it doesn't know *how* limiting works.
//! - **Logic**: [`TokenBucketLimiter`] (in `strategies`) does the refill/consume math from
//!   [`bucket`].
//! - **Storage**: [`BucketTable`] (in `store`) holds the per-key state behind sharded locks and
//!   keeps its size bounded.

use std::time::Duration;

pub mod bucket;
pub mod config;
pub mod key;
pub mod middleware;
pub mod store;
pub mod strategies;

pub use config::{Enforcement, RateLimitConfig, RateLimitConfigError, RefillPolicy};
pub use key::client_key;
pub use middleware::{RateLimitLayer, RateLimitService};
pub use store::BucketTable;
pub use strategies::TokenBucketLimiter;

/// The decision returned by a rate limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The request is allowed to proceed.
    Allowed {
        /// Tokens left after this request.
        /// Useful for `X-RateLimit-Remaining` headers.
        remaining: u32,
    },
    /// The request is denied.
    Denied {
        /// Time until the next refill tick.
        /// Useful for `Retry-After` headers.
        retry_after: Duration,
    },
}

impl Decision {
    /// Helper to check if allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }

    /// Helper to check if denied.
    pub fn is_denied(&self) -> bool {
        !self.is_allowed()
    }
}

/// Core interface for keyed admission control.
///
/// Implementations never fail: an unknown key is just a new key. Calls do no I/O and never block
/// for longer than a short critical section, so they are safe inside async handlers.
pub trait KeyedLimiter: Send + Sync {
    /// Decide whether one more request from `key` may proceed, consuming budget if so.
    fn admit(&self, key: &str) -> Decision;
}

impl<L: KeyedLimiter + ?Sized> KeyedLimiter for std::sync::Arc<L> {
    fn admit(&self, key: &str) -> Decision {
        (**self).admit(key)
    }
}
