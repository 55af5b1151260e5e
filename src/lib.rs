#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # taskgate
//!
//! Per-client rate limiting and per-task access control for a multi-user task service.
//!
//! ## Features
//!
//! - **Token bucket limiter** keyed by client address, with lazy drift-free refill
//! - **Tower middleware** that answers `429 Too Many Requests` with `Retry-After`
//! - **Bounded memory**: idle and least-recently-seen buckets are evicted
//! - **Access resolver** mapping ownership and grants onto a fixed capability table
//!
//! ## Quick Start
//!
//! ```rust
//! use taskgate::access::{AccessLevel, AccessResolver, Action, InMemoryAccessStore, Resource};
//! use taskgate::{KeyedLimiter, RateLimitConfig, TokenBucketLimiter};
//!
//! #[tokio::main]
//! async fn main() {
//!     let limiter = TokenBucketLimiter::new(RateLimitConfig::default());
//!     assert!(limiter.admit("203.0.113.7").is_allowed());
//!
//!     let store = InMemoryAccessStore::new();
//!     store.insert_resource(Resource::new("task-1", "alice")).await;
//!     store.insert_principal("bob").await;
//!
//!     let resolver = AccessResolver::new(store);
//!     resolver.share_resource("alice", "task-1", "bob", AccessLevel::Viewer).await.unwrap();
//!     assert!(resolver.require("bob", "task-1", Action::View).await.is_ok());
//!     assert!(resolver.require("bob", "task-1", Action::Edit).await.is_err());
//! }
//! ```

pub mod access;
pub mod clock;
pub mod error;
pub mod rate_limit;

// Re-exports
pub use access::{AccessResolver, AccessStore, Action, EffectiveLevel};
pub use clock::{Clock, ManualClock, MonotonicClock, SystemClock};
pub use error::AccessError;
pub use rate_limit::{
    Decision, Enforcement, KeyedLimiter, RateLimitConfig, RateLimitConfigError, RateLimitLayer,
    RefillPolicy, TokenBucketLimiter,
};
