//! Shared bucket table.
//!
//! Keys are spread over a fixed set of shards, each a `Mutex<HashMap<..>>`. A key's whole
//! read-refill-check-decrement sequence runs under its shard's lock, so concurrent requests for
//! the same key cannot both spend the last token.
//!
//! The table is bounded: a shard that is full when a new key arrives drops idle buckets that have
//! refilled to capacity first, then a batch of its least-recently-seen buckets.

use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::rate_limit::bucket::Bucket;
use crate::rate_limit::config::RateLimitConfig;

const MAX_SHARDS: usize = 16;
const MIN_KEYS_PER_SHARD: usize = 64;
const EVICTION_BATCH_DIVISOR: usize = 64;

type Shard = Mutex<HashMap<String, Bucket>>;

/// In-memory key → bucket table. Clones share the same state.
#[derive(Clone, Debug)]
pub struct BucketTable {
    shards: Arc<[Shard]>,
    hasher: RandomState,
    per_shard_cap: usize,
}

impl BucketTable {
    /// Table sized for `max_keys` live buckets. Small tables use a single shard so that eviction
    /// is exact least-recently-seen.
    pub fn new(max_keys: usize) -> Self {
        let max_keys = max_keys.max(1);
        let shard_count = (max_keys / MIN_KEYS_PER_SHARD).clamp(1, MAX_SHARDS);
        let shards: Vec<Shard> = (0..shard_count).map(|_| Mutex::new(HashMap::new())).collect();
        Self {
            shards: shards.into(),
            hasher: RandomState::new(),
            per_shard_cap: (max_keys / shard_count).max(1),
        }
    }

    fn shard_for(&self, key: &str) -> &Shard {
        let mut hasher = self.hasher.build_hasher();
        key.hash(&mut hasher);
        let idx = (hasher.finish() as usize) % self.shards.len();
        &self.shards[idx]
    }

    // Bucket updates are plain field writes, so a panic elsewhere cannot leave one half-written.
    fn lock(shard: &Shard) -> MutexGuard<'_, HashMap<String, Bucket>> {
        shard.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` on the bucket for `key` while holding its shard lock, creating a full bucket first
    /// if the key is new.
    pub fn with_bucket<R>(
        &self,
        key: &str,
        cfg: &RateLimitConfig,
        now: u64,
        f: impl FnOnce(&mut Bucket) -> R,
    ) -> R {
        let mut map = Self::lock(self.shard_for(key));
        if let Some(bucket) = map.get_mut(key) {
            bucket.touch(now);
            return f(bucket);
        }
        if map.len() >= self.per_shard_cap {
            Self::make_room(&mut map, self.per_shard_cap, cfg, now);
        }
        let mut bucket = Bucket::full(cfg, now);
        let out = f(&mut bucket);
        map.insert(key.to_owned(), bucket);
        out
    }

    // Reclaimable buckets go first, then a least-recently-seen batch of at least one bucket and
    // about 1/EVICTION_BATCH_DIVISOR of the shard. Ties at the cutoff are all dropped.
    fn make_room(map: &mut HashMap<String, Bucket>, cap: usize, cfg: &RateLimitConfig, now: u64) {
        let before = map.len();
        map.retain(|_, bucket| !bucket.is_reclaimable(cfg, now));
        let idle_evicted = before - map.len();

        let mut lru_evicted = 0usize;
        if map.len() >= cap {
            let mut seen: Vec<u64> = map.values().map(Bucket::last_seen_millis).collect();
            let batch =
                (seen.len() + 1 - cap).max(cap / EVICTION_BATCH_DIVISOR).clamp(1, seen.len());
            let (_, cutoff, _) = seen.select_nth_unstable(batch - 1);
            let cutoff = *cutoff;
            let len = map.len();
            map.retain(|_, bucket| bucket.last_seen_millis() > cutoff);
            lru_evicted = len - map.len();
        }
        debug!(
            target: "taskgate::rate_limit",
            idle_evicted,
            lru_evicted,
            "bucket shard full; evicted"
        );
    }

    /// Copy of the bucket for `key`, if tracked. Does not refill or touch it.
    pub fn peek(&self, key: &str) -> Option<Bucket> {
        Self::lock(self.shard_for(key)).get(key).copied()
    }

    /// Drop every bucket that is idle past `cfg`'s retention and already refilled to capacity.
    /// Returns how many were dropped.
    pub fn purge_idle(&self, cfg: &RateLimitConfig, now: u64) -> usize {
        self.shards
            .iter()
            .map(|shard| {
                let mut map = Self::lock(shard);
                let before = map.len();
                map.retain(|_, bucket| !bucket.is_reclaimable(cfg, now));
                before - map.len()
            })
            .sum()
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| Self::lock(shard).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Upper bound on tracked keys.
    pub fn capacity(&self) -> usize {
        self.per_shard_cap * self.shards.len()
    }
}
