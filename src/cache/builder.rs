use crate::cache::{Cache, RandomState};
use crate::error::{Error, Result};
use std::marker::PhantomData;
use std::num::NonZero;
use std::{cmp, thread};

/// Minimum ring depth of the default shard layout.
const MIN_ENTRIES_PER_SHARD: usize = 64;

/// Configures and creates a [`Cache`].
///
/// ```rust
/// use fifo_cache::Cache;
///
/// let cache = Cache::builder(10_000).shards(16).build().unwrap();
/// cache.insert("key1", "value1");
///
/// assert_eq!(cache.shard_count(), 16);
/// assert_eq!(cache.get("key1"), Some("value1"));
/// ```
#[derive(Clone, Debug)]
pub struct CacheBuilder<K, V, S = RandomState> {
    capacity: usize,
    shards: Option<usize>,
    hash_builder: S,
    preallocate: bool,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> CacheBuilder<K, V, RandomState> {
    pub fn new(capacity: usize) -> CacheBuilder<K, V, RandomState> {
        CacheBuilder {
            capacity,
            shards: None,
            hash_builder: RandomState::default(),
            preallocate: true,
            _marker: PhantomData,
        }
    }
}

impl<K, V, S> CacheBuilder<K, V, S> {
    /// Sets the number of shards.
    ///
    /// By default a cache gets four shards per available CPU, but never so many that a shard would
    /// track fewer than 64 entries. Each shard's eviction ring holds `capacity / shards` keys,
    /// rounded up.
    pub fn shards(mut self, shards: usize) -> Self {
        self.shards = Some(shards);
        self
    }

    /// Uses `hash_builder` both to route keys to shards and to hash keys within a shard.
    pub fn hasher<T>(self, hash_builder: T) -> CacheBuilder<K, V, T> {
        CacheBuilder {
            capacity: self.capacity,
            shards: self.shards,
            hash_builder,
            preallocate: self.preallocate,
            _marker: PhantomData,
        }
    }

    /// Whether shards reserve room for their full share of the capacity up front. Without it, maps
    /// and rings grow as entries arrive.
    pub(crate) fn preallocate(mut self, preallocate: bool) -> Self {
        self.preallocate = preallocate;
        self
    }

    pub fn build(self) -> Result<Cache<K, V, S>>
    where
        S: Clone,
    {
        if self.capacity == 0 {
            return Err(Error::InvalidCapacity);
        }

        let shard_count = match self.shards {
            Some(0) => return Err(Error::InvalidShardCount),
            Some(shards) => shards,
            None => default_shard_count(self.capacity),
        };

        Ok(Cache::from_parts(
            self.capacity,
            shard_count,
            self.hash_builder,
            self.preallocate,
        ))
    }
}

fn default_shard_count(capacity: usize) -> usize {
    let available_parallelism = thread::available_parallelism()
        .map(NonZero::get)
        .unwrap_or(1);

    cmp::min(
        available_parallelism * 4,
        capacity.div_ceil(MIN_ENTRIES_PER_SHARD),
    )
}
