use crate::Stats;
use crate::error::Result;
use occupancy::Occupancy;
use shard::Shard;
use std::borrow::Borrow;
use std::hash::{BuildHasher, Hash};
use tracing::debug;

mod builder;
mod eviction_ring;
mod iter;
mod occupancy;
mod shard;
mod snapshot;
pub(crate) mod stats;

pub use builder::CacheBuilder;
pub use iter::Iter;

pub(crate) type RandomState = ahash::RandomState;

/// Thread-safe, sharded cache that holds a bounded number of entries and evicts the oldest first.
///
/// Keys are spread over independently locked shards. Each shard keeps its entries in a map and
/// remembers their insertion order in a fixed-size ring. The number of live entries is tracked by
/// a single counter shared by all shards: once it reaches the capacity, an insert of a new key
/// evicts the oldest entries of the shard it lands in. Reads and updates of existing keys do not
/// change the eviction order.
///
/// Because shards decide independently, inserts racing on different shards can push the number of
/// entries past the capacity by one per racing shard. The next insert into a full cache evicts the
/// excess.
///
/// Wrap the cache in a [`std::sync::Arc`] to share it between threads. All operations only require
/// shared references to the cache.
#[derive(Debug)]
pub struct Cache<K, V, S = RandomState> {
    hash_builder: S,
    shards: Box<[Shard<K, V, S>]>,
    occupancy: Occupancy,
}

impl<K, V> Cache<K, V, RandomState> {
    /// Creates a new cache holding at most `capacity` entries.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero. Use [`Cache::try_with_capacity`] to handle this as an error.
    pub fn with_capacity(capacity: usize) -> Cache<K, V, RandomState> {
        Cache::with_capacity_and_hasher(capacity, RandomState::default())
    }

    /// Creates a new cache holding at most `capacity` entries, failing on a zero capacity.
    pub fn try_with_capacity(capacity: usize) -> Result<Cache<K, V, RandomState>> {
        CacheBuilder::new(capacity).build()
    }

    /// Returns a builder to configure the shard layout and hasher of a new cache.
    pub fn builder(capacity: usize) -> CacheBuilder<K, V, RandomState> {
        CacheBuilder::new(capacity)
    }
}

impl<K, V, S> Cache<K, V, S>
where
    S: Clone,
{
    /// Creates a new cache holding at most `capacity` entries, using `hash_builder` to hash the
    /// keys.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Cache<K, V, S> {
        match CacheBuilder::new(capacity).hasher(hash_builder).build() {
            Ok(cache) => cache,
            Err(err) => panic!("cannot create cache: {err}"),
        }
    }

    pub(crate) fn from_parts(
        capacity: usize,
        shard_count: usize,
        hash_builder: S,
        preallocate: bool,
    ) -> Self {
        let capacity_per_shard = capacity.div_ceil(shard_count);

        let shards = (0..shard_count)
            .map(|_| {
                if preallocate {
                    Shard::with_capacity_and_hasher(capacity_per_shard, hash_builder.clone())
                } else {
                    Shard::unallocated(capacity_per_shard, hash_builder.clone())
                }
            })
            .collect();

        Self {
            hash_builder,
            shards,
            occupancy: Occupancy::new(capacity),
        }
    }
}

impl<K, V, S> Cache<K, V, S>
where
    K: Clone + Eq + Hash,
    S: BuildHasher,
{
    /// Inserts a key-value pair into the cache.
    ///
    /// If the cache did not have this key present, [`None`] is returned. When the cache is full,
    /// the oldest entries of the key's shard are evicted first.
    ///
    /// If the cache did have this key present, the value is replaced in place and the old value is
    /// returned. The entry keeps its original position in the eviction order.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.shard_for(&key).insert(key, value, &self.occupancy)
    }

    /// Returns the value corresponding to the key.
    ///
    /// This method clones the value when returning the item. Consider wrapping your values in
    /// [`std::sync::Arc`] if cloning is too expensive for your use-case.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: Clone,
    {
        self.shard_for(key).get(key)
    }

    /// Returns `true` if the cache contains the key. Counts as a lookup in the [`Stats`].
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.shard_for(key).contains_key(key)
    }

    /// Returns the value stored for `key`, inserting `value` first if the key is absent.
    ///
    /// The boolean is `true` if the value was already present and `false` if `value` was just
    /// stored. Lookup and insert happen atomically.
    pub fn get_or_insert(&self, key: K, value: V) -> (V, bool)
    where
        V: Clone,
    {
        self.shard_for(&key)
            .get_or_insert(key, value, &self.occupancy)
    }

    /// Inserts the pair only if the key is absent. Returns whether the value was stored.
    pub fn insert_if_absent(&self, key: K, value: V) -> bool {
        self.shard_for(&key)
            .insert_if_absent(key, value, &self.occupancy)
    }

    /// Removes the key from the cache, if present.
    pub fn delete<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.shard_for(key).remove(key, &self.occupancy);
    }

    /// Removes the key from the cache and returns its value, if present.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.shard_for(key).remove(key, &self.occupancy)
    }

    /// Returns an iterator over clones of all entries. See [`Iter`] for its consistency
    /// guarantees.
    pub fn iter(&self) -> Iter<'_, K, V, S>
    where
        V: Clone,
    {
        Iter::new(&self.shards)
    }

    pub fn keys(&self) -> impl Iterator<Item = K>
    where
        V: Clone,
    {
        self.iter().map(|(key, _)| key)
    }

    pub fn values(&self) -> impl Iterator<Item = V>
    where
        V: Clone,
    {
        self.iter().map(|(_, value)| value)
    }

    fn shard_for<Q>(&self, key: &Q) -> &Shard<K, V, S>
    where
        Q: ?Sized + Hash,
    {
        let hash = self.hash_builder.hash_one(key);
        // shard maps pick buckets from the low bits of the same hash
        let shard_idx = (hash >> 32) as usize % self.shards.len();
        &self.shards[shard_idx]
    }
}

impl<K, V, S> Cache<K, V, S> {
    /// Removes all entries and resets all statistics.
    ///
    /// Shards are cleared one after the other. An insert racing with `clear` may be dropped by it.
    pub fn clear(&self) {
        for shard in self.shards.iter() {
            shard.clear();
        }
        self.occupancy.reset();

        debug!(shards = self.shards.len(), "cache cleared");
    }

    /// Returns the number of entries in the cache.
    pub fn len(&self) -> usize {
        self.occupancy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the maximum number of entries the cache holds outside of concurrent races.
    pub fn capacity(&self) -> usize {
        self.occupancy.capacity()
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Adds the current statistics to `stats`.
    ///
    /// Counters are added to whatever `stats` already holds. Call [`Stats::reset`] first when
    /// reusing a value. `entries_count`, `hits` and `max_entries` are overwritten.
    pub fn update_stats(&self, stats: &mut Stats) {
        for shard in self.shards.iter() {
            shard.accumulate_stats(stats);
        }

        stats.entries_count = self.occupancy.len() as u64;
        stats.hits = stats.get_calls.saturating_sub(stats.misses);
        stats.max_entries = self.occupancy.capacity() as u64;
    }

    pub fn stats(&self) -> Stats {
        let mut stats = Stats::default();
        self.update_stats(&mut stats);
        stats
    }
}

impl<'a, K, V, S> IntoIterator for &'a Cache<K, V, S>
where
    K: Clone + Eq + Hash,
    V: Clone,
    S: BuildHasher,
{
    type Item = (K, V);
    type IntoIter = Iter<'a, K, V, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
