use crate::cache::RandomState;
use crate::cache::eviction_ring::EvictionRing;
use crate::cache::occupancy::Occupancy;
use crate::cache::stats::{Counters, Stats};
use parking_lot::RwLock;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};
use std::mem;

/// One independently locked partition of the key space.
///
/// The counters sit next to the lock rather than behind it so that lookups holding the lock in
/// shared mode can still record themselves.
#[derive(Debug)]
pub(crate) struct Shard<K, V, S = RandomState> {
    state: RwLock<State<K, V, S>>,
    counters: Counters,
}

#[derive(Debug)]
struct State<K, V, S> {
    entries: HashMap<K, V, S>,
    ring: EvictionRing<K>,
}

impl<K, V, S> Shard<K, V, S> {
    pub(crate) fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self::from_state(State {
            entries: HashMap::with_capacity_and_hasher(capacity, hash_builder),
            ring: EvictionRing::with_capacity(capacity),
        })
    }

    /// Creates a shard tracking up to `capacity` keys that allocates only as entries arrive.
    pub(crate) fn unallocated(capacity: usize, hash_builder: S) -> Self {
        Self::from_state(State {
            entries: HashMap::with_hasher(hash_builder),
            ring: EvictionRing::unallocated(capacity),
        })
    }

    fn from_state(state: State<K, V, S>) -> Self {
        Self {
            state: RwLock::new(state),
            counters: Counters::default(),
        }
    }

    pub(crate) fn accumulate_stats(&self, stats: &mut Stats) {
        self.counters.accumulate_into(stats);
    }

    /// Drops all entries, vacates the ring and zeroes the counters. The occupancy is left to the
    /// caller.
    pub(crate) fn clear(&self) {
        let mut state = self.state.write();
        state.entries.clear();
        state.ring.clear();
        self.counters.reset();
    }
}

impl<K, V, S> Shard<K, V, S>
where
    K: Clone + Eq + Hash,
    S: BuildHasher,
{
    pub(crate) fn insert(&self, key: K, value: V, occupancy: &Occupancy) -> Option<V> {
        self.counters.increment_set_calls();

        let mut state = self.state.write();

        // updates keep their place in the eviction order
        if let Some(existing) = state.entries.get_mut(&key) {
            return Some(mem::replace(existing, value));
        }

        state.insert_new(key, value, occupancy, &self.counters);
        None
    }

    pub(crate) fn get_or_insert(&self, key: K, value: V, occupancy: &Occupancy) -> (V, bool)
    where
        V: Clone,
    {
        let mut state = self.state.write();

        if let Some(existing) = state.entries.get(&key) {
            self.counters.increment_get_calls();
            return (existing.clone(), true);
        }

        self.counters.increment_set_calls();
        state.insert_new(key, value.clone(), occupancy, &self.counters);
        (value, false)
    }

    pub(crate) fn insert_if_absent(&self, key: K, value: V, occupancy: &Occupancy) -> bool {
        let mut state = self.state.write();

        if state.entries.contains_key(&key) {
            return false;
        }

        self.counters.increment_set_calls();
        state.insert_new(key, value, occupancy, &self.counters);
        true
    }

    pub(crate) fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: Clone,
    {
        let value = {
            let state = self.state.read();
            self.counters.increment_get_calls();
            state.entries.get(key).cloned()
        };

        if value.is_none() {
            self.counters.increment_misses();
        }

        value
    }

    pub(crate) fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let found = {
            let state = self.state.read();
            self.counters.increment_get_calls();
            state.entries.contains_key(key)
        };

        if !found {
            self.counters.increment_misses();
        }

        found
    }

    /// Removes the key from the map only. Its ring slot goes stale and is reconciled when the
    /// cursor reaches it.
    pub(crate) fn remove<Q>(&self, key: &Q, occupancy: &Occupancy) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.counters.increment_deletes();

        let mut state = self.state.write();
        let value = state.entries.remove(key);
        if value.is_some() {
            occupancy.decrement();
        }

        value
    }

    /// Copies the shard's current entries while holding the lock in shared mode.
    pub(crate) fn snapshot(&self) -> Vec<(K, V)>
    where
        V: Clone,
    {
        let state = self.state.read();
        state
            .entries
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

impl<K, V, S> State<K, V, S>
where
    K: Clone + Eq + Hash,
    S: BuildHasher,
{
    fn insert_new(&mut self, key: K, value: V, occupancy: &Occupancy, counters: &Counters) {
        self.make_room(occupancy, counters);

        self.ring.record(key.clone());
        self.entries.insert(key, value);
        occupancy.increment();
    }

    /// Evicts from this shard, oldest first, while the whole cache is full.
    ///
    /// At most one revolution of the ring is visited. When the pressure comes from other shards the
    /// loop may end without evicting anything, and the insert goes ahead over capacity.
    fn make_room(&mut self, occupancy: &Occupancy, counters: &Counters) {
        for _ in 0..self.ring.len() {
            if !occupancy.is_full() || self.entries.is_empty() {
                return;
            }

            if let Some(key) = self.ring.vacate() {
                if self.entries.remove(&key).is_some() {
                    occupancy.decrement();
                    counters.increment_evictions();

                    if !occupancy.is_full() {
                        // the new entry takes over the vacated slot
                        return;
                    }
                }
            }

            self.ring.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shard(capacity: usize) -> Shard<&'static str, u32> {
        Shard::with_capacity_and_hasher(capacity, RandomState::default())
    }

    fn evictions(shard: &Shard<&'static str, u32>) -> u64 {
        let mut stats = Stats::default();
        shard.accumulate_stats(&mut stats);
        stats.evictions
    }

    #[test]
    fn it_evicts_the_oldest_entry_when_full() {
        // given
        let occupancy = Occupancy::new(3);
        let shard = shard(3);
        shard.insert("a", 1, &occupancy);
        shard.insert("b", 2, &occupancy);
        shard.insert("c", 3, &occupancy);

        // when
        shard.insert("d", 4, &occupancy);
        shard.insert("e", 5, &occupancy);

        // then
        assert_eq!(shard.get("a"), None);
        assert_eq!(shard.get("b"), None);
        assert_eq!(shard.get("c"), Some(3));
        assert_eq!(shard.get("d"), Some(4));
        assert_eq!(shard.get("e"), Some(5));
        assert_eq!(occupancy.len(), 3);
        assert_eq!(evictions(&shard), 2);
    }

    #[test]
    fn it_updates_without_touching_the_eviction_order() {
        // given
        let occupancy = Occupancy::new(2);
        let shard = shard(2);
        shard.insert("a", 1, &occupancy);
        shard.insert("b", 2, &occupancy);

        // when
        let previous = shard.insert("a", 10, &occupancy);
        shard.insert("c", 3, &occupancy);

        // then
        assert_eq!(previous, Some(1));
        assert_eq!(shard.get("a"), None);
        assert_eq!(shard.get("b"), Some(2));
        assert_eq!(shard.get("c"), Some(3));
    }

    #[test]
    fn it_reconciles_stale_slots_lazily() {
        // given
        let occupancy = Occupancy::new(3);
        let shard = shard(3);
        shard.insert("a", 1, &occupancy);
        shard.insert("b", 2, &occupancy);
        shard.insert("c", 3, &occupancy);
        shard.remove("a", &occupancy);
        // another shard takes the freed capacity
        occupancy.increment();

        // when
        shard.insert("d", 4, &occupancy);

        // then
        assert_eq!(shard.get("b"), None);
        assert_eq!(shard.get("c"), Some(3));
        assert_eq!(shard.get("d"), Some(4));
        assert_eq!(evictions(&shard), 1);

        let state = shard.state.read();
        assert!(state.ring.slot(0).is_none());
        assert_eq!(state.ring.slot(1), Some(&"d"));
    }

    #[test]
    fn it_inserts_over_capacity_when_the_shard_is_empty() {
        // given
        let occupancy = Occupancy::new(2);
        occupancy.increment();
        occupancy.increment();
        let shard = shard(1);

        // when
        shard.insert("a", 1, &occupancy);

        // then
        assert_eq!(shard.get("a"), Some(1));
        assert_eq!(occupancy.len(), 3);
        assert_eq!(evictions(&shard), 0);
    }

    #[test]
    fn it_visits_at_most_one_revolution() {
        // given
        let occupancy = Occupancy::new(3);
        let shard = shard(2);
        shard.insert("a", 1, &occupancy);
        shard.insert("b", 2, &occupancy);
        // overwrites the slot of "a", which stays resident but untracked
        shard.insert("c", 3, &occupancy);
        shard.remove("b", &occupancy);
        shard.remove("c", &occupancy);
        occupancy.increment();
        occupancy.increment();

        // when
        shard.insert("d", 4, &occupancy);

        // then
        assert_eq!(shard.get("a"), Some(1));
        assert_eq!(shard.get("d"), Some(4));
        assert_eq!(occupancy.len(), 4);
        assert_eq!(evictions(&shard), 0);
    }

    #[test]
    fn it_counts_operations() {
        // given
        let occupancy = Occupancy::new(10);
        let shard = shard(10);

        // when
        shard.insert("a", 1, &occupancy);
        shard.insert("a", 2, &occupancy);
        shard.get("a");
        shard.get("b");
        shard.contains_key("b");
        shard.get_or_insert("a", 3, &occupancy);
        shard.get_or_insert("c", 3, &occupancy);
        shard.insert_if_absent("c", 4, &occupancy);
        shard.remove("z", &occupancy);

        // then
        let mut stats = Stats::default();
        shard.accumulate_stats(&mut stats);
        assert_eq!(stats.set_calls, 3);
        assert_eq!(stats.get_calls, 4);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.deletes, 1);
    }

    #[test]
    fn it_clears_entries_ring_and_counters() {
        // given
        let occupancy = Occupancy::new(2);
        let shard = shard(2);
        shard.insert("a", 1, &occupancy);
        shard.insert("b", 2, &occupancy);
        shard.insert("c", 3, &occupancy);

        // when
        shard.clear();

        // then
        assert!(shard.snapshot().is_empty());
        let mut stats = Stats::default();
        shard.accumulate_stats(&mut stats);
        assert_eq!(stats, Stats::default());
    }
}
