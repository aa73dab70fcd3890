use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time cache statistics.
///
/// Obtain them with [`Cache::stats`](crate::Cache::stats), or accumulate into an existing value
/// with [`Cache::update_stats`](crate::Cache::update_stats). Shards are read one after the other,
/// so under concurrent use the numbers are approximate.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Stats {
    /// Number of lookups, including `contains_key` and hits of `get_or_insert`.
    pub get_calls: u64,
    /// Number of stores, including updates of existing keys.
    pub set_calls: u64,
    pub misses: u64,
    /// Always `get_calls - misses`.
    pub hits: u64,
    /// Number of delete and remove calls, whether or not the key was present.
    pub deletes: u64,
    /// Number of entries dropped to make room for new ones.
    pub evictions: u64,
    pub entries_count: u64,
    pub max_entries: u64,
}

impl Stats {
    /// Zeroes all fields so the value can be reused with
    /// [`Cache::update_stats`](crate::Cache::update_stats).
    pub fn reset(&mut self) {
        *self = Stats::default();
    }
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    get_calls: AtomicU64,
    set_calls: AtomicU64,
    misses: AtomicU64,
    deletes: AtomicU64,
    evictions: AtomicU64,
}

impl Counters {
    pub(crate) fn increment_get_calls(&self) {
        self.get_calls.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn increment_set_calls(&self) {
        self.set_calls.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn increment_misses(&self) {
        self.misses.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn increment_deletes(&self) {
        self.deletes.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn increment_evictions(&self) {
        self.evictions.fetch_add(1, Ordering::AcqRel);
    }

    /// Adds the current counter values to `stats`.
    pub(crate) fn accumulate_into(&self, stats: &mut Stats) {
        stats.get_calls += self.get_calls.load(Ordering::Acquire);
        stats.set_calls += self.set_calls.load(Ordering::Acquire);
        stats.misses += self.misses.load(Ordering::Acquire);
        stats.deletes += self.deletes.load(Ordering::Acquire);
        stats.evictions += self.evictions.load(Ordering::Acquire);
    }

    pub(crate) fn reset(&self) {
        self.get_calls.store(0, Ordering::Release);
        self.set_calls.store(0, Ordering::Release);
        self.misses.store(0, Ordering::Release);
        self.deletes.store(0, Ordering::Release);
        self.evictions.store(0, Ordering::Release);
    }
}
