use crate::cache::RandomState;
use crate::cache::shard::Shard;
use std::hash::{BuildHasher, Hash};
use std::iter::FusedIterator;
use std::vec;

/// Iterator over the entries of a [`Cache`](crate::Cache), created by
/// [`Cache::iter`](crate::Cache::iter).
///
/// Shards are copied one at a time, under that shard's read lock, when the iterator reaches them.
/// Each shard's entries are therefore a consistent copy, but entries inserted into or removed from
/// other shards while iterating may or may not be seen. Dropping the iterator stops the walk
/// without copying the remaining shards. Entries come out in no particular order.
pub struct Iter<'a, K, V, S = RandomState> {
    shards: &'a [Shard<K, V, S>],
    next_shard: usize,
    current: vec::IntoIter<(K, V)>,
}

impl<'a, K, V, S> Iter<'a, K, V, S> {
    pub(crate) fn new(shards: &'a [Shard<K, V, S>]) -> Self {
        Self {
            shards,
            next_shard: 0,
            current: Vec::new().into_iter(),
        }
    }
}

impl<K, V, S> Iterator for Iter<'_, K, V, S>
where
    K: Clone + Eq + Hash,
    V: Clone,
    S: BuildHasher,
{
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.current.next() {
                return Some(entry);
            }

            let shard = self.shards.get(self.next_shard)?;
            self.next_shard += 1;
            self.current = shard.snapshot().into_iter();
        }
    }
}

impl<K, V, S> FusedIterator for Iter<'_, K, V, S>
where
    K: Clone + Eq + Hash,
    V: Clone,
    S: BuildHasher,
{
}
