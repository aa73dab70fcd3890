use std::sync::atomic::{AtomicI64, Ordering};

/// Cache-wide count of resident entries, shared by all shards.
///
/// It is read and written outside of any shard lock. A shard decides whether to evict from a load
/// that may already be stale, so concurrent inserts into different shards can push the count past
/// the capacity by one per racing shard. The next insert that finds the cache full drains it back.
#[derive(Debug)]
pub(crate) struct Occupancy {
    live: AtomicI64,
    capacity: usize,
    limit: i64,
}

impl Occupancy {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            live: AtomicI64::new(0),
            capacity,
            limit: i64::try_from(capacity).unwrap_or(i64::MAX),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn is_full(&self) -> bool {
        self.live.load(Ordering::Acquire) >= self.limit
    }

    pub(crate) fn increment(&self) {
        self.live.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn decrement(&self) {
        self.live.fetch_sub(1, Ordering::AcqRel);
    }

    // A delete racing a clear can briefly drive the count below zero.
    pub(crate) fn len(&self) -> usize {
        usize::try_from(self.live.load(Ordering::Acquire)).unwrap_or(0)
    }

    pub(crate) fn reset(&self) {
        self.live.store(0, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_is_full_at_capacity() {
        // given
        let occupancy = Occupancy::new(2);
        occupancy.increment();
        assert!(!occupancy.is_full());

        // when
        occupancy.increment();

        // then
        assert!(occupancy.is_full());
        assert_eq!(occupancy.len(), 2);
    }

    #[test]
    fn it_never_reports_a_negative_len() {
        // given
        let occupancy = Occupancy::new(2);

        // when
        occupancy.decrement();

        // then
        assert_eq!(occupancy.len(), 0);
        assert!(!occupancy.is_full());
    }
}
