/// Fixed-size circular record of the order in which keys entered a shard.
///
/// Slots are reused in wraparound fashion. A slot holding `None` was vacated by an eviction (or
/// never used). Deletes do not touch the ring, so a slot may still name a key that is gone from the
/// shard's map; such slots are reconciled when the cursor next passes over them.
///
/// Slots past the end of `slots` have never been written and read as `None`.
#[derive(Debug)]
pub(crate) struct EvictionRing<K> {
    cursor: usize,
    len: usize,
    slots: Vec<Option<K>>,
}

impl<K> EvictionRing<K> {
    /// Creates a ring with `len` slots and reserves memory for all of them. A ring always has at
    /// least one slot.
    pub(crate) fn with_capacity(len: usize) -> EvictionRing<K> {
        let len = len.max(1);
        EvictionRing {
            cursor: 0,
            len,
            slots: Vec::with_capacity(len),
        }
    }

    /// Creates a ring with `len` slots that allocates them as keys are recorded.
    pub(crate) fn unallocated(len: usize) -> EvictionRing<K> {
        EvictionRing {
            cursor: 0,
            len: len.max(1),
            slots: Vec::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Empties the slot under the cursor and returns the key it recorded. The cursor stays put.
    pub(crate) fn vacate(&mut self) -> Option<K> {
        self.slots.get_mut(self.cursor).and_then(Option::take)
    }

    pub(crate) fn advance(&mut self) {
        self.cursor = self.wrap_add(self.cursor, 1);
    }

    /// Records `key` under the cursor and moves the cursor to the next slot.
    ///
    /// Whatever the slot held before is overwritten and returned. If that key is still resident in
    /// the shard it is no longer tracked for eviction.
    pub(crate) fn record(&mut self, key: K) -> Option<K> {
        if self.cursor >= self.slots.len() {
            self.slots.resize_with(self.cursor + 1, || None);
        }
        let overwritten = self.slots[self.cursor].replace(key);
        self.advance();
        overwritten
    }

    /// Vacates every slot and rewinds the cursor.
    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.cursor = 0;
    }

    #[cfg(test)]
    pub(crate) fn slot(&self, idx: usize) -> Option<&K> {
        self.slots.get(idx).and_then(Option::as_ref)
    }

    fn wrap_add(&self, idx: usize, addend: usize) -> usize {
        let idx = idx.wrapping_add(addend);
        if idx >= self.len { idx - self.len } else { idx }
    }
}

#[cfg(test)]
mod tests {
    use crate::cache::eviction_ring::EvictionRing;

    #[test]
    fn it_has_at_least_one_slot() {
        // when
        let ring: EvictionRing<String> = EvictionRing::with_capacity(0);

        // then
        assert_eq!(ring.len(), 1);
    }

    #[test]
    fn it_records_at_the_cursor_and_advances() {
        // given
        let mut ring = EvictionRing::with_capacity(3);

        // when
        let first = ring.record(String::from("first"));
        let second = ring.record(String::from("second"));

        // then
        assert!(first.is_none());
        assert!(second.is_none());
        assert_eq!(ring.cursor, 2);
        assert_eq!(ring.slots[0].as_deref(), Some("first"));
        assert_eq!(ring.slots[1].as_deref(), Some("second"));
    }

    #[test]
    fn it_wraps_around_and_overwrites_the_oldest_slot() {
        // given
        let mut ring = EvictionRing::with_capacity(2);
        ring.record(String::from("first"));
        ring.record(String::from("second"));

        // slots   [first second]
        // cursor   |
        assert_eq!(ring.cursor, 0);

        // when
        let overwritten = ring.record(String::from("third"));

        // then

        // slots   [third second]
        // cursor         |
        assert_eq!(overwritten.as_deref(), Some("first"));
        assert_eq!(ring.cursor, 1);
        assert_eq!(ring.slots[0].as_deref(), Some("third"));
    }

    #[test]
    fn it_vacates_without_moving_the_cursor() {
        // given
        let mut ring = EvictionRing::with_capacity(3);
        ring.record(String::from("first"));
        ring.record(String::from("second"));
        ring.record(String::from("third"));

        // when
        let vacated = ring.vacate();

        // then
        assert_eq!(vacated.as_deref(), Some("first"));
        assert_eq!(ring.cursor, 0);
        assert!(ring.slots[0].is_none());
        assert!(ring.vacate().is_none());
    }

    #[test]
    fn it_reuses_a_vacated_slot() {
        // given
        let mut ring = EvictionRing::with_capacity(2);
        ring.record(String::from("first"));
        ring.record(String::from("second"));
        ring.vacate();

        // when
        let overwritten = ring.record(String::from("third"));

        // then
        assert!(overwritten.is_none());
        assert_eq!(ring.slots[0].as_deref(), Some("third"));
        assert_eq!(ring.slots[1].as_deref(), Some("second"));
    }

    #[test]
    fn it_clears_all_slots_and_rewinds() {
        // given
        let mut ring = EvictionRing::with_capacity(3);
        ring.record(String::from("first"));
        ring.record(String::from("second"));

        // when
        ring.clear();

        // then
        assert_eq!(ring.cursor, 0);
        assert_eq!(ring.len(), 3);
        assert!(ring.slot(0).is_none());
        assert!(ring.slot(1).is_none());
    }

    #[test]
    fn it_allocates_slots_only_when_recording() {
        // given
        let mut ring = EvictionRing::unallocated(usize::MAX / 2);

        // when
        ring.record(String::from("first"));

        // then
        assert_eq!(ring.len(), usize::MAX / 2);
        assert_eq!(ring.slots.len(), 1);
        assert_eq!(ring.slot(0).map(String::as_str), Some("first"));
    }

    #[test]
    fn it_records_past_slots_that_were_never_written() {
        // given
        let mut ring = EvictionRing::unallocated(4);
        ring.record(String::from("first"));
        ring.advance();
        ring.advance();
        assert!(ring.vacate().is_none());

        // when
        ring.record(String::from("fourth"));

        // then
        assert_eq!(ring.slots.len(), 4);
        assert_eq!(ring.slot(3).map(String::as_str), Some("fourth"));
        assert!(ring.slot(1).is_none());
        assert_eq!(ring.cursor, 0);
    }
}
