//! The bounded entry table: open-chained hashing, a global LRU, and
//! LRU-driven recycling.
//!
//! The table owns an arena of entries and a power-of-two bucket array of
//! chain heads. Every live entry is in exactly one hash chain and exactly
//! once in the LRU list; vacant slots sit on a free list. `get_entry` is
//! total: a miss always produces a slot, by popping the free list, by
//! recycling a recovered LRU tail, by growing toward the configured
//! maximum, or as a last resort by stealing the oldest entry outright.

use crate::bases::{Base, RetiredBase, TimestampBases};
use crate::entry::{Entry, EntryIdx};
use crate::key::RrlKey;
use crate::rates::RateVector;

/// How many entries the steal path examines from the LRU tail before it
/// gives up skipping `logging`-flagged entries.
const SCAN_LIMIT: usize = 64;

/// Plain counters describing table behavior, for introspection and logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TableStats {
    /// `get_entry` calls.
    pub searches: u64,
    /// Entries compared while walking hash chains.
    pub probes: u64,
    /// Lookups that found an existing entry.
    pub hits: u64,
    /// Recovered LRU-tail entries reused for a new key.
    pub recycles: u64,
    /// Entries stolen before they had recovered.
    pub steals: u64,
    /// Times the table grew.
    pub expansions: u64,
    /// Timestamp bases retired by the pool.
    pub retired_bases: u64,
}

/// The bounded, self-recycling entry table.
#[derive(Debug)]
pub struct RrlTable {
    entries: Vec<Entry>,
    /// Chain heads; length is always a power of two.
    buckets: Vec<EntryIdx>,
    bucket_mask: u32,

    /// Most recently used entry.
    lru_head: EntryIdx,
    /// Least recently used entry; first candidate for recycling.
    lru_tail: EntryIdx,
    /// Vacant slots, linked through `lru_prev`.
    free_head: EntryIdx,

    live: usize,
    max_entries: usize,
    stats: TableStats,
}

impl RrlTable {
    /// Creates a table with `min_entries` pre-allocated slots, growable to
    /// `max_entries`.
    pub fn new(min_entries: usize, max_entries: usize) -> Self {
        debug_assert!(min_entries >= 1);
        debug_assert!(max_entries >= min_entries);

        let mut table = Self {
            entries: Vec::new(),
            buckets: Vec::new(),
            bucket_mask: 0,
            lru_head: EntryIdx::NONE,
            lru_tail: EntryIdx::NONE,
            free_head: EntryIdx::NONE,
            live: 0,
            max_entries,
            stats: TableStats::default(),
        };
        table.grow_to(min_entries);
        table.stats.expansions = 0;
        table
    }

    /// Returns the number of live entries.
    #[inline]
    pub fn entry_count(&self) -> usize {
        self.live
    }

    /// Returns the number of allocated slots (live + vacant).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Returns the behavior counters.
    #[inline]
    pub fn stats(&self) -> &TableStats {
        &self.stats
    }

    /// Borrows an entry.
    #[inline]
    pub fn entry(&self, idx: EntryIdx) -> &Entry {
        &self.entries[idx.index()]
    }

    /// Mutably borrows an entry.
    #[inline]
    pub fn entry_mut(&mut self, idx: EntryIdx) -> &mut Entry {
        &mut self.entries[idx.index()]
    }

    /// Records a base retirement reported by the pool.
    ///
    /// Nothing is walked here: entries referencing the retired epoch read
    /// as stale on their next access and reset themselves; untouched ones
    /// age out through the LRU.
    pub fn note_retired_base(&mut self, retired: RetiredBase) {
        self.stats.retired_bases += 1;
        tracing::debug!(
            id = retired.id,
            epoch = retired.epoch,
            "timestamp base retired; dependent entries reset lazily"
        );
    }

    /// Locates, creates, or recycles the entry for `key`.
    ///
    /// The single lookup contract every path uses. Hits move the entry to
    /// the LRU head; misses always produce a freshly initialized entry.
    pub fn get_entry(
        &mut self,
        key: &RrlKey,
        hash: u32,
        bases: &TimestampBases,
        current: Base,
        rates: &RateVector,
        now: u64,
        window: u32,
    ) -> EntryIdx {
        self.stats.searches += 1;

        let bucket = (hash & self.bucket_mask) as usize;
        let mut idx = self.buckets[bucket];
        while idx.is_some() {
            let entry = &self.entries[idx.index()];
            self.stats.probes += 1;
            if entry.hash() == hash && entry.key() == key {
                self.stats.hits += 1;
                self.lru_unlink(idx);
                self.lru_push_front(idx);
                return idx;
            }
            idx = entry.hash_next;
        }

        let idx = self.take_slot(bases, now, window);
        self.entries[idx.index()].init(*key, hash, current, rates, now);
        self.live += 1;

        // Bucket heads may have moved if take_slot grew the table.
        let bucket = (hash & self.bucket_mask) as usize;
        self.entries[idx.index()].hash_next = self.buckets[bucket];
        self.buckets[bucket] = idx;
        self.lru_push_front(idx);
        idx
    }

    /// Produces a vacant slot; total over a non-empty table.
    fn take_slot(&mut self, bases: &TimestampBases, now: u64, window: u32) -> EntryIdx {
        if let Some(idx) = self.pop_free() {
            return idx;
        }

        // The LRU tail may have had a full window to recover, in which case
        // recycling it penalizes nobody.
        let tail = self.lru_tail;
        if tail.is_some() {
            let recovered = match self.entries[tail.index()].age(bases, now) {
                Some(age) => age >= u64::from(window),
                // Stale base reference: older than the offset horizon.
                None => true,
            };
            if recovered {
                self.release(tail);
                self.stats.recycles += 1;
                return tail;
            }
        }

        if self.entries.len() < self.max_entries {
            self.grow_to(self.entries.len() * 2);
            if let Some(idx) = self.pop_free() {
                return idx;
            }
        }

        // Steal the oldest entry we are allowed to. Entries flagged for
        // logging are skipped within a bounded scan; if every candidate is
        // protected the oldest is taken anyway.
        let mut victim = self.lru_tail;
        let mut cursor = self.lru_tail;
        let mut scanned = 0;
        while cursor.is_some() && scanned < SCAN_LIMIT {
            if !self.entries[cursor.index()].is_logging() {
                victim = cursor;
                break;
            }
            cursor = self.entries[cursor.index()].lru_prev;
            scanned += 1;
        }

        debug_assert!(victim.is_some(), "steal on an empty table");
        self.release(victim);
        self.stats.steals += 1;
        victim
    }

    /// Unlinks a live entry from its chain and the LRU and clears it.
    fn release(&mut self, idx: EntryIdx) {
        self.chain_unlink(idx);
        self.lru_unlink(idx);
        self.entries[idx.index()].clear();
        self.live -= 1;
    }

    /// Grows the slot arena toward `target` and rehashes if the bucket
    /// array must double to keep load at or below 1.0.
    fn grow_to(&mut self, target: usize) {
        let target = target.clamp(1, self.max_entries);
        while self.entries.len() < target {
            let idx = EntryIdx::new(self.entries.len());
            self.entries.push(Entry::vacant());
            self.push_free(idx);
        }

        let wanted_buckets = self.entries.len().next_power_of_two();
        if wanted_buckets > self.buckets.len() {
            self.buckets = vec![EntryIdx::NONE; wanted_buckets];
            self.bucket_mask = (wanted_buckets - 1) as u32;
            for i in 0..self.entries.len() {
                if !self.entries[i].is_in_use() {
                    continue;
                }
                let idx = EntryIdx::new(i);
                let bucket = (self.entries[i].hash() & self.bucket_mask) as usize;
                self.entries[i].hash_next = self.buckets[bucket];
                self.buckets[bucket] = idx;
            }
        }

        self.stats.expansions += 1;
        tracing::debug!(
            slots = self.entries.len(),
            buckets = self.buckets.len(),
            live = self.live,
            "rate-limit table grown"
        );
    }

    fn push_free(&mut self, idx: EntryIdx) {
        self.entries[idx.index()].lru_prev = self.free_head;
        self.free_head = idx;
    }

    fn pop_free(&mut self) -> Option<EntryIdx> {
        let idx = self.free_head;
        if idx.is_none() {
            return None;
        }
        self.free_head = self.entries[idx.index()].lru_prev;
        self.entries[idx.index()].lru_prev = EntryIdx::NONE;
        Some(idx)
    }

    /// Removes an entry from its hash chain.
    fn chain_unlink(&mut self, idx: EntryIdx) {
        let hash = self.entries[idx.index()].hash();
        let bucket = (hash & self.bucket_mask) as usize;

        let mut cursor = self.buckets[bucket];
        if cursor == idx {
            self.buckets[bucket] = self.entries[idx.index()].hash_next;
            self.entries[idx.index()].hash_next = EntryIdx::NONE;
            return;
        }
        while cursor.is_some() {
            let next = self.entries[cursor.index()].hash_next;
            if next == idx {
                self.entries[cursor.index()].hash_next = self.entries[idx.index()].hash_next;
                self.entries[idx.index()].hash_next = EntryIdx::NONE;
                return;
            }
            cursor = next;
        }
        debug_assert!(false, "entry missing from its hash chain");
    }

    /// Removes an entry from the LRU list.
    fn lru_unlink(&mut self, idx: EntryIdx) {
        let prev = self.entries[idx.index()].lru_prev;
        let next = self.entries[idx.index()].lru_next;

        if prev.is_some() {
            self.entries[prev.index()].lru_next = next;
        } else if self.lru_head == idx {
            self.lru_head = next;
        }
        if next.is_some() {
            self.entries[next.index()].lru_prev = prev;
        } else if self.lru_tail == idx {
            self.lru_tail = prev;
        }

        self.entries[idx.index()].lru_prev = EntryIdx::NONE;
        self.entries[idx.index()].lru_next = EntryIdx::NONE;
    }

    /// Pushes an entry to the most-recently-used end.
    fn lru_push_front(&mut self, idx: EntryIdx) {
        let old_head = self.lru_head;
        self.entries[idx.index()].lru_prev = EntryIdx::NONE;
        self.entries[idx.index()].lru_next = old_head;
        if old_head.is_some() {
            self.entries[old_head.index()].lru_prev = idx;
        }
        self.lru_head = idx;
        if self.lru_tail.is_none() {
            self.lru_tail = idx;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bases::TimestampBases;
    use crate::rates::ResponseCategory;
    use sluice_proto::{QClass, QType};
    use std::net::{IpAddr, Ipv4Addr};

    const T: u64 = 1_700_000_000;
    const WINDOW: u32 = 15;
    const SEED: u32 = 42;

    fn rates() -> RateVector {
        RateVector::new(5, 5, 5)
    }

    fn key_for(host: u32) -> RrlKey {
        // /32 prefix keeps every host distinct.
        RrlKey::new(
            IpAddr::V4(Ipv4Addr::from(host)),
            32,
            128,
            ResponseCategory::Query,
            QClass::IN,
            QType::A,
            None,
            SEED,
        )
    }

    fn get(
        table: &mut RrlTable,
        bases: &mut TimestampBases,
        host: u32,
        now: u64,
    ) -> EntryIdx {
        let key = key_for(host);
        let hash = key.hash(SEED);
        let (current, retired) = bases.current(now);
        if let Some(r) = retired {
            table.note_retired_base(r);
        }
        table.get_entry(&key, hash, bases, current, &rates(), now, WINDOW)
    }

    #[test]
    fn test_hit_returns_same_entry() {
        let mut table = RrlTable::new(8, 64);
        let mut bases = TimestampBases::new(T);

        let a = get(&mut table, &mut bases, 1, T);
        let b = get(&mut table, &mut bases, 1, T);
        assert_eq!(a, b);
        assert_eq!(table.entry_count(), 1);
        assert_eq!(table.stats().hits, 1);
    }

    #[test]
    fn test_distinct_keys_distinct_entries() {
        let mut table = RrlTable::new(8, 64);
        let mut bases = TimestampBases::new(T);

        let a = get(&mut table, &mut bases, 1, T);
        let b = get(&mut table, &mut bases, 2, T);
        assert_ne!(a, b);
        assert_eq!(table.entry_count(), 2);
    }

    #[test]
    fn test_grows_toward_max() {
        let mut table = RrlTable::new(4, 64);
        let mut bases = TimestampBases::new(T);

        for host in 0..40 {
            get(&mut table, &mut bases, host, T);
        }
        assert_eq!(table.entry_count(), 40);
        assert!(table.capacity() >= 40);
        assert!(table.capacity() <= 64);
        assert!(table.stats().expansions > 0);
    }

    #[test]
    fn test_capacity_conservation() {
        let mut table = RrlTable::new(4, 16);
        let mut bases = TimestampBases::new(T);

        for host in 0..100 {
            get(&mut table, &mut bases, host, T);
            assert!(table.entry_count() <= 16);
        }
        assert_eq!(table.entry_count(), 16);
        assert!(table.stats().steals > 0);
    }

    #[test]
    fn test_full_table_steals_lru_tail() {
        let mut table = RrlTable::new(2, 2);
        let mut bases = TimestampBases::new(T);

        let a = get(&mut table, &mut bases, 1, T);
        let a_key = *table.entry(a).key();
        get(&mut table, &mut bases, 2, T);

        // Touch host 1 so host 2 is the tail; a third key must steal it.
        get(&mut table, &mut bases, 1, T);
        let c = get(&mut table, &mut bases, 3, T);
        assert_eq!(table.entry_count(), 2);
        assert_eq!(*table.entry(a).key(), a_key);
        assert_eq!(*table.entry(c).key(), key_for(3));
    }

    #[test]
    fn test_recovered_tail_recycled_before_growth() {
        let mut table = RrlTable::new(2, 64);
        let mut bases = TimestampBases::new(T);

        get(&mut table, &mut bases, 1, T);
        get(&mut table, &mut bases, 2, T);

        // Both entries are past the window; a miss must recycle, not grow.
        let later = T + u64::from(WINDOW);
        get(&mut table, &mut bases, 3, later);
        assert_eq!(table.entry_count(), 2);
        assert_eq!(table.capacity(), 2);
        assert_eq!(table.stats().recycles, 1);
    }

    #[test]
    fn test_steal_skips_logging_entries() {
        let mut table = RrlTable::new(2, 2);
        let mut bases = TimestampBases::new(T);

        let a = get(&mut table, &mut bases, 1, T);
        table.entry_mut(a).set_logging(true);
        let b = get(&mut table, &mut bases, 2, T);
        let b_key = *table.entry(b).key();

        // `a` is older (tail) but protected; `b` must be the victim.
        let c = get(&mut table, &mut bases, 3, T);
        assert_eq!(c, b);
        assert_ne!(*table.entry(c).key(), b_key);
        assert!(table.entry(a).is_logging());
    }

    #[test]
    fn test_steal_takes_oldest_when_all_protected() {
        let mut table = RrlTable::new(2, 2);
        let mut bases = TimestampBases::new(T);

        let a = get(&mut table, &mut bases, 1, T);
        let b = get(&mut table, &mut bases, 2, T);
        table.entry_mut(a).set_logging(true);
        table.entry_mut(b).set_logging(true);

        // Oldest is `a`; with everything protected it is taken anyway.
        let c = get(&mut table, &mut bases, 3, T);
        assert_eq!(c, a);
        assert_eq!(table.entry_count(), 2);
    }

    #[test]
    fn test_lookup_survives_rehash() {
        let mut table = RrlTable::new(4, 256);
        let mut bases = TimestampBases::new(T);

        let mut created = Vec::new();
        for host in 0..100 {
            created.push(get(&mut table, &mut bases, host, T));
        }
        // Every key still resolves to its original entry after growth.
        for (host, idx) in created.iter().enumerate() {
            let found = get(&mut table, &mut bases, host as u32, T);
            assert_eq!(found, *idx);
        }
        assert_eq!(table.entry_count(), 100);
    }
}
