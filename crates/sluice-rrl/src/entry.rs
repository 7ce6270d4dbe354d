//! Rate-limit table entries and the token-bucket update.
//!
//! Entries live in an arena and link to each other by index: one link for
//! the hash chain, two for the LRU list. An index-based representation
//! keeps the two intrusive lists out of the ownership graph entirely; the
//! sentinel [`EntryIdx::NONE`] plays the role of a null pointer.

use crate::bases::{Base, TimestampBases};
use crate::key::RrlKey;
use crate::rates::RateVector;
use crate::Verdict;

/// Index of an entry in the table arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryIdx(u32);

impl EntryIdx {
    /// Sentinel encoding "no entry".
    pub const NONE: Self = Self(u32::MAX);

    /// Wraps an arena position.
    #[inline]
    pub fn new(index: usize) -> Self {
        debug_assert!(index < u32::MAX as usize);
        Self(index as u32)
    }

    /// Returns the arena position, or panics on the sentinel.
    #[inline]
    pub fn index(self) -> usize {
        debug_assert!(self.is_some());
        self.0 as usize
    }

    /// Returns true if this is the sentinel.
    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }

    /// Returns true if this refers to an entry.
    #[inline]
    pub const fn is_some(self) -> bool {
        self.0 != u32::MAX
    }
}

/// One equivalence class: its fingerprint, bucket and LRU links, compressed
/// last-used timestamp, and the token-bucket balance.
#[derive(Debug)]
pub struct Entry {
    key: RrlKey,
    hash: u32,

    /// Next entry in the same hash bucket.
    pub(crate) hash_next: EntryIdx,
    /// Toward the most recently used entry. Doubles as the free-list link
    /// for vacant slots.
    pub(crate) lru_prev: EntryIdx,
    /// Toward the least recently used entry.
    pub(crate) lru_next: EntryIdx,

    base_id: u8,
    base_epoch: u32,
    /// Seconds between the base and the last touch.
    last_used_offset: u16,

    /// Token balance: positive is credit, negative is debt.
    responses: i16,
    /// Consecutive penalized responses since the last `Allow`.
    slip_run: u8,

    in_use: bool,
    logging: bool,
}

impl Entry {
    /// Creates a vacant arena slot.
    pub(crate) fn vacant() -> Self {
        Self {
            key: RrlKey::vacant(),
            hash: 0,
            hash_next: EntryIdx::NONE,
            lru_prev: EntryIdx::NONE,
            lru_next: EntryIdx::NONE,
            base_id: 0,
            base_epoch: 0,
            last_used_offset: 0,
            responses: 0,
            slip_run: 0,
            in_use: false,
            logging: false,
        }
    }

    /// Initializes a slot for a new equivalence class.
    ///
    /// The balance starts at one second's worth of the category rate; the
    /// first charge happens in the `update_balance` that follows.
    pub(crate) fn init(&mut self, key: RrlKey, hash: u32, base: Base, rates: &RateVector, now: u64) {
        self.key = key;
        self.hash = hash;
        self.rebase(base, now);
        self.responses = saturate(i64::from(rates.rate(key.category())));
        self.slip_run = 0;
        self.in_use = true;
        self.logging = false;
    }

    /// Clears a slot when it is recycled or stolen.
    pub(crate) fn clear(&mut self) {
        self.key = RrlKey::vacant();
        self.hash = 0;
        self.in_use = false;
        self.logging = false;
    }

    /// Points the entry at `base` with `now` as its last-used second.
    fn rebase(&mut self, base: Base, now: u64) {
        self.base_id = base.id;
        self.base_epoch = base.epoch;
        self.last_used_offset = now.saturating_sub(base.second).min(u64::from(u16::MAX)) as u16;
    }

    /// Returns the fingerprint.
    #[inline]
    pub fn key(&self) -> &RrlKey {
        &self.key
    }

    /// Returns the cached entry hash.
    #[inline]
    pub fn hash(&self) -> u32 {
        self.hash
    }

    /// Returns true while the slot holds a live equivalence class.
    #[inline]
    pub fn is_in_use(&self) -> bool {
        self.in_use
    }

    /// Returns true while a penalized block on this entry is being logged.
    #[inline]
    pub fn is_logging(&self) -> bool {
        self.logging
    }

    pub(crate) fn set_logging(&mut self, logging: bool) {
        self.logging = logging;
    }

    /// Returns the current token balance.
    #[inline]
    pub fn balance(&self) -> i16 {
        self.responses
    }

    /// Seconds since the entry was last touched, or `None` when its base
    /// reference has gone stale.
    pub(crate) fn age(&self, bases: &TimestampBases, now: u64) -> Option<u64> {
        let now_offset = bases.offset(self.base_id, self.base_epoch, now)?;
        Some(u64::from(now_offset.saturating_sub(self.last_used_offset)))
    }

    /// The token-bucket update: regenerates credit for elapsed time,
    /// charges this response, and classifies the result.
    pub fn update_balance(
        &mut self,
        bases: &TimestampBases,
        current: Base,
        rates: &RateVector,
        slip: u32,
        now: u64,
        window: u32,
    ) -> Verdict {
        let category = self.key.category();
        let rate = rates.rate(category);
        if rate == 0 {
            return Verdict::Allow;
        }

        let Some(now_offset) = bases.offset(self.base_id, self.base_epoch, now) else {
            // The base was recycled out from under us, or the entry sat
            // untouched past the offset horizon. Either way it has long
            // since recovered: start over.
            self.rebase(current, now);
            self.responses = saturate(i64::from(rate));
            self.slip_run = 0;
            self.logging = false;
            return Verdict::Allow;
        };

        let elapsed = u32::from(now_offset.saturating_sub(self.last_used_offset));
        self.last_used_offset = now_offset;

        let mut balance = i64::from(self.responses);
        if elapsed >= window {
            // A full window of quiet clears any debt.
            balance = i64::from(rate);
        } else if elapsed > 0 {
            balance = (balance + i64::from(rates.credit(category, elapsed))).min(i64::from(rate));
        }

        balance -= 1;
        if balance >= 0 {
            self.responses = saturate(balance);
            self.slip_run = 0;
            return Verdict::Allow;
        }

        let floor = -i64::from(window) * i64::from(rate);
        self.responses = saturate(balance.max(floor));

        if slip > 0 {
            self.slip_run = self.slip_run.saturating_add(1);
            if u32::from(self.slip_run) >= slip {
                self.slip_run = 0;
                return Verdict::Slip;
            }
        }
        Verdict::Drop
    }
}

/// Clamps a balance into the stored `i16`.
fn saturate(balance: i64) -> i16 {
    balance.clamp(i64::from(i16::MIN), i64::from(i16::MAX)) as i16
}
