// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use crate::cuckoo::bitfield;
use crate::error::Error;
use crate::error::ErrorKind;

/// Reserved entry value meaning "slot unused". Stored fingerprints are
/// always non-zero.
pub(crate) const EMPTY_ENTRY: u32 = 0;

/// Fixed-size table of fingerprint buckets backing a cuckoo filter.
///
/// The table is a `num_buckets` by `num_entries_per_bucket` matrix of
/// `num_bits_per_entry`-wide slots, packed into a contiguous `u64` array.
/// `num_buckets` must be even; the alternate-index transform relies on the
/// bucket count preserving parity under modulo.
///
/// Two running totals are maintained on every write: `size`, the number of
/// occupied slots, and `checksum`, the wrapping sum of all stored entry
/// values. Together with the shape they give a cheap structural comparison;
/// [`CuckooStrategy::equivalent`](crate::cuckoo::CuckooStrategy::equivalent)
/// is the authoritative one.
#[derive(Debug, Clone)]
pub struct CuckooTable {
    data: Vec<u64>,
    num_buckets: u64,
    num_entries_per_bucket: u32,
    num_bits_per_entry: u32,
    size: u64,
    checksum: i64,
}

impl CuckooTable {
    /// Creates an empty table with the given shape.
    ///
    /// # Panics
    ///
    /// Panics if the shape is invalid or the packed bit count overflows.
    pub fn new(num_buckets: u64, num_entries_per_bucket: u32, num_bits_per_entry: u32) -> Self {
        if let Err(message) = check_shape(num_buckets, num_entries_per_bucket, num_bits_per_entry)
        {
            panic!(
                "{message} (num_buckets={num_buckets}, num_entries_per_bucket={num_entries_per_bucket}, num_bits_per_entry={num_bits_per_entry})"
            );
        }
        let words = match required_words(num_buckets, num_entries_per_bucket, num_bits_per_entry) {
            Some(words) => words,
            None => panic!(
                "table shape overflows the addressable bit range (num_buckets={num_buckets}, num_entries_per_bucket={num_entries_per_bucket}, num_bits_per_entry={num_bits_per_entry})"
            ),
        };
        CuckooTable {
            data: vec![0u64; words],
            num_buckets,
            num_entries_per_bucket,
            num_bits_per_entry,
            size: 0,
            checksum: 0,
        }
    }

    /// Rebuilds a table from deserialized parts, validating the shape and
    /// the payload length. The declared size and checksum are taken as-is;
    /// callers verify them against [`recount`](Self::recount).
    pub(crate) fn from_parts(
        num_buckets: u64,
        num_entries_per_bucket: u32,
        num_bits_per_entry: u32,
        data: Vec<u64>,
        size: u64,
        checksum: i64,
    ) -> Result<Self, Error> {
        if let Err(message) = check_shape(num_buckets, num_entries_per_bucket, num_bits_per_entry)
        {
            return Err(Error::new(ErrorKind::MalformedDeserializeData, message)
                .with_context("num_buckets", num_buckets)
                .with_context("num_entries_per_bucket", num_entries_per_bucket)
                .with_context("num_bits_per_entry", num_bits_per_entry));
        }
        let words = required_words(num_buckets, num_entries_per_bucket, num_bits_per_entry)
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::MalformedDeserializeData,
                    "table shape overflows the addressable bit range",
                )
                .with_context("num_buckets", num_buckets)
            })?;
        if data.len() != words {
            return Err(Error::new(
                ErrorKind::MalformedDeserializeData,
                "payload length does not match the table shape",
            )
            .with_context("expected_words", words)
            .with_context("actual_words", data.len()));
        }
        Ok(CuckooTable {
            data,
            num_buckets,
            num_entries_per_bucket,
            num_bits_per_entry,
            size,
            checksum,
        })
    }

    /// Returns the value stored in the given slot, `EMPTY_ENTRY` if unused.
    pub fn read_entry(&self, bucket: u64, entry: u32) -> u32 {
        bitfield::read(
            &self.data,
            self.entry_offset(bucket, entry),
            self.num_bits_per_entry,
        )
    }

    /// Returns the first slot of `bucket` holding `value`.
    pub fn find_entry(&self, value: u32, bucket: u64) -> Option<u32> {
        (0..self.num_entries_per_bucket).find(|&entry| self.read_entry(bucket, entry) == value)
    }

    /// Returns how many slots of `bucket` hold `value`.
    pub fn count_entry(&self, value: u32, bucket: u64) -> u32 {
        (0..self.num_entries_per_bucket)
            .filter(|&entry| self.read_entry(bucket, entry) == value)
            .count() as u32
    }

    /// Returns whether any slot of `bucket` holds `value`.
    pub fn has_entry(&self, value: u32, bucket: u64) -> bool {
        self.find_entry(value, bucket).is_some()
    }

    /// Unconditionally writes `new_value` into the given slot and returns
    /// the displaced value, keeping `size` and `checksum` in step.
    pub fn swap_entry(&mut self, new_value: u32, bucket: u64, entry: u32) -> u32 {
        debug_assert!(
            u64::from(new_value) <= entry_max(self.num_bits_per_entry),
            "entry value {new_value} does not fit in {} bits",
            self.num_bits_per_entry
        );
        let offset = self.entry_offset(bucket, entry);
        let old_value = bitfield::write(
            new_value,
            &mut self.data,
            offset,
            self.num_bits_per_entry,
        );
        self.checksum = self
            .checksum
            .wrapping_add(i64::from(new_value))
            .wrapping_sub(i64::from(old_value));
        if old_value == EMPTY_ENTRY && new_value != EMPTY_ENTRY {
            self.size += 1;
        } else if old_value != EMPTY_ENTRY && new_value == EMPTY_ENTRY {
            assert!(self.size > 0, "entry count underflow");
            self.size -= 1;
        }
        old_value
    }

    /// Swaps `new_value` into the first slot of `bucket` holding
    /// `find_value`. Returns false when no slot matches.
    pub fn swap_any_entry(&mut self, new_value: u32, find_value: u32, bucket: u64) -> bool {
        match self.find_entry(find_value, bucket) {
            Some(entry) => {
                self.swap_entry(new_value, bucket, entry);
                true
            }
            None => false,
        }
    }

    /// Returns whether `other` has the same shape as this table.
    pub fn is_compatible(&self, other: &CuckooTable) -> bool {
        self.num_buckets == other.num_buckets
            && self.num_entries_per_bucket == other.num_entries_per_bucket
            && self.num_bits_per_entry == other.num_bits_per_entry
    }

    /// Number of occupied slots.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Wrapping sum of all stored entry values.
    pub fn checksum(&self) -> i64 {
        self.checksum
    }

    /// Total number of slots.
    pub fn capacity(&self) -> u64 {
        self.num_buckets * u64::from(self.num_entries_per_bucket)
    }

    /// Fraction of slots occupied. Insertion reliability degrades rapidly
    /// above roughly 0.95.
    pub fn load(&self) -> f64 {
        self.size as f64 / self.capacity() as f64
    }

    /// Size of the backing storage in bits.
    pub fn bit_size(&self) -> u64 {
        self.data.len() as u64 * 64
    }

    /// Estimates the current false positive probability.
    pub fn expected_fpp(&self) -> f64 {
        (2.0 * self.size as f64 / self.num_buckets as f64)
            / 2f64.powi(self.num_bits_per_entry as i32)
    }

    pub fn num_buckets(&self) -> u64 {
        self.num_buckets
    }

    pub fn num_entries_per_bucket(&self) -> u32 {
        self.num_entries_per_bucket
    }

    pub fn num_bits_per_entry(&self) -> u32 {
        self.num_bits_per_entry
    }

    /// Recomputes size and checksum by scanning every slot.
    pub(crate) fn recount(&self) -> (u64, i64) {
        let mut size = 0u64;
        let mut checksum = 0i64;
        for bucket in 0..self.num_buckets {
            for entry in 0..self.num_entries_per_bucket {
                let value = self.read_entry(bucket, entry);
                if value != EMPTY_ENTRY {
                    size += 1;
                }
                checksum = checksum.wrapping_add(i64::from(value));
            }
        }
        (size, checksum)
    }

    pub(crate) fn words(&self) -> &[u64] {
        &self.data
    }

    fn entry_offset(&self, bucket: u64, entry: u32) -> u64 {
        debug_assert!(bucket < self.num_buckets);
        debug_assert!(entry < self.num_entries_per_bucket);
        (bucket * u64::from(self.num_entries_per_bucket) + u64::from(entry))
            * u64::from(self.num_bits_per_entry)
    }
}

/// Equality over shape, size and checksum.
impl PartialEq for CuckooTable {
    fn eq(&self, other: &CuckooTable) -> bool {
        self.is_compatible(other) && self.size == other.size && self.checksum == other.checksum
    }
}

impl Eq for CuckooTable {}

pub(crate) fn check_shape(
    num_buckets: u64,
    num_entries_per_bucket: u32,
    num_bits_per_entry: u32,
) -> Result<(), &'static str> {
    if num_buckets == 0 || num_buckets % 2 != 0 {
        return Err("num_buckets must be positive and even");
    }
    // Index arithmetic is signed 64-bit.
    if num_buckets > i64::MAX as u64 {
        return Err("num_buckets must fit in a signed 64-bit integer");
    }
    if num_entries_per_bucket == 0 {
        return Err("num_entries_per_bucket must be positive");
    }
    if !(1..=32).contains(&num_bits_per_entry) {
        return Err("num_bits_per_entry must be between 1 and 32");
    }
    Ok(())
}

pub(crate) fn required_words(
    num_buckets: u64,
    num_entries_per_bucket: u32,
    num_bits_per_entry: u32,
) -> Option<usize> {
    let total_bits = num_buckets
        .checked_mul(u64::from(num_entries_per_bucket))?
        .checked_mul(u64::from(num_bits_per_entry))?;
    usize::try_from(total_bits.div_ceil(64)).ok()
}

fn entry_max(num_bits_per_entry: u32) -> u64 {
    (1u64 << num_bits_per_entry) - 1
}

#[cfg(test)]
mod tests {
    use crate::common::RandomSource;
    use crate::common::XorShift64;

    use super::*;

    #[test]
    fn test_new_table_is_empty() {
        let table = CuckooTable::new(1024, 4, 8);
        assert_eq!(table.size(), 0);
        assert_eq!(table.checksum(), 0);
        assert_eq!(table.capacity(), 4096);
        assert_eq!(table.load(), 0.0);
        assert_eq!(table.expected_fpp(), 0.0);
        // 1024 * 4 * 8 bits = 512 words
        assert_eq!(table.bit_size(), 512 * 64);
    }

    #[test]
    fn test_partial_last_word() {
        // 2 * 3 * 11 = 66 bits, rounded up to 2 words.
        let table = CuckooTable::new(2, 3, 11);
        assert_eq!(table.bit_size(), 128);
    }

    #[test]
    fn test_swap_entry_tracks_size_and_checksum() {
        let mut table = CuckooTable::new(4, 2, 8);

        assert_eq!(table.swap_entry(0x11, 3, 1), EMPTY_ENTRY);
        assert_eq!(table.size(), 1);
        assert_eq!(table.checksum(), 0x11);

        // Overwriting an occupied slot adjusts the checksum only.
        assert_eq!(table.swap_entry(0x22, 3, 1), 0x11);
        assert_eq!(table.size(), 1);
        assert_eq!(table.checksum(), 0x22);

        assert_eq!(table.swap_entry(EMPTY_ENTRY, 3, 1), 0x22);
        assert_eq!(table.size(), 0);
        assert_eq!(table.checksum(), 0);
    }

    #[test]
    fn test_find_count_has() {
        let mut table = CuckooTable::new(2, 4, 8);
        table.swap_entry(7, 0, 1);
        table.swap_entry(7, 0, 3);
        table.swap_entry(9, 0, 2);

        assert_eq!(table.find_entry(7, 0), Some(1));
        assert_eq!(table.find_entry(9, 0), Some(2));
        assert_eq!(table.find_entry(8, 0), None);
        assert_eq!(table.count_entry(7, 0), 2);
        assert_eq!(table.count_entry(7, 1), 0);
        assert!(table.has_entry(9, 0));
        assert!(!table.has_entry(9, 1));
        // Untouched slots read as empty.
        assert_eq!(table.count_entry(EMPTY_ENTRY, 0), 1);
    }

    #[test]
    fn test_swap_any_entry() {
        let mut table = CuckooTable::new(2, 2, 8);
        assert!(table.swap_any_entry(5, EMPTY_ENTRY, 0));
        assert!(table.swap_any_entry(6, EMPTY_ENTRY, 0));
        assert!(!table.swap_any_entry(7, EMPTY_ENTRY, 0));
        assert!(table.swap_any_entry(EMPTY_ENTRY, 5, 0));
        assert_eq!(table.size(), 1);
        assert_eq!(table.checksum(), 6);
    }

    #[test]
    fn test_bookkeeping_matches_full_scan() {
        let mut table = CuckooTable::new(16, 4, 5);
        let mut rng = XorShift64::seeded(3);
        for _ in 0..1000 {
            let bucket = u64::from(rng.next_below(16));
            let entry = rng.next_below(4);
            let value = rng.next_below(32);
            table.swap_entry(value, bucket, entry);
            let (size, checksum) = table.recount();
            assert_eq!(table.size(), size);
            assert_eq!(table.checksum(), checksum);
        }
    }

    #[test]
    fn test_equality_ignores_slot_positions() {
        let mut a = CuckooTable::new(4, 2, 8);
        let mut b = CuckooTable::new(4, 2, 8);
        a.swap_entry(9, 0, 0);
        b.swap_entry(9, 2, 1);
        assert_eq!(a, b);

        b.swap_entry(1, 3, 0);
        assert_ne!(a, b);
    }

    #[test]
    fn test_incompatible_shapes() {
        let a = CuckooTable::new(4, 2, 8);
        assert!(!a.is_compatible(&CuckooTable::new(6, 2, 8)));
        assert!(!a.is_compatible(&CuckooTable::new(4, 3, 8)));
        assert!(!a.is_compatible(&CuckooTable::new(4, 2, 9)));
        assert!(a.is_compatible(&a.clone()));
    }

    #[test]
    fn test_clone_is_deep() {
        let mut original = CuckooTable::new(4, 2, 8);
        original.swap_entry(3, 0, 0);
        let copied = original.clone();
        original.swap_entry(EMPTY_ENTRY, 0, 0);
        assert_eq!(copied.read_entry(0, 0), 3);
        assert_eq!(original.read_entry(0, 0), EMPTY_ENTRY);
    }

    #[test]
    #[should_panic(expected = "num_buckets must be positive and even")]
    fn test_odd_bucket_count_rejected() {
        CuckooTable::new(1023, 4, 8);
    }

    #[test]
    #[should_panic(expected = "num_entries_per_bucket must be positive")]
    fn test_zero_entries_rejected() {
        CuckooTable::new(1024, 0, 8);
    }

    #[test]
    #[should_panic(expected = "num_bits_per_entry must be between 1 and 32")]
    fn test_wide_entries_rejected() {
        CuckooTable::new(1024, 4, 33);
    }

    #[test]
    #[should_panic(expected = "overflows the addressable bit range")]
    fn test_oversized_shape_rejected() {
        CuckooTable::new((i64::MAX as u64) & !1, u32::MAX, 32);
    }
}
