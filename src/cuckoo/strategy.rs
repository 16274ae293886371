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

//! Strategies for mapping elements onto a [`CuckooTable`].
//!
//! A strategy derives an f-bit fingerprint and a pair of candidate bucket
//! indices from an element's hash, and implements insertion, relocation,
//! deletion, lookup, union and structural equivalence on top of them.
//!
//! Strategies are part of the serialized form of every filter that uses
//! them. The ordinal of each variant is the wire discriminator, so existing
//! variants must never be reordered, renumbered or removed; new strategies
//! may only be appended.

use std::hash::Hash;

use crate::common::RandomSource;
use crate::cuckoo::table::CuckooTable;
use crate::cuckoo::table::EMPTY_ENTRY;
use crate::hash::MurmurHash3X64128;
use crate::hash::hash_int;

/// Upper bound on relocation steps for a single insertion. Beyond this the
/// insert is abandoned and the displacement chain unwound.
pub const MAX_RELOCATION_ATTEMPTS: u32 = 500;

/// Seed of the element hash. Fixed per strategy; changing it would change
/// every stored fingerprint and index.
const HASH_SEED: u64 = 0;

/// Versioned registry of cuckoo hashing strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CuckooStrategy {
    /// 128-bit MurmurHash3 element hashing, split into two 32-bit halves:
    /// one for the primary index, one for the fingerprint. The alternate
    /// index is derived with the Beal-Dupras parity transform, which is
    /// reversible without the original element.
    Murmur128BealDupras32,
}

impl CuckooStrategy {
    /// Stable wire ordinal of this strategy.
    pub const fn ordinal(self) -> u8 {
        match self {
            CuckooStrategy::Murmur128BealDupras32 => 0,
        }
    }

    /// Looks a strategy up by its wire ordinal.
    pub const fn from_ordinal(ordinal: u8) -> Option<CuckooStrategy> {
        match ordinal {
            0 => Some(CuckooStrategy::Murmur128BealDupras32),
            _ => None,
        }
    }

    /// All registered strategies, in ordinal order.
    pub const fn values() -> &'static [CuckooStrategy] {
        &[CuckooStrategy::Murmur128BealDupras32]
    }

    /// Inserts `item`'s fingerprint into `table`.
    ///
    /// Both candidate buckets are tried for a free slot first; when both
    /// are full, entries are relocated along a chain of alternate buckets.
    /// Returns false when no slot can be freed within
    /// [`MAX_RELOCATION_ATTEMPTS`] kicks; the table is then restored to its
    /// prior state.
    pub fn put<T, R>(self, item: &T, table: &mut CuckooTable, rng: &mut R) -> bool
    where
        T: Hash + ?Sized,
        R: RandomSource,
    {
        let (fingerprint, index1, index2) = self.entry_coordinates(item, table);
        if table.swap_any_entry(fingerprint, EMPTY_ENTRY, index1)
            || table.swap_any_entry(fingerprint, EMPTY_ENTRY, index2)
        {
            return true;
        }
        self.kick_entry(fingerprint, table, index2, rng, 0)
    }

    /// Removes one copy of `item`'s fingerprint from either candidate
    /// bucket. Returns false when neither bucket holds it.
    ///
    /// Deleting an element that was never inserted is safe, but it may
    /// remove the fingerprint of a different element that shares both the
    /// fingerprint and a bucket. Such false deletes are intrinsic to
    /// fingerprint-only filters.
    pub fn delete<T>(self, item: &T, table: &mut CuckooTable) -> bool
    where
        T: Hash + ?Sized,
    {
        let (fingerprint, index1, index2) = self.entry_coordinates(item, table);
        table.swap_any_entry(EMPTY_ENTRY, fingerprint, index1)
            || table.swap_any_entry(EMPTY_ENTRY, fingerprint, index2)
    }

    /// Returns whether `item`'s fingerprint occupies either candidate
    /// bucket. Never false for an element still in the table.
    pub fn might_contain<T>(self, item: &T, table: &CuckooTable) -> bool
    where
        T: Hash + ?Sized,
    {
        let (fingerprint, index1, index2) = self.entry_coordinates(item, table);
        table.has_entry(fingerprint, index1) || table.has_entry(fingerprint, index2)
    }

    /// Copies every fingerprint of `src` into `dest`, relocating on
    /// overflow. Stops and returns false on the first fingerprint that
    /// cannot be placed; `dest` keeps the fingerprints moved so far.
    pub fn put_all<R>(self, dest: &mut CuckooTable, src: &CuckooTable, rng: &mut R) -> bool
    where
        R: RandomSource,
    {
        debug_assert!(dest.is_compatible(src));
        let num_buckets = dest.num_buckets();
        for bucket in 0..src.num_buckets() {
            for entry in 0..src.num_entries_per_bucket() {
                let fingerprint = src.read_entry(bucket, entry);
                if fingerprint == EMPTY_ENTRY {
                    continue;
                }
                let alt = self.alt_index(bucket, fingerprint, num_buckets);
                let placed = dest.swap_any_entry(fingerprint, EMPTY_ENTRY, bucket)
                    || dest.swap_any_entry(fingerprint, EMPTY_ENTRY, alt)
                    || self.kick_entry(fingerprint, dest, alt, rng, 0);
                if !placed {
                    return false;
                }
            }
        }
        true
    }

    /// Returns whether two tables hold the same fingerprint multiset.
    ///
    /// For every stored fingerprint the occupancy of its candidate bucket
    /// pair is compared, so tables that placed a fingerprint in opposite
    /// buckets of the pair still compare as equivalent.
    pub fn equivalent(self, a: &CuckooTable, b: &CuckooTable) -> bool {
        if !a.is_compatible(b) {
            return false;
        }
        let num_buckets = a.num_buckets();
        for bucket in 0..b.num_buckets() {
            for entry in 0..b.num_entries_per_bucket() {
                let fingerprint = b.read_entry(bucket, entry);
                if fingerprint == EMPTY_ENTRY {
                    continue;
                }
                let alt = self.alt_index(bucket, fingerprint, num_buckets);
                let count_a =
                    a.count_entry(fingerprint, bucket) + a.count_entry(fingerprint, alt);
                let count_b =
                    b.count_entry(fingerprint, bucket) + b.count_entry(fingerprint, alt);
                if count_a != count_b {
                    return false;
                }
            }
        }
        true
    }

    /// Returns an f-bit fingerprint of the given 32-bit hash.
    ///
    /// The hash is scanned in f-bit windows from the least significant side
    /// and the first non-zero window wins. When every window is zero, 1 is
    /// returned so the fingerprint never collides with an unused slot.
    pub fn fingerprint(self, hash: u32, f: u32) -> u32 {
        debug_assert!((1..=32).contains(&f));
        let mask = u32::MAX >> (32 - f);
        let mut offset = 0;
        while offset + f <= 32 {
            let window = (hash >> offset) & mask;
            if window != 0 {
                return window;
            }
            offset += f;
        }
        1
    }

    /// Returns the primary bucket index for a 32-bit hash: its value modulo
    /// `m`, normalized to `[0, m)`.
    pub fn index(self, hash: i32, m: u64) -> u64 {
        debug_assert!(m > 0 && m <= i64::MAX as u64);
        i64::from(hash).rem_euclid(m as i64) as u64
    }

    /// Returns the other candidate bucket for a fingerprint currently at
    /// `index`.
    ///
    /// The offset is an odd hash of the fingerprint, added when `index` is
    /// even and subtracted when it is odd. Because `m` is even, the modulo
    /// preserves parity, so the result always has opposite parity from
    /// `index` and applying the transform twice yields `index` again. That
    /// reversibility is what lets a relocation re-home a displaced entry
    /// from its current bucket alone, with the original element long gone.
    pub fn alt_index(self, index: u64, fingerprint: u32, m: u64) -> u64 {
        debug_assert!(m % 2 == 0 && m <= i64::MAX as u64);
        debug_assert!(index < m);
        let index = index as i64;
        let offset = parsign(index) * odd(i64::from(hash_int(fingerprint as i32)));
        protected_sum(index, offset, m as i64).rem_euclid(m as i64) as u64
    }

    fn entry_coordinates<T>(self, item: &T, table: &CuckooTable) -> (u32, u64, u64)
    where
        T: Hash + ?Sized,
    {
        let hash64 = hash_object(item);
        let hash1 = hash64 as i32;
        let hash2 = (hash64 >> 32) as u32;
        let m = table.num_buckets();
        let fingerprint = self.fingerprint(hash2, table.num_bits_per_entry());
        let index1 = self.index(hash1, m);
        let index2 = self.alt_index(index1, fingerprint, m);
        (fingerprint, index1, index2)
    }

    /// One relocation step: overwrite a random slot of `index` with the
    /// arriving fingerprint and re-home the displaced one in its alternate
    /// bucket. On failure the displaced chain is unwound in reverse so the
    /// table ends bit-identical to its state before the insert.
    fn kick_entry<R>(
        self,
        fingerprint: u32,
        table: &mut CuckooTable,
        index: u64,
        rng: &mut R,
        kick: u32,
    ) -> bool
    where
        R: RandomSource,
    {
        if kick >= MAX_RELOCATION_ATTEMPTS {
            return false;
        }
        let entry = rng.next_below(table.num_entries_per_bucket());
        let kicked = table.swap_entry(fingerprint, index, entry);
        if kicked == EMPTY_ENTRY {
            // Buckets along the relocation chain may hold free slots even
            // though both home buckets were full.
            return true;
        }
        let next = self.alt_index(index, kicked, table.num_buckets());
        if self.kick_entry(kicked, table, next, rng, kick + 1) {
            return true;
        }
        let restored = table.swap_entry(kicked, index, entry);
        assert_eq!(
            restored, fingerprint,
            "relocation rollback restored an unexpected fingerprint"
        );
        false
    }
}

fn hash_object<T>(item: &T) -> u64
where
    T: Hash + ?Sized,
{
    let mut hasher = MurmurHash3X64128::with_seed(HASH_SEED);
    item.hash(&mut hasher);
    let (h1, _) = hasher.finish128();
    h1
}

/// +1 for an even index, -1 for an odd one.
fn parsign(index: i64) -> i64 {
    if index & 1 == 0 {
        1
    } else {
        -1
    }
}

fn odd(value: i64) -> i64 {
    value | 1
}

/// `index + offset`, reducing `index` by `m` first whenever the direct sum
/// would overflow. The reduction does not change the eventual value modulo
/// `m`, and at most two steps are ever needed.
fn protected_sum(index: i64, offset: i64, m: i64) -> i64 {
    match index.checked_add(offset) {
        Some(sum) => sum,
        None => protected_sum(index - m, offset, m),
    }
}
