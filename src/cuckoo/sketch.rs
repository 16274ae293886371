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

use std::hash::Hash;

use crate::common::XorShift64;
use crate::cuckoo::strategy::CuckooStrategy;
use crate::cuckoo::table::CuckooTable;

/// Default seed of the relocation-victim generator. The value only affects
/// which slot gets displaced during relocation, so changing it changes
/// bit-for-bit layout reproducibility but never correctness.
pub(super) const DEFAULT_EVICTION_SEED: u64 = 1;

const MIN_ENTRIES_PER_BUCKET: u32 = 2;
const MAX_ENTRIES_PER_BUCKET: u32 = 8;

/// A cuckoo filter for probabilistic set membership testing.
///
/// Stores short fingerprints instead of elements, which keeps space small
/// while providing:
/// - No false negatives (inserted items always return `true`)
/// - Tunable false positive rate
/// - Deletion, which Bloom filters cannot offer
///
/// Inserting the same element twice stores two fingerprint copies, and each
/// copy needs its own [`delete`](Self::delete). Insertion can fail once the
/// table approaches its structural limit; [`put`](Self::put) reports this
/// by returning `false` and leaving the filter unchanged.
///
/// Use [`CuckooFilterBuilder`] to construct instances.
///
/// # Examples
///
/// ```
/// use probfilter::cuckoo::CuckooFilterBuilder;
///
/// // By accuracy (recommended)
/// let filter = CuckooFilterBuilder::with_accuracy(10_000, 0.01).build();
///
/// // By table shape (manual)
/// let filter = CuckooFilterBuilder::with_shape(1024, 4, 8).build();
/// ```
#[derive(Debug, Clone)]
pub struct CuckooFilter {
    strategy: CuckooStrategy,
    table: CuckooTable,
    rng: XorShift64,
}

impl CuckooFilter {
    pub(super) fn from_parts(
        strategy: CuckooStrategy,
        table: CuckooTable,
        eviction_seed: u64,
    ) -> Self {
        CuckooFilter {
            strategy,
            table,
            rng: XorShift64::seeded(eviction_seed),
        }
    }

    // ========================================================================
    // Query Operations
    // ========================================================================

    /// Tests whether an item is possibly in the set.
    ///
    /// Returns:
    /// - `true`: Item was **possibly** inserted (or false positive)
    /// - `false`: Item was **definitely not** inserted
    ///
    /// # Examples
    ///
    /// ```
    /// # use probfilter::cuckoo::CuckooFilterBuilder;
    /// let mut filter = CuckooFilterBuilder::with_accuracy(100, 0.01).build();
    /// filter.put(&"apple");
    ///
    /// assert!(filter.might_contain(&"apple"));
    /// assert!(!filter.might_contain(&"grape")); // never inserted (probably)
    /// ```
    pub fn might_contain<T>(&self, item: &T) -> bool
    where
        T: Hash + ?Sized,
    {
        self.strategy.might_contain(item, &self.table)
    }

    // ========================================================================
    // Update Operations
    // ========================================================================

    /// Inserts an item into the filter.
    ///
    /// Returns `true` when the item's fingerprint was stored. Returns
    /// `false` when both candidate buckets are full and relocation could
    /// not free a slot; the filter is left exactly as it was.
    ///
    /// Duplicates are not collapsed: every successful `put` stores another
    /// fingerprint copy. Callers wanting set semantics should check
    /// [`might_contain`](Self::might_contain) first.
    ///
    /// # Examples
    ///
    /// ```
    /// # use probfilter::cuckoo::CuckooFilterBuilder;
    /// let mut filter = CuckooFilterBuilder::with_accuracy(100, 0.01).build();
    ///
    /// assert!(filter.put(&"apple"));
    /// assert!(filter.put(&42_u64));
    /// assert_eq!(filter.size(), 2);
    /// ```
    pub fn put<T>(&mut self, item: &T) -> bool
    where
        T: Hash + ?Sized,
    {
        self.strategy.put(item, &mut self.table, &mut self.rng)
    }

    /// Removes one copy of an item's fingerprint.
    ///
    /// Returns `true` when a matching fingerprint was found and cleared.
    /// Deleting an element that was never inserted is safe, but it can
    /// remove the fingerprint of a different element that shares both the
    /// fingerprint and a bucket (a false delete). Only delete elements that
    /// are known to have been inserted.
    ///
    /// # Examples
    ///
    /// ```
    /// # use probfilter::cuckoo::CuckooFilterBuilder;
    /// let mut filter = CuckooFilterBuilder::with_accuracy(100, 0.01).build();
    /// filter.put(&"apple");
    ///
    /// assert!(filter.delete(&"apple"));
    /// assert!(!filter.might_contain(&"apple"));
    /// assert!(!filter.delete(&"apple"));
    /// ```
    pub fn delete<T>(&mut self, item: &T) -> bool
    where
        T: Hash + ?Sized,
    {
        self.strategy.delete(item, &mut self.table)
    }

    // ========================================================================
    // Set Operations
    // ========================================================================

    /// Merges another filter into this one (multiset union).
    ///
    /// Every fingerprint of `other` is copied over, relocating entries as
    /// needed. Returns `false` when a fingerprint cannot be placed; the
    /// fingerprints moved before the failure remain.
    ///
    /// # Panics
    ///
    /// Panics if the filters are not compatible (different shape or
    /// strategy). Use [`is_compatible()`](Self::is_compatible) to check
    /// first.
    ///
    /// # Examples
    ///
    /// ```
    /// # use probfilter::cuckoo::CuckooFilterBuilder;
    /// let mut f1 = CuckooFilterBuilder::with_accuracy(100, 0.01).build();
    /// let mut f2 = CuckooFilterBuilder::with_accuracy(100, 0.01).build();
    ///
    /// f1.put(&"a");
    /// f2.put(&"b");
    ///
    /// assert!(f1.put_all(&f2));
    /// assert!(f1.might_contain(&"a"));
    /// assert!(f1.might_contain(&"b"));
    /// ```
    pub fn put_all(&mut self, other: &CuckooFilter) -> bool {
        assert!(
            self.is_compatible(other),
            "cannot merge incompatible cuckoo filters"
        );
        self.strategy
            .put_all(&mut self.table, &other.table, &mut self.rng)
    }

    /// Returns whether this filter holds the same fingerprint multiset as
    /// `other`, regardless of which bucket of each candidate pair a
    /// fingerprint landed in.
    pub fn equivalent(&self, other: &CuckooFilter) -> bool {
        self.strategy == other.strategy
            && self.table == other.table
            && self.strategy.equivalent(&self.table, &other.table)
    }

    // ========================================================================
    // Statistics and Properties
    // ========================================================================

    /// Returns whether the filter holds no fingerprints.
    pub fn is_empty(&self) -> bool {
        self.table.size() == 0
    }

    /// Number of stored fingerprints.
    pub fn size(&self) -> u64 {
        self.table.size()
    }

    /// Total number of fingerprint slots.
    pub fn capacity(&self) -> u64 {
        self.table.capacity()
    }

    /// Fraction of slots occupied.
    ///
    /// Insertions become unreliable as the load approaches 1; the practical
    /// limit depends on the bucket width (see
    /// [`CuckooFilterBuilder::suggest_load_factor`]).
    pub fn load(&self) -> f64 {
        self.table.load()
    }

    /// Size of the fingerprint storage in bits.
    pub fn bit_size(&self) -> u64 {
        self.table.bit_size()
    }

    /// Estimates the current false positive probability.
    pub fn expected_fpp(&self) -> f64 {
        self.table.expected_fpp()
    }

    /// Checks if two filters are compatible for merging: same strategy and
    /// same table shape.
    pub fn is_compatible(&self, other: &CuckooFilter) -> bool {
        self.strategy == other.strategy && self.table.is_compatible(&other.table)
    }

    pub fn num_buckets(&self) -> u64 {
        self.table.num_buckets()
    }

    pub fn num_entries_per_bucket(&self) -> u32 {
        self.table.num_entries_per_bucket()
    }

    pub fn num_bits_per_entry(&self) -> u32 {
        self.table.num_bits_per_entry()
    }

    pub(super) fn strategy(&self) -> CuckooStrategy {
        self.strategy
    }

    pub(super) fn table(&self) -> &CuckooTable {
        &self.table
    }
}

/// Equality is [`equivalent`](Self::equivalent): the relocation generator
/// state is deliberately ignored.
impl PartialEq for CuckooFilter {
    fn eq(&self, other: &CuckooFilter) -> bool {
        self.equivalent(other)
    }
}

impl Eq for CuckooFilter {}

// ============================================================================
// Builder
// ============================================================================

/// Builder for creating [`CuckooFilter`] instances.
///
/// Provides two construction modes:
/// - [`with_accuracy()`](Self::with_accuracy): Specify target items and
///   false positive rate (recommended)
/// - [`with_shape()`](Self::with_shape): Specify the exact table shape
///   (manual)
#[derive(Debug, Clone)]
pub struct CuckooFilterBuilder {
    num_buckets: u64,
    num_entries_per_bucket: u32,
    num_bits_per_entry: u32,
    eviction_seed: u64,
}

impl CuckooFilterBuilder {
    /// Creates a builder with optimal parameters for a target accuracy.
    ///
    /// Picks the bucket width, fingerprint width and bucket count so that
    /// `max_items` elements fit below the practical load limit while the
    /// false positive probability stays under `fpp`.
    ///
    /// # Panics
    ///
    /// Panics if `max_items` is 0, `fpp` is not in (0.0, 1.0), or `fpp` is
    /// too small to reach with 32-bit fingerprints.
    ///
    /// # Examples
    ///
    /// ```
    /// # use probfilter::cuckoo::CuckooFilterBuilder;
    /// let filter = CuckooFilterBuilder::with_accuracy(10_000, 0.01).build();
    /// assert!(filter.capacity() >= 10_000);
    /// ```
    pub fn with_accuracy(max_items: u64, fpp: f64) -> Self {
        assert!(max_items > 0, "max_items must be greater than 0");
        assert!(
            fpp > 0.0 && fpp < 1.0,
            "fpp must be between 0.0 and 1.0 (exclusive)"
        );

        let num_entries_per_bucket = Self::suggest_entries_per_bucket(fpp);
        let num_bits_per_entry = Self::suggest_bits_per_entry(fpp, num_entries_per_bucket);
        let num_buckets = Self::suggest_num_buckets(max_items, num_entries_per_bucket);

        CuckooFilterBuilder {
            num_buckets,
            num_entries_per_bucket,
            num_bits_per_entry,
            eviction_seed: DEFAULT_EVICTION_SEED,
        }
    }

    /// Creates a builder with an explicit table shape.
    ///
    /// # Panics
    ///
    /// Panics if the shape is invalid: `num_buckets` must be positive and
    /// even, `num_entries_per_bucket` positive, and `num_bits_per_entry`
    /// between 1 and 32.
    ///
    /// # Examples
    ///
    /// ```
    /// # use probfilter::cuckoo::CuckooFilterBuilder;
    /// let filter = CuckooFilterBuilder::with_shape(1024, 4, 8).build();
    /// assert_eq!(filter.capacity(), 4096);
    /// ```
    pub fn with_shape(num_buckets: u64, num_entries_per_bucket: u32, num_bits_per_entry: u32) -> Self {
        if let Err(message) =
            crate::cuckoo::table::check_shape(num_buckets, num_entries_per_bucket, num_bits_per_entry)
        {
            panic!("{message}");
        }
        CuckooFilterBuilder {
            num_buckets,
            num_entries_per_bucket,
            num_bits_per_entry,
            eviction_seed: DEFAULT_EVICTION_SEED,
        }
    }

    /// Sets the seed of the relocation-victim generator (default: 1).
    ///
    /// Filters built with different seeds stay correct and remain
    /// compatible, but identical update sequences no longer produce
    /// bit-identical tables.
    pub fn eviction_seed(mut self, seed: u64) -> Self {
        self.eviction_seed = seed;
        self
    }

    /// Builds the cuckoo filter.
    pub fn build(self) -> CuckooFilter {
        CuckooFilter::from_parts(
            CuckooStrategy::Murmur128BealDupras32,
            CuckooTable::new(
                self.num_buckets,
                self.num_entries_per_bucket,
                self.num_bits_per_entry,
            ),
            self.eviction_seed,
        )
    }

    // ========================================================================
    // Static Suggestion Methods
    // ========================================================================

    /// Suggests the bucket width for a target false positive probability.
    ///
    /// Wider buckets tolerate higher load before insertions fail, at the
    /// cost of more slots probed per lookup. The tiers follow the cuckoo
    /// filter paper's space-optimality guidance.
    pub fn suggest_entries_per_bucket(fpp: f64) -> u32 {
        assert!(
            fpp > 0.0 && fpp < 1.0,
            "fpp must be between 0.0 and 1.0 (exclusive)"
        );
        if fpp <= 0.00001 {
            MAX_ENTRIES_PER_BUCKET
        } else if fpp <= 0.002 {
            4
        } else {
            MIN_ENTRIES_PER_BUCKET
        }
    }

    /// Suggests the fingerprint width in bits.
    ///
    /// Formula: `f = ceil(log2(2b / fpp))` for bucket width `b`, the bound
    /// at which a full table still meets the target false positive rate.
    ///
    /// # Panics
    ///
    /// Panics if the target needs more than 32 bits per fingerprint.
    pub fn suggest_bits_per_entry(fpp: f64, entries_per_bucket: u32) -> u32 {
        let bits = (2.0 * f64::from(entries_per_bucket) / fpp).log2().ceil() as u32;
        assert!(
            bits <= 32,
            "fpp {fpp} requires more than 32 bits per fingerprint"
        );
        bits.max(1)
    }

    /// Suggests an even bucket count holding `max_items` below the
    /// practical load limit for the given bucket width.
    pub fn suggest_num_buckets(max_items: u64, entries_per_bucket: u32) -> u64 {
        assert!(max_items > 0, "max_items must be greater than 0");
        let load = Self::suggest_load_factor(entries_per_bucket);
        let buckets =
            (max_items as f64 / load / f64::from(entries_per_bucket)).ceil() as u64;
        buckets.div_ceil(2).max(1) * 2
    }

    /// Practical maximum load factor for a bucket width, from the cuckoo
    /// filter paper's measurements.
    pub fn suggest_load_factor(entries_per_bucket: u32) -> f64 {
        match entries_per_bucket {
            0 | 1 => 0.5,
            2 | 3 => 0.84,
            4..=7 => 0.955,
            _ => 0.98,
        }
    }
}
