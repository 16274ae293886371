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

use googletest::assert_that;
use googletest::prelude::near;
use probfilter::cuckoo::CuckooFilterBuilder;
use probfilter::cuckoo::CuckooStrategy;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[test]
fn test_empty_lookup() {
    let filter = CuckooFilterBuilder::with_shape(1024, 4, 8).build();
    assert!(!filter.might_contain(&"alpha"));
    assert_eq!(filter.size(), 0);
    assert!(filter.is_empty());
}

#[test]
fn test_insert_then_query() {
    let mut filter = CuckooFilterBuilder::with_shape(1024, 4, 8).build();
    for item in ["a", "b", "c"] {
        assert!(filter.put(&item));
    }
    for item in ["a", "b", "c"] {
        assert!(filter.might_contain(&item));
    }
    assert_eq!(filter.size(), 3);
}

#[test]
fn test_delete_absent_key() {
    let mut filter = CuckooFilterBuilder::with_shape(1024, 4, 8).build();
    assert!(!filter.delete(&"ghost"));
    assert_eq!(filter.size(), 0);
}

#[test]
fn test_alt_index_reversibility_sweep() {
    let strategy = CuckooStrategy::Murmur128BealDupras32;
    let m = 1024u64;
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    for _ in 0..1000 {
        let index = rng.gen_range(0..m);
        let fingerprint = rng.gen_range(1..=255u32);
        let alt = strategy.alt_index(index, fingerprint, m);
        assert!(alt < m);
        assert_ne!(alt % 2, index % 2);
        assert_eq!(strategy.alt_index(alt, fingerprint, m), index);
    }
}

#[test]
fn test_capacity_stress() {
    // Two buckets of four 8-bit slots: eight slots in total, and every
    // item's candidate pair is {0, 1}.
    let mut filter = CuckooFilterBuilder::with_shape(2, 4, 8).build();

    let items: Vec<String> = (0..9).map(|i| format!("item-{i}")).collect();
    let mut inserted = Vec::new();
    let mut saw_failure = false;

    for item in &items {
        let before = filter.serialize();
        if filter.put(item) {
            inserted.push(item);
        } else {
            saw_failure = true;
            // A failed insert must leave the table bit-identical.
            assert_eq!(filter.serialize(), before);
        }
    }

    assert!(saw_failure, "nine inserts cannot all fit in eight slots");
    assert!(filter.size() <= 8);
    for item in inserted {
        assert!(filter.might_contain(item), "{item} lost after overflow");
    }
}

#[test]
fn test_no_false_negatives() {
    let mut filter = CuckooFilterBuilder::with_accuracy(1000, 0.01).build();
    for i in 0..500u64 {
        assert!(filter.put(&i), "insert {i} failed well below capacity");
    }
    for i in 0..500u64 {
        assert!(filter.might_contain(&i), "false negative for {i}");
    }
    assert_eq!(filter.size(), 500);
}

#[test]
fn test_membership_survives_relocation_pressure() {
    // Sixteen slots, filled to 75% so relocations actually happen.
    let mut filter = CuckooFilterBuilder::with_shape(8, 2, 12).build();
    let mut inserted = Vec::new();
    for i in 0..12u32 {
        if filter.put(&i) {
            inserted.push(i);
        }
    }
    assert!(!inserted.is_empty());
    for i in inserted {
        assert!(filter.might_contain(&i), "false negative for {i}");
    }
}

#[test]
fn test_insert_delete_symmetry() {
    let mut filter = CuckooFilterBuilder::with_shape(1024, 4, 12).build();
    assert!(filter.put(&"x"));
    assert!(filter.delete(&"x"));
    assert!(!filter.might_contain(&"x"));
    assert_eq!(filter.size(), 0);
}

#[test]
fn test_duplicate_inserts_stack() {
    let mut filter = CuckooFilterBuilder::with_shape(1024, 4, 8).build();
    for _ in 0..3 {
        assert!(filter.put(&"dup"));
    }
    assert_eq!(filter.size(), 3);

    // Each copy needs its own delete.
    assert!(filter.delete(&"dup"));
    assert!(filter.might_contain(&"dup"));
    assert!(filter.delete(&"dup"));
    assert!(filter.delete(&"dup"));
    assert!(!filter.might_contain(&"dup"));
    assert!(!filter.delete(&"dup"));
}

#[test]
fn test_put_all_monotonicity() {
    let mut dest = CuckooFilterBuilder::with_shape(64, 4, 8).build();
    let mut src = CuckooFilterBuilder::with_shape(64, 4, 8).build();

    for i in 0..20u32 {
        assert!(dest.put(&format!("dest-{i}")));
        assert!(src.put(&format!("src-{i}")));
    }

    assert!(dest.put_all(&src));
    assert_eq!(dest.size(), 40);
    for i in 0..20u32 {
        assert!(dest.might_contain(&format!("dest-{i}")));
        assert!(dest.might_contain(&format!("src-{i}")));
    }
    // The source is untouched.
    assert_eq!(src.size(), 20);
}

#[test]
#[should_panic(expected = "cannot merge incompatible cuckoo filters")]
fn test_put_all_rejects_incompatible_shapes() {
    let mut dest = CuckooFilterBuilder::with_shape(64, 4, 8).build();
    let src = CuckooFilterBuilder::with_shape(32, 4, 8).build();
    dest.put_all(&src);
}

#[test]
fn test_equivalence_ignores_insertion_order() {
    let mut a = CuckooFilterBuilder::with_shape(64, 4, 8).build();
    let mut b = CuckooFilterBuilder::with_shape(64, 4, 8).build();

    let items: Vec<String> = (0..25).map(|i| format!("k{i}")).collect();
    for item in &items {
        assert!(a.put(item));
    }
    for item in items.iter().rev() {
        assert!(b.put(item));
    }

    assert!(a.equivalent(&b));
    assert_eq!(a, b);

    assert!(b.put(&"extra"));
    assert!(!a.equivalent(&b));
    assert_ne!(a, b);
}

#[test]
fn test_statistics() {
    let mut filter = CuckooFilterBuilder::with_shape(1024, 4, 8).build();
    assert_eq!(filter.capacity(), 4096);
    assert_eq!(filter.load(), 0.0);
    assert_eq!(filter.expected_fpp(), 0.0);
    assert_eq!(filter.bit_size(), 1024 * 4 * 8);

    for i in 0..64u64 {
        assert!(filter.put(&i));
    }
    assert_that!(filter.load(), near(64.0 / 4096.0, 1e-12));
    assert_that!(filter.expected_fpp(), near(2.0 * 64.0 / 1024.0 / 256.0, 1e-12));
}

#[test]
fn test_identical_builds_are_bit_identical() {
    let build = || {
        let mut filter = CuckooFilterBuilder::with_shape(16, 4, 8).build();
        for i in 0..40u32 {
            filter.put(&i);
        }
        filter
    };
    assert_eq!(build().serialize(), build().serialize());
}

#[test]
fn test_eviction_seed_does_not_affect_membership() {
    let mut seeded = CuckooFilterBuilder::with_shape(16, 4, 8)
        .eviction_seed(99)
        .build();
    let mut inserted = Vec::new();
    for i in 0..40u32 {
        if seeded.put(&i) {
            inserted.push(i);
        }
    }
    for i in inserted {
        assert!(seeded.might_contain(&i));
    }
}

#[test]
fn test_strategy_registry_is_stable() {
    assert_eq!(CuckooStrategy::values().len(), 1);
    assert_eq!(CuckooStrategy::Murmur128BealDupras32.ordinal(), 0);
    assert_eq!(
        CuckooStrategy::from_ordinal(0),
        Some(CuckooStrategy::Murmur128BealDupras32)
    );
    assert_eq!(CuckooStrategy::from_ordinal(255), None);
}
