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

//! Cuckoo filter implementation for probabilistic set membership testing.
//!
//! A cuckoo filter stores a short fingerprint of each element in one of two
//! candidate buckets. Like a Bloom filter it never produces false
//! negatives and has a tunable false positive rate; unlike a Bloom filter
//! it also supports deletion.
//!
//! # Usage
//!
//! ```rust
//! use probfilter::cuckoo::CuckooFilterBuilder;
//!
//! let mut filter = CuckooFilterBuilder::with_accuracy(10_000, 0.01).build();
//!
//! assert!(filter.put(&"alpha"));
//! assert!(filter.might_contain(&"alpha"));
//! assert!(filter.delete(&"alpha"));
//! assert!(!filter.might_contain(&"alpha"));
//! ```
//!
//! # Notes
//!
//! - Insertion can fail once the table gets close to full; `put` then
//!   returns `false` and leaves the filter unchanged.
//! - Deleting an element that was never inserted can clear the fingerprint
//!   of a different element. Only delete what is known to be present.
//! - Mutating operations take `&mut self`; share a filter across threads
//!   behind external locking.

mod bitfield;
mod serialization;
mod sketch;
mod strategy;
mod table;

pub use self::sketch::CuckooFilter;
pub use self::sketch::CuckooFilterBuilder;
pub use self::strategy::CuckooStrategy;
pub use self::strategy::MAX_RELOCATION_ATTEMPTS;
pub use self::table::CuckooTable;
