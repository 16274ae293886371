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

//! Probabilistic membership filters.
//!
//! This crate provides compact in-memory structures that answer "has this
//! element been inserted?" with a small, tunable false positive rate. The
//! [`cuckoo`] module holds a cuckoo filter, which additionally supports
//! deletion and merging, and serializes to a stable cross-platform format.
//!
//! ```rust
//! use probfilter::cuckoo::CuckooFilter;
//! use probfilter::cuckoo::CuckooFilterBuilder;
//!
//! let mut filter = CuckooFilterBuilder::with_accuracy(1_000, 0.01).build();
//! filter.put(&"alpha");
//!
//! let bytes = filter.serialize();
//! let restored = CuckooFilter::deserialize(&bytes).unwrap();
//! assert!(restored.might_contain(&"alpha"));
//! ```

pub(crate) mod codec;
pub mod common;
pub mod cuckoo;
pub mod error;
pub(crate) mod hash;
