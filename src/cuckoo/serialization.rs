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

//! Cuckoo filter wire format.
//!
//! All fields are big-endian:
//!
//! | bytes | field |
//! |---|---|
//! | 1 | serial version |
//! | 1 | family id |
//! | 1 | strategy ordinal |
//! | 1 | reserved |
//! | 8 | num_buckets |
//! | 4 | num_entries_per_bucket |
//! | 4 | num_bits_per_entry |
//! | 8 | size |
//! | 8 | checksum |
//! | 8n | packed entry words |
//!
//! The word count is derived from the shape, so the payload length is fully
//! determined by the preamble.

use std::io;

use crate::codec::FilterBytes;
use crate::codec::FilterSlice;
use crate::cuckoo::sketch::CuckooFilter;
use crate::cuckoo::sketch::DEFAULT_EVICTION_SEED;
use crate::cuckoo::strategy::CuckooStrategy;
use crate::cuckoo::table;
use crate::cuckoo::table::CuckooTable;
use crate::error::Error;
use crate::error::ErrorKind;

const SERIAL_VERSION: u8 = 1;
const FAMILY_ID: u8 = 23;
const PREAMBLE_BYTES: usize = 4 + 8 + 4 + 4 + 8 + 8;

impl CuckooFilter {
    /// Serializes the filter to a byte vector.
    ///
    /// # Examples
    ///
    /// ```
    /// # use probfilter::cuckoo::CuckooFilter;
    /// # use probfilter::cuckoo::CuckooFilterBuilder;
    /// let mut filter = CuckooFilterBuilder::with_accuracy(100, 0.01).build();
    /// filter.put(&"test");
    ///
    /// let bytes = filter.serialize();
    /// let restored = CuckooFilter::deserialize(&bytes).unwrap();
    /// assert!(restored.might_contain(&"test"));
    /// ```
    pub fn serialize(&self) -> Vec<u8> {
        let table = self.table();
        let mut bytes = FilterBytes::with_capacity(PREAMBLE_BYTES + table.words().len() * 8);

        bytes.write_u8(SERIAL_VERSION);
        bytes.write_u8(FAMILY_ID);
        bytes.write_u8(self.strategy().ordinal());
        bytes.write_u8(0); // reserved

        bytes.write_u64_be(table.num_buckets());
        bytes.write_u32_be(table.num_entries_per_bucket());
        bytes.write_u32_be(table.num_bits_per_entry());
        bytes.write_u64_be(table.size());
        bytes.write_i64_be(table.checksum());

        for &word in table.words() {
            bytes.write_u64_be(word);
        }

        bytes.into_bytes()
    }

    /// Deserializes a filter from bytes.
    ///
    /// The relocation generator of the restored filter starts from the
    /// default seed; it is not part of the wire format.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::MalformedDeserializeData`] if the data is
    /// truncated, carries an unknown family, version or strategy, declares
    /// an invalid table shape, or fails the size/checksum recount.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        let mut cursor = FilterSlice::new(bytes);

        let serial_version = cursor.read_u8().map_err(read_err("serial_version"))?;
        let family_id = cursor.read_u8().map_err(read_err("family_id"))?;
        let strategy_ordinal = cursor.read_u8().map_err(read_err("strategy"))?;
        cursor.read_u8().map_err(read_err("reserved"))?;

        if family_id != FAMILY_ID {
            return Err(Error::invalid_family(FAMILY_ID, family_id));
        }
        if serial_version != SERIAL_VERSION {
            return Err(Error::unsupported_serial_version(
                SERIAL_VERSION,
                serial_version,
            ));
        }
        let strategy = CuckooStrategy::from_ordinal(strategy_ordinal)
            .ok_or_else(|| Error::unknown_strategy(strategy_ordinal))?;

        let num_buckets = cursor.read_u64_be().map_err(read_err("num_buckets"))?;
        let num_entries_per_bucket = cursor
            .read_u32_be()
            .map_err(read_err("num_entries_per_bucket"))?;
        let num_bits_per_entry = cursor
            .read_u32_be()
            .map_err(read_err("num_bits_per_entry"))?;
        let size = cursor.read_u64_be().map_err(read_err("size"))?;
        let checksum = cursor.read_i64_be().map_err(read_err("checksum"))?;

        // Validate the shape before sizing the payload read from it.
        if let Err(message) =
            table::check_shape(num_buckets, num_entries_per_bucket, num_bits_per_entry)
        {
            return Err(Error::new(ErrorKind::MalformedDeserializeData, message)
                .with_context("num_buckets", num_buckets)
                .with_context("num_entries_per_bucket", num_entries_per_bucket)
                .with_context("num_bits_per_entry", num_bits_per_entry));
        }
        let words =
            table::required_words(num_buckets, num_entries_per_bucket, num_bits_per_entry)
                .ok_or_else(|| {
                    Error::new(
                        ErrorKind::MalformedDeserializeData,
                        "table shape overflows the addressable bit range",
                    )
                    .with_context("num_buckets", num_buckets)
                })?;

        // Cap the preallocation by the input length so a hostile preamble
        // cannot demand an allocation the payload can never back.
        let mut data = Vec::with_capacity(words.min(bytes.len() / 8));
        for _ in 0..words {
            data.push(cursor.read_u64_be().map_err(read_err("data"))?);
        }

        let table = CuckooTable::from_parts(
            num_buckets,
            num_entries_per_bucket,
            num_bits_per_entry,
            data,
            size,
            checksum,
        )?;

        let (actual_size, actual_checksum) = table.recount();
        if actual_size != size || actual_checksum != checksum {
            return Err(Error::new(
                ErrorKind::MalformedDeserializeData,
                "size or checksum does not match the payload",
            )
            .with_context("declared_size", size)
            .with_context("actual_size", actual_size)
            .with_context("declared_checksum", checksum)
            .with_context("actual_checksum", actual_checksum));
        }

        Ok(CuckooFilter::from_parts(
            strategy,
            table,
            DEFAULT_EVICTION_SEED,
        ))
    }
}

fn read_err(field: &'static str) -> impl FnOnce(io::Error) -> Error {
    move |err| Error::insufficient_data(field).set_source(err)
}
