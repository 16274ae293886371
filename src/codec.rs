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

//! Byte-level writer and cursor for the filter wire format.
//!
//! The serialized form is big-endian throughout, so only the big-endian
//! widths used by the preamble and payload are provided.

use std::io;
use std::io::Cursor;
use std::io::Read;

pub(crate) struct FilterBytes {
    bytes: Vec<u8>,
}

impl FilterBytes {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn write_u8(&mut self, n: u8) {
        self.bytes.push(n);
    }

    pub fn write_u32_be(&mut self, n: u32) {
        self.bytes.extend_from_slice(&n.to_be_bytes());
    }

    pub fn write_u64_be(&mut self, n: u64) {
        self.bytes.extend_from_slice(&n.to_be_bytes());
    }

    pub fn write_i64_be(&mut self, n: i64) {
        self.bytes.extend_from_slice(&n.to_be_bytes());
    }
}

pub(crate) struct FilterSlice<'a> {
    slice: Cursor<&'a [u8]>,
}

impl FilterSlice<'_> {
    pub fn new(slice: &[u8]) -> FilterSlice {
        FilterSlice {
            slice: Cursor::new(slice),
        }
    }

    fn read_array<const N: usize>(&mut self) -> io::Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.slice.read_exact(&mut buf)?;
        Ok(buf)
    }

    pub fn read_u8(&mut self) -> io::Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u32_be(&mut self) -> io::Result<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub fn read_u64_be(&mut self) -> io::Result<u64> {
        Ok(u64::from_be_bytes(self.read_array()?))
    }

    pub fn read_i64_be(&mut self) -> io::Result<i64> {
        Ok(i64::from_be_bytes(self.read_array()?))
    }
}
