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

//! MurmurHash3 x64 128-bit hashing.
//!
//! The filter wire format depends on every implementation producing the
//! same bits for the same logical input, so the `Hasher` integer writes are
//! canonicalized to little-endian instead of using the native byte order.

use std::hash::Hasher;

const C1: u64 = 0x87c3_7b91_1142_53d5;
const C2: u64 = 0x4cf5_ad43_2745_937f;

/// One-shot MurmurHash3 x64 128-bit hash of a byte slice.
pub fn murmur3_x64_128(bytes: &[u8], seed: u64) -> (u64, u64) {
    let mut h1 = seed;
    let mut h2 = seed;

    let mut blocks = bytes.chunks_exact(16);
    for block in &mut blocks {
        let k1 = read_u64_le(&block[0..8]);
        let k2 = read_u64_le(&block[8..16]);
        (h1, h2) = mix_block(h1, h2, k1, k2);
    }

    let (h1, h2) = mix_tail(h1, h2, blocks.remainder());
    finalize(h1, h2, bytes.len() as u64)
}

/// Hashes a 32-bit integer the way the object hash treats a 4-byte value,
/// returning the low 32 bits of the first hash word.
pub fn hash_int(value: i32) -> i32 {
    let (h1, _) = murmur3_x64_128(&value.to_le_bytes(), 0);
    h1 as i32
}

/// Streaming MurmurHash3 x64 128-bit hasher.
///
/// Buffers input into 16-byte blocks; `finish128` folds the buffered tail
/// without consuming the hasher state, so it can be called repeatedly.
#[derive(Debug, Clone)]
pub struct MurmurHash3X64128 {
    h1: u64,
    h2: u64,
    buffer: [u8; 16],
    buffer_len: usize,
    total_len: u64,
}

impl MurmurHash3X64128 {
    pub fn with_seed(seed: u64) -> Self {
        MurmurHash3X64128 {
            h1: seed,
            h2: seed,
            buffer: [0; 16],
            buffer_len: 0,
            total_len: 0,
        }
    }

    /// Returns both 64-bit halves of the 128-bit hash.
    pub fn finish128(&self) -> (u64, u64) {
        let (h1, h2) = mix_tail(self.h1, self.h2, &self.buffer[..self.buffer_len]);
        finalize(h1, h2, self.total_len)
    }

    fn process_buffer(&mut self) {
        let k1 = read_u64_le(&self.buffer[0..8]);
        let k2 = read_u64_le(&self.buffer[8..16]);
        (self.h1, self.h2) = mix_block(self.h1, self.h2, k1, k2);
        self.buffer_len = 0;
    }
}

impl Hasher for MurmurHash3X64128 {
    fn finish(&self) -> u64 {
        self.finish128().0
    }

    fn write(&mut self, mut bytes: &[u8]) {
        self.total_len += bytes.len() as u64;

        if self.buffer_len > 0 {
            let take = (16 - self.buffer_len).min(bytes.len());
            self.buffer[self.buffer_len..self.buffer_len + take].copy_from_slice(&bytes[..take]);
            self.buffer_len += take;
            bytes = &bytes[take..];
            if self.buffer_len == 16 {
                self.process_buffer();
            } else {
                return;
            }
        }

        let mut blocks = bytes.chunks_exact(16);
        for block in &mut blocks {
            let k1 = read_u64_le(&block[0..8]);
            let k2 = read_u64_le(&block[8..16]);
            (self.h1, self.h2) = mix_block(self.h1, self.h2, k1, k2);
        }

        let remainder = blocks.remainder();
        self.buffer[..remainder.len()].copy_from_slice(remainder);
        self.buffer_len = remainder.len();
    }

    fn write_u8(&mut self, i: u8) {
        self.write(&[i]);
    }

    fn write_u16(&mut self, i: u16) {
        self.write(&i.to_le_bytes());
    }

    fn write_u32(&mut self, i: u32) {
        self.write(&i.to_le_bytes());
    }

    fn write_u64(&mut self, i: u64) {
        self.write(&i.to_le_bytes());
    }

    fn write_u128(&mut self, i: u128) {
        self.write(&i.to_le_bytes());
    }

    // usize is hashed as 8 bytes so 32-bit and 64-bit targets agree.
    fn write_usize(&mut self, i: usize) {
        self.write(&(i as u64).to_le_bytes());
    }
}

fn mix_block(mut h1: u64, mut h2: u64, mut k1: u64, mut k2: u64) -> (u64, u64) {
    k1 = k1.wrapping_mul(C1).rotate_left(31).wrapping_mul(C2);
    h1 ^= k1;
    h1 = h1
        .rotate_left(27)
        .wrapping_add(h2)
        .wrapping_mul(5)
        .wrapping_add(0x52dc_e729);

    k2 = k2.wrapping_mul(C2).rotate_left(33).wrapping_mul(C1);
    h2 ^= k2;
    h2 = h2
        .rotate_left(31)
        .wrapping_add(h1)
        .wrapping_mul(5)
        .wrapping_add(0x3849_5ab5);

    (h1, h2)
}

// Mixing a zero word leaves the state untouched, so short tails can load
// both words unconditionally.
fn mix_tail(mut h1: u64, mut h2: u64, tail: &[u8]) -> (u64, u64) {
    if tail.is_empty() {
        return (h1, h2);
    }
    debug_assert!(tail.len() < 16);

    let split = tail.len().min(8);
    let k1 = read_u64_le(&tail[..split]);
    let k2 = read_u64_le(&tail[split..]);

    h1 ^= k1.wrapping_mul(C1).rotate_left(31).wrapping_mul(C2);
    h2 ^= k2.wrapping_mul(C2).rotate_left(33).wrapping_mul(C1);
    (h1, h2)
}

fn finalize(mut h1: u64, mut h2: u64, len: u64) -> (u64, u64) {
    h1 ^= len;
    h2 ^= len;

    h1 = h1.wrapping_add(h2);
    h2 = h2.wrapping_add(h1);

    h1 = fmix64(h1);
    h2 = fmix64(h2);

    h1 = h1.wrapping_add(h2);
    h2 = h2.wrapping_add(h1);
    (h1, h2)
}

fn fmix64(mut k: u64) -> u64 {
    k ^= k >> 33;
    k = k.wrapping_mul(0xff51_afd7_ed55_8ccd);
    k ^= k >> 33;
    k = k.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    k ^= k >> 33;
    k
}

/// Reads up to 8 little-endian bytes, zero-padding the high end.
fn read_u64_le(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf[..bytes.len()].copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use std::hash::Hash;

    use super::*;

    #[test]
    fn test_reference_vectors() {
        // remainder > 8
        let key = "The quick brown fox jumps over the lazy dog";
        let (h1, h2) = murmur3_x64_128(key.as_bytes(), 0);
        assert_eq!(h1, 0xe34bbc7bbc071b6c);
        assert_eq!(h2, 0x7a433ca9c49a9347);

        // change one bit
        let key = "The quick brown fox jumps over the lazy eog";
        let (h1, h2) = murmur3_x64_128(key.as_bytes(), 0);
        assert_eq!(h1, 0x362108102c62d1c9);
        assert_eq!(h2, 0x3285cd100292b305);

        // remainder < 8
        let key = "The quick brown fox jumps over the lazy dogdogdog";
        let (h1, h2) = murmur3_x64_128(key.as_bytes(), 0);
        assert_eq!(h1, 0x9c8205300e612fc4);
        assert_eq!(h2, 0xcbc0af6136aa3df9);

        // remainder = 8
        let key = "The quick brown fox jumps over the lazy1";
        let (h1, h2) = murmur3_x64_128(key.as_bytes(), 0);
        assert_eq!(h1, 0xe3301a827e5cdfe3);
        assert_eq!(h2, 0xbdbf05f8da0f0392);

        // remainder = 0
        let key = "The quick brown fox jumps over t";
        let (h1, h2) = murmur3_x64_128(key.as_bytes(), 0);
        assert_eq!(h1, 0xdf6af91bb29bdacf);
        assert_eq!(h2, 0x91a341c58df1f3a6);
    }

    #[test]
    fn test_matches_mur3_crate() {
        let mut payload = Vec::new();
        for len in 0..64u8 {
            payload.push(len.wrapping_mul(37) ^ 0x5a);
            for seed in [0u64, 1, 9001] {
                let expected = mur3::murmurhash3_x64_128(&payload, seed as u32);
                assert_eq!(murmur3_x64_128(&payload, seed), expected, "len {len}");
            }
        }
    }

    #[test]
    fn test_empty_input() {
        let (h1, h2) = murmur3_x64_128(&[], 0);
        assert_eq!((h1, h2), mur3::murmurhash3_x64_128(&[], 0));
    }

    #[test]
    fn test_streaming_matches_one_shot() {
        let payload: Vec<u8> = (0u8..=255).collect();
        let expected = murmur3_x64_128(&payload, 42);

        for chunk_size in [1, 3, 7, 15, 16, 17, 64] {
            let mut hasher = MurmurHash3X64128::with_seed(42);
            for chunk in payload.chunks(chunk_size) {
                hasher.write(chunk);
            }
            assert_eq!(hasher.finish128(), expected, "chunk size {chunk_size}");
        }
    }

    #[test]
    fn test_finish128_is_repeatable() {
        let mut hasher = MurmurHash3X64128::with_seed(0);
        hasher.write(b"alpha");
        assert_eq!(hasher.finish128(), hasher.finish128());
    }

    #[test]
    fn test_integer_writes_are_little_endian() {
        let mut hasher = MurmurHash3X64128::with_seed(0);
        0x0102_0304_0506_0708u64.hash(&mut hasher);
        let direct = murmur3_x64_128(&[8, 7, 6, 5, 4, 3, 2, 1], 0);
        assert_eq!(hasher.finish128(), direct);
    }

    #[test]
    fn test_hash_int_is_low_word() {
        let (h1, _) = murmur3_x64_128(&7i32.to_le_bytes(), 0);
        assert_eq!(hash_int(7), h1 as i32);
        assert_ne!(hash_int(7), hash_int(8));
    }
}
