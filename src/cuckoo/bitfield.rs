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

//! Packed unsigned integers in a word array.
//!
//! Fields are 1 to 32 bits wide and live at arbitrary bit offsets, little
//! endian within each 64-bit word. Bit `k` of a field value sits at bit
//! `(offset + k) % 64` of word `(offset + k) / 64`, so a field may span two
//! adjacent words.

/// Returns the `len`-bit unsigned value stored at `bit_offset`.
///
/// A field whose upper half would fall past the end of `data` reads that
/// half as zero.
pub(crate) fn read(data: &[u64], bit_offset: u64, len: u32) -> u32 {
    debug_assert!((1..=32).contains(&len));
    let word = (bit_offset / 64) as usize;
    let shift = (bit_offset % 64) as u32;
    let mask = field_mask(len);

    if shift + len <= 64 {
        return ((data[word] >> shift) & mask) as u32;
    }

    let lower_len = 64 - shift;
    let lower = data[word] >> shift;
    let upper = if word + 1 < data.len() {
        data[word + 1]
    } else {
        0
    };
    (((upper << lower_len) | lower) & mask) as u32
}

/// Stores the low `len` bits of `bits` at `bit_offset` and returns the
/// previous field value. All bits outside the field are preserved.
pub(crate) fn write(bits: u32, data: &mut [u64], bit_offset: u64, len: u32) -> u32 {
    debug_assert!((1..=32).contains(&len));
    let previous = read(data, bit_offset, len);

    let mask = field_mask(len);
    let value = u64::from(bits) & mask;
    let word = (bit_offset / 64) as usize;
    let shift = (bit_offset % 64) as u32;

    if shift + len <= 64 {
        data[word] = (data[word] & !(mask << shift)) | (value << shift);
    } else {
        let lower_len = 64 - shift;
        let upper_mask = field_mask(len - lower_len);
        data[word] = (data[word] & !(u64::MAX << shift)) | (value << shift);
        data[word + 1] = (data[word + 1] & !upper_mask) | (value >> lower_len);
    }
    previous
}

fn field_mask(len: u32) -> u64 {
    debug_assert!((1..=32).contains(&len));
    u64::MAX >> (64 - len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_every_width() {
        for len in 1..=32u32 {
            let mask = if len == 32 {
                u32::MAX
            } else {
                (1u32 << len) - 1
            };
            let value = 0xdead_beef & mask;
            for bit_offset in [0u64, 1, 5, 63, 64, 100, 127] {
                let mut data = [0u64; 4];
                let previous = write(value, &mut data, bit_offset, len);
                assert_eq!(previous, 0);
                assert_eq!(read(&data, bit_offset, len), value, "len {len} at {bit_offset}");
            }
        }
    }

    #[test]
    fn test_write_returns_previous_value() {
        let mut data = [0u64; 2];
        assert_eq!(write(0x15, &mut data, 60, 7), 0);
        assert_eq!(write(0x2a, &mut data, 60, 7), 0x15);
        assert_eq!(read(&data, 60, 7), 0x2a);
    }

    #[test]
    fn test_word_boundary_field() {
        let mut data = [0u64; 2];
        write(0xff, &mut data, 60, 8);
        assert_eq!(data[0] >> 60, 0xf);
        assert_eq!(data[1] & 0xf, 0xf);
        assert_eq!(read(&data, 60, 8), 0xff);
    }

    #[test]
    fn test_write_preserves_neighboring_bits() {
        let mut data = [u64::MAX; 3];
        write(0, &mut data, 90, 17);
        for bit in 0..(3 * 64) {
            let expected = if (90..107).contains(&bit) { 0 } else { 1 };
            assert_eq!(read(&data, bit, 1), expected, "bit {bit}");
        }
    }

    #[test]
    fn test_upper_word_past_end_reads_zero() {
        let data = [u64::MAX];
        // Field occupies bits 40..72; only 40..64 are backed by storage.
        assert_eq!(read(&data, 40, 32), 0x00ff_ffff);
    }

    #[test]
    fn test_isolated_write_in_large_array() {
        let mut data = [0u64; 23];
        write(0xaa, &mut data, 1285, 8);
        assert_eq!(read(&data, 1285, 8), 0xaa);
        for bit in 0..(23 * 64u64) {
            let expected = if (1285..1293).contains(&bit) {
                (0xaau64 >> (bit - 1285)) as u32 & 1
            } else {
                0
            };
            assert_eq!(read(&data, bit, 1), expected, "bit {bit}");
        }
    }
}
