// Copyright 2025 jonefeewang@gmail.com
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Variable-length integers as used by the status protocol.
//!
//! Values are split into 7-bit groups, lowest group first, and the top bit of
//! every byte says whether another byte follows. Unlike the zig-zag varints
//! of other protocols, negative numbers are encoded from their two's-complement
//! bit pattern, so they always take the maximum number of bytes.

use bytes::{Buf, BufMut};
use integer_encoding::VarInt;

use crate::service::FramingError;
use crate::AppResult;

pub const VAR_INT_MAX_BYTES: usize = 5;
pub const VAR_LONG_MAX_BYTES: usize = 10;

const SEGMENT_BITS: u8 = 0x7F;
const CONTINUE_BIT: u8 = 0x80;

/// Reads up to `max_bytes` 7-bit groups into a u64 accumulator.
///
/// Bits shifted past the target width are dropped by the caller's truncating
/// cast, which gives the same wraparound as a native 32/64-bit shift.
fn read_var<B: Buf>(source: &mut B, max_bytes: usize) -> AppResult<(u64, usize)> {
    let mut value = 0u64;
    let mut position = 0usize;
    loop {
        if !source.has_remaining() {
            return Err(FramingError::UnexpectedEndOfInput.into());
        }
        let byte = source.get_u8();
        value |= u64::from(byte & SEGMENT_BITS) << (7 * position);
        position += 1;

        if byte & CONTINUE_BIT == 0 {
            return Ok((value, position));
        }
        if position >= max_bytes {
            return Err(FramingError::IntegerTooLong(max_bytes).into());
        }
    }
}

/// Decodes a VarInt, returning the value and the number of bytes consumed.
pub fn read_var_int<B: Buf>(source: &mut B) -> AppResult<(i32, usize)> {
    let (value, read) = read_var(source, VAR_INT_MAX_BYTES)?;
    Ok((value as u32 as i32, read))
}

/// Decodes a VarLong, returning the value and the number of bytes consumed.
pub fn read_var_long<B: Buf>(source: &mut B) -> AppResult<(i64, usize)> {
    let (value, read) = read_var(source, VAR_LONG_MAX_BYTES)?;
    Ok((value as i64, read))
}

/// Writes `value` and returns the number of bytes written.
pub fn write_var_int<B: BufMut>(sink: &mut B, value: i32) -> usize {
    let mut scratch = [0u8; VAR_INT_MAX_BYTES];
    let written = (value as u32).encode_var(&mut scratch);
    sink.put_slice(&scratch[..written]);
    written
}

pub fn write_var_long<B: BufMut>(sink: &mut B, value: i64) -> usize {
    let mut scratch = [0u8; VAR_LONG_MAX_BYTES];
    let written = (value as u64).encode_var(&mut scratch);
    sink.put_slice(&scratch[..written]);
    written
}

pub fn encode_var_int(value: i32) -> Vec<u8> {
    (value as u32).encode_var_vec()
}

pub fn encode_var_long(value: i64) -> Vec<u8> {
    (value as u64).encode_var_vec()
}

pub fn var_int_size(value: i32) -> usize {
    (value as u32).required_space()
}

pub fn var_long_size(value: i64) -> usize {
    (value as u64).required_space()
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;
    use rstest::rstest;

    use super::*;
    use crate::AppError;

    #[rstest]
    #[case(0, &[0x00])]
    #[case(1, &[0x01])]
    #[case(127, &[0x7f])]
    #[case(128, &[0x80, 0x01])]
    #[case(255, &[0xff, 0x01])]
    #[case(25565, &[0xdd, 0xc7, 0x01])]
    #[case(2097151, &[0xff, 0xff, 0x7f])]
    #[case(i32::MAX, &[0xff, 0xff, 0xff, 0xff, 0x07])]
    #[case(-1, &[0xff, 0xff, 0xff, 0xff, 0x0f])]
    #[case(i32::MIN, &[0x80, 0x80, 0x80, 0x80, 0x08])]
    fn test_var_int_known_encodings(#[case] value: i32, #[case] expected: &[u8]) {
        assert_eq!(encode_var_int(value), expected);
        assert_eq!(var_int_size(value), expected.len());

        let mut source = expected;
        assert_eq!(read_var_int(&mut source).unwrap(), (value, expected.len()));
        assert!(source.is_empty());
    }

    #[rstest]
    #[case(0, &[0x00])]
    #[case(2147483647, &[0xff, 0xff, 0xff, 0xff, 0x07])]
    #[case(i64::MAX, &[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x7f])]
    #[case(-1, &[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01])]
    #[case(i64::MIN, &[0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x01])]
    fn test_var_long_known_encodings(#[case] value: i64, #[case] expected: &[u8]) {
        assert_eq!(encode_var_long(value), expected);
        assert_eq!(var_long_size(value), expected.len());

        let mut source = expected;
        assert_eq!(read_var_long(&mut source).unwrap(), (value, expected.len()));
    }

    #[test]
    fn test_var_int_stops_at_terminating_byte() {
        let mut writer = BytesMut::new();
        assert_eq!(write_var_int(&mut writer, 300), 2);
        writer.put_u8(0xAB);

        let (value, read) = read_var_int(&mut writer).unwrap();
        assert_eq!((value, read), (300, 2));
        assert_eq!(&writer[..], &[0xAB]);
    }

    #[test]
    fn test_var_int_sampled_roundtrip() {
        let mut value: i32 = 1;
        while value > 0 {
            for candidate in [value - 1, value, value.saturating_add(value / 3)] {
                let mut writer = BytesMut::new();
                let written = write_var_int(&mut writer, candidate);
                assert!(written <= VAR_INT_MAX_BYTES);
                assert_eq!(read_var_int(&mut writer).unwrap(), (candidate, written));
            }
            value = value.wrapping_mul(2);
        }
    }

    #[test]
    fn test_var_long_sampled_roundtrip() {
        let mut value: i64 = 1;
        for _ in 0..64 {
            for candidate in [value, value.wrapping_neg(), value.wrapping_sub(1)] {
                let mut writer = BytesMut::new();
                let written = write_var_long(&mut writer, candidate);
                assert!(written <= VAR_LONG_MAX_BYTES);
                assert_eq!(read_var_long(&mut writer).unwrap(), (candidate, written));
            }
            value = value.wrapping_mul(2);
        }
    }

    #[test]
    fn test_var_int_too_long() {
        let mut source: &[u8] = &[0x80, 0x80, 0x80, 0x80, 0x80, 0x01];
        let err = read_var_int(&mut source).unwrap_err();
        assert!(matches!(
            err,
            AppError::Framing(FramingError::IntegerTooLong(VAR_INT_MAX_BYTES))
        ));
    }

    #[test]
    fn test_var_long_too_long() {
        let mut source: &[u8] = &[0xff; 11];
        let err = read_var_long(&mut source).unwrap_err();
        assert!(matches!(
            err,
            AppError::Framing(FramingError::IntegerTooLong(VAR_LONG_MAX_BYTES))
        ));
    }

    #[rstest]
    #[case(&[])]
    #[case(&[0x80])]
    #[case(&[0xff, 0xff, 0xff])]
    fn test_var_int_truncated(#[case] bytes: &[u8]) {
        let mut source = bytes;
        let err = read_var_int(&mut source).unwrap_err();
        assert!(matches!(
            err,
            AppError::Framing(FramingError::UnexpectedEndOfInput)
        ));
    }
}
