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

use bytes::{Buf, BufMut};

use super::var_int::{read_var_int, read_var_long, var_int_size, var_long_size};
use super::var_int::{write_var_int, write_var_long};
use super::MAX_STRING_BYTES;
use crate::service::FramingError;
use crate::AppResult;

///
/// Field types carried inside packet payloads: VarInt, VarLong, UnsignedShort,
/// Long and PString. Each one reads from any `Buf` and writes to any `BufMut`,
/// so the same code serves socket buffers and plain byte slices.
///
macro_rules! define_type {
    ($type_name:ident, $inner_type:ty) => {
        #[derive(Debug, Default, Clone, PartialEq, Eq)]
        pub struct $type_name {
            pub value: $inner_type,
        }
        impl From<$inner_type> for $type_name {
            fn from(value: $inner_type) -> Self {
                Self { value }
            }
        }
    };
}

macro_rules! implement_primary_type {
    ($type:ident, $read_method:ident, $write_method:ident, $size:expr) => {
        impl PrimaryType for $type {
            fn decode<B: Buf>(buffer: &mut B) -> AppResult<Self> {
                if buffer.remaining() < $size {
                    return Err(FramingError::UnexpectedEndOfInput.into());
                }
                Ok($type {
                    value: buffer.$read_method(),
                })
            }
            fn encode<B: BufMut>(&self, writer: &mut B) -> AppResult<()> {
                writer.$write_method(self.value);
                Ok(())
            }
            fn wire_format_size(&self) -> usize {
                $size
            }
        }
    };
}

macro_rules! implement_var_type {
    ($t:ident, $read_method:path, $write_method:path, $required_space:path) => {
        impl PrimaryType for $t {
            fn decode<B: Buf>(buffer: &mut B) -> AppResult<Self> {
                let (value, _) = $read_method(buffer)?;
                Ok($t { value })
            }
            fn encode<B: BufMut>(&self, writer: &mut B) -> AppResult<()> {
                $write_method(writer, self.value);
                Ok(())
            }
            fn wire_format_size(&self) -> usize {
                $required_space(self.value)
            }
        }
    };
}

pub trait PrimaryType: Sized {
    fn decode<B: Buf>(buffer: &mut B) -> AppResult<Self>;
    fn encode<B: BufMut>(&self, writer: &mut B) -> AppResult<()>;

    fn wire_format_size(&self) -> usize;
}

define_type!(VarInt, i32);
define_type!(VarLong, i64);
define_type!(UnsignedShort, u16);
define_type!(Long, i64);
define_type!(PString, String);

implement_primary_type!(UnsignedShort, get_u16, put_u16, 2);
implement_primary_type!(Long, get_i64, put_i64, 8);

implement_var_type!(VarInt, read_var_int, write_var_int, var_int_size);
implement_var_type!(VarLong, read_var_long, write_var_long, var_long_size);

impl PrimaryType for PString {
    fn decode<B: Buf>(buffer: &mut B) -> AppResult<Self> {
        read_string(buffer).map(PString::from)
    }
    fn encode<B: BufMut>(&self, writer: &mut B) -> AppResult<()> {
        write_string(writer, &self.value).map(|_| ())
    }
    fn wire_format_size(&self) -> usize {
        let length = self.value.len();
        var_int_size(length as i32) + length
    }
}

pub fn read_unsigned_short<B: Buf>(buffer: &mut B) -> AppResult<u16> {
    UnsignedShort::decode(buffer).map(|v| v.value)
}

pub fn write_unsigned_short<B: BufMut>(writer: &mut B, value: u16) {
    writer.put_u16(value);
}

pub fn read_long<B: Buf>(buffer: &mut B) -> AppResult<i64> {
    Long::decode(buffer).map(|v| v.value)
}

pub fn write_long<B: BufMut>(writer: &mut B, value: i64) {
    writer.put_i64(value);
}

fn check_string_length(length: usize) -> AppResult<()> {
    if length == 0 || length > MAX_STRING_BYTES {
        return Err(FramingError::InvalidStringLength(length).into());
    }
    Ok(())
}

/// Reads a byte-length prefixed UTF-8 string.
///
/// The length is validated before any string byte is taken from the buffer.
pub fn read_string<B: Buf>(buffer: &mut B) -> AppResult<String> {
    let (length, _) = read_var_int(buffer)?;
    let length = usize::try_from(length)
        .map_err(|_| FramingError::InvalidStringLength(length as u32 as usize))?;
    check_string_length(length)?;
    if buffer.remaining() < length {
        return Err(FramingError::UnexpectedEndOfInput.into());
    }
    let mut bytes = vec![0u8; length];
    buffer.copy_to_slice(&mut bytes);
    String::from_utf8(bytes).map_err(|_| FramingError::InvalidStringEncoding.into())
}

/// Writes `value` with its byte-length prefix and returns the total bytes written.
pub fn write_string<B: BufMut>(writer: &mut B, value: &str) -> AppResult<usize> {
    let length = value.len();
    check_string_length(length)?;
    let prefix = write_var_int(writer, length as i32);
    writer.put_slice(value.as_bytes());
    Ok(prefix + length)
}
