//! Protocol Module Implementation
//!
//! Wire-level building blocks of the server list ping protocol.
//!
//! # Components
//!
//! - `var_int`: VarInt/VarLong encoding with 5 and 10 byte bounds
//! - `primary_types`: big-endian fixed-width fields and length-prefixed strings
//! - `chat`: rich-text chat messages sent as the login disconnect reason
//! - `status`: the JSON document returned for a status request
//!
//! Every decoder reads from a `bytes::Buf` and fails with a `FramingError`
//! instead of returning partially decoded values.

pub use chat::{ChatComponent, ChatMessage};
pub use primary_types::{
    read_long, read_string, read_unsigned_short, write_long, write_string, write_unsigned_short,
    Long, PString, PrimaryType, UnsignedShort, VarInt, VarLong,
};
pub use status::{Description, Players, SamplePlayer, StatusResponse, Version};
pub use var_int::{
    encode_var_int, encode_var_long, read_var_int, read_var_long, var_int_size, var_long_size,
    write_var_int, write_var_long, VAR_INT_MAX_BYTES, VAR_LONG_MAX_BYTES,
};

mod chat;
mod primary_types;
mod status;
mod var_int;

/// Longest protocol string in bytes: 32767 UTF-16 code units, at most 4 bytes each, plus 3.
pub const MAX_STRING_BYTES: usize = 32767 * 4 + 3;

/// Longest player name accepted during login, in bytes.
pub const MAX_PLAYER_NAME_BYTES: usize = 16;
