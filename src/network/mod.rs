//! Network Module Implementation
//!
//! Packet framing and per-connection I/O for the status listener.
//!
//! # Components
//!
//! - `Packet`: a decoded frame (packet id plus opaque payload), with the
//!   incremental parser used on the read side and the encoder used for replies
//! - `Connection`: a TCP stream with its read buffer; yields whole packets and
//!   writes framed replies
//!
//! Every frame on the wire is `VarInt length | VarInt packet id | payload`,
//! where the length covers the id and the payload.

pub use connection::Connection;
pub use frame::{read_packet, write_packet, Packet};
mod connection;
mod frame;
