//! Per-connection protocol state.
//!
//! - `state`: the Handshaking/Status/Login automaton and the registry that
//!   tracks it for every open connection
//! - `handler`: decodes packet payloads and produces replies
//! - `watchdog`: the idle timer that closes silent connections

pub use handler::{
    Handshake, SessionHandler, HANDSHAKE_PACKET_ID, LOGIN_DISCONNECT_PACKET_ID,
    LOGIN_START_PACKET_ID, PING_PACKET_ID, PONG_PACKET_ID, STATUS_REQUEST_PACKET_ID,
    STATUS_RESPONSE_PACKET_ID,
};
pub use state::{ConnectionId, ConnectionState, SessionGuard, SessionRegistry};
pub use watchdog::IdleWatchdog;

mod handler;
mod state;
mod watchdog;
