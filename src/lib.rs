mod network;
mod protocol;
mod service;
mod session;
mod stats;

pub use network::{read_packet, write_packet, Connection, Packet};
pub use protocol::{
    encode_var_int, encode_var_long, read_long, read_string, read_unsigned_short, read_var_int,
    read_var_long, var_int_size, var_long_size, write_long, write_string, write_unsigned_short,
    write_var_int, write_var_long, ChatComponent, ChatMessage, StatusResponse,
    MAX_PLAYER_NAME_BYTES, MAX_STRING_BYTES,
};
pub use service::{
    apply_favicon, load_favicon, setup_tracing, AppError, AppResult, ErrorCategory, FramingError,
    LogConfig, LoginAttemptConfig, MotdConfig, NetworkConfig, ProtocolViolation, ServerConfig,
    Shutdown, StatsConfig, StatusServer,
};
pub use session::{
    ConnectionId, ConnectionState, Handshake, SessionHandler, SessionRegistry, HANDSHAKE_PACKET_ID,
    LOGIN_DISCONNECT_PACKET_ID, LOGIN_START_PACKET_ID, PING_PACKET_ID, PONG_PACKET_ID,
    STATUS_REQUEST_PACKET_ID, STATUS_RESPONSE_PACKET_ID,
};
pub use stats::{HourlyStats, StatsData, StatsRecorder};
