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

use std::borrow::Cow;

use crate::session::ConnectionState;

pub type AppResult<T> = Result<T, AppError>;

/// Violations of the wire format itself. Any of these ends the connection
/// without a reply.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FramingError {
    #[error("unexpected end of input")]
    UnexpectedEndOfInput,

    #[error("variable-length integer longer than {0} bytes")]
    IntegerTooLong(usize),

    #[error("string length {0} outside of [1, {max}]", max = crate::protocol::MAX_STRING_BYTES)]
    InvalidStringLength(usize),

    #[error("string is not valid utf-8")]
    InvalidStringEncoding,

    #[error("invalid frame length {0}")]
    InvalidFrameLength(i32),

    #[error("frame of {0} bytes does not fit a varint length prefix")]
    FrameTooLarge(usize),

    #[error("invalid packet id {0}")]
    InvalidPacketId(i32),
}

/// Well-formed packets the session refuses to act on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolViolation {
    #[error("could not find any state for value: {0}")]
    UnknownStateValue(i32),

    #[error("player name of {0} bytes exceeds 16 bytes")]
    PlayerNameTooLong(usize),

    #[error("unexpected packet id {id} in state {state:?}")]
    UnexpectedPacket { state: ConnectionState, id: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Framing,
    Protocol,
    Transport,
    Internal,
    Startup,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("malformed frame: {0}")]
    Framing(#[from] FramingError),

    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("illegal state: {0}")]
    IllegalStateError(Cow<'static, str>),

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("Accept error = {0}")]
    Accept(String),

    #[error("config file error: {0}")]
    ConfigFileError(#[from] config::ConfigError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("tracing setup error: {0}")]
    TracingSetup(#[from] tracing_subscriber::util::TryInitError),

    /// marker error
    #[error("incomplete frame")]
    Incomplete,
}

impl AppError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::Framing(_) | AppError::Incomplete => ErrorCategory::Framing,
            AppError::Protocol(_) => ErrorCategory::Protocol,
            AppError::IoError(_) => ErrorCategory::Transport,
            AppError::Serialization(_) | AppError::IllegalStateError(_) => ErrorCategory::Internal,
            AppError::InvalidValue(_)
            | AppError::Accept(_)
            | AppError::ConfigFileError(_)
            | AppError::Bind { .. }
            | AppError::TracingSetup(_) => ErrorCategory::Startup,
        }
    }

    /// Fatal errors indicate a bug or a broken environment rather than a
    /// misbehaving client.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Internal | ErrorCategory::Startup
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_follows_category() {
        let framing = AppError::from(FramingError::IntegerTooLong(5));
        assert_eq!(framing.category(), ErrorCategory::Framing);
        assert!(!framing.is_fatal());

        let protocol = AppError::from(ProtocolViolation::UnknownStateValue(3));
        assert_eq!(protocol.category(), ErrorCategory::Protocol);
        assert!(!protocol.is_fatal());

        let io = AppError::from(std::io::Error::from(std::io::ErrorKind::ConnectionReset));
        assert_eq!(io.category(), ErrorCategory::Transport);
        assert!(!io.is_fatal());

        let internal = AppError::IllegalStateError("registry entry missing".into());
        assert!(internal.is_fatal());

        let bind = AppError::Bind {
            address: "localhost:25565".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::AddrInUse),
        };
        assert_eq!(bind.category(), ErrorCategory::Startup);
        assert!(bind.to_string().starts_with("failed to bind localhost:25565: "));
    }

    #[test]
    fn test_unknown_state_message() {
        let err = AppError::from(ProtocolViolation::UnknownStateValue(7));
        assert_eq!(
            err.to_string(),
            "protocol violation: could not find any state for value: 7"
        );
    }
}
