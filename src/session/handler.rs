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

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tracing::{debug, info};

use super::{ConnectionId, ConnectionState, SessionRegistry};
use crate::network::Packet;
use crate::protocol::{
    read_string, write_string, Long, PString, PrimaryType, StatusResponse, UnsignedShort, VarInt,
    MAX_PLAYER_NAME_BYTES,
};
use crate::service::{ProtocolViolation, ServerConfig};
use crate::stats::StatsRecorder;
use crate::{AppError, AppResult};

pub const HANDSHAKE_PACKET_ID: i32 = 0x00;
pub const STATUS_REQUEST_PACKET_ID: i32 = 0x00;
pub const STATUS_RESPONSE_PACKET_ID: i32 = 0x00;
pub const PING_PACKET_ID: i32 = 0x01;
pub const PONG_PACKET_ID: i32 = 0x01;
pub const LOGIN_START_PACKET_ID: i32 = 0x00;
pub const LOGIN_DISCONNECT_PACKET_ID: i32 = 0x00;

/// Fields of a handshake packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub protocol_version: i32,
    pub server_address: String,
    pub port: u16,
    pub next_state: i32,
}

impl Handshake {
    pub fn read_from(payload: &mut Bytes) -> AppResult<Handshake> {
        Ok(Handshake {
            protocol_version: VarInt::decode(payload)?.value,
            server_address: PString::decode(payload)?.value,
            port: UnsignedShort::decode(payload)?.value,
            next_state: VarInt::decode(payload)?.value,
        })
    }
}

/// The per-connection state machine.
///
/// One instance is shared by all connections; the per-connection part lives in
/// the [`SessionRegistry`]. Both reply documents are serialized once at
/// construction since the configuration never changes while serving.
#[derive(Debug)]
pub struct SessionHandler {
    registry: Arc<SessionRegistry>,
    stats: Arc<dyn StatsRecorder>,
    status_payload: Bytes,
    disconnect_payload: Bytes,
}

impl SessionHandler {
    pub fn new(
        config: &ServerConfig,
        registry: Arc<SessionRegistry>,
        stats: Arc<dyn StatsRecorder>,
    ) -> AppResult<Self> {
        let status_json = StatusResponse::from_motd(&config.motd).to_json()?;
        let disconnect_json = config.login_attempt.disconnect_text.to_json()?;
        Ok(SessionHandler {
            registry,
            stats,
            status_payload: string_payload(&status_json)?,
            disconnect_payload: string_payload(&disconnect_json)?,
        })
    }

    /// Reacts to one packet of connection `id`, returning the reply to send, if any.
    ///
    /// An error means the connection must be closed without a reply.
    pub fn handle_packet(&self, id: ConnectionId, packet: Packet) -> AppResult<Option<Packet>> {
        let state = self.registry.state(id).ok_or_else(|| {
            AppError::IllegalStateError(format!("session {} is not registered", id).into())
        })?;
        let Packet {
            id: packet_id,
            mut payload,
        } = packet;
        debug!(
            "session {} received packet {:#04x} ({} bytes) in {:?}",
            id,
            packet_id,
            payload.len(),
            state
        );

        match (state, packet_id) {
            (ConnectionState::Handshaking, HANDSHAKE_PACKET_ID) => {
                self.handle_handshake(id, &mut payload)?;
                Ok(None)
            }
            (ConnectionState::Status, STATUS_REQUEST_PACKET_ID) => {
                self.stats.record_ping();
                Ok(Some(Packet::new(
                    STATUS_RESPONSE_PACKET_ID,
                    self.status_payload.clone(),
                )))
            }
            (ConnectionState::Status, PING_PACKET_ID) => self.handle_ping(&mut payload).map(Some),
            (ConnectionState::Login, LOGIN_START_PACKET_ID) => {
                self.handle_login_start(id, &mut payload).map(Some)
            }
            (state, packet_id) => {
                Err(ProtocolViolation::UnexpectedPacket { state, id: packet_id }.into())
            }
        }
    }

    fn handle_handshake(&self, id: ConnectionId, payload: &mut Bytes) -> AppResult<()> {
        let handshake = Handshake::read_from(payload)?;
        let next_state = ConnectionState::from_next_state(handshake.next_state)?;
        self.registry.transition(id, next_state)?;
        info!(
            "session {} received handshake packet. [version={}, connectAddress={}, port={}, nextState={:?}]",
            id, handshake.protocol_version, handshake.server_address, handshake.port, next_state
        );
        Ok(())
    }

    fn handle_ping(&self, payload: &mut Bytes) -> AppResult<Packet> {
        let value = Long::decode(payload)?;
        let mut pong = BytesMut::with_capacity(value.wire_format_size());
        value.encode(&mut pong)?;
        Ok(Packet::new(PONG_PACKET_ID, pong.freeze()))
    }

    fn handle_login_start(&self, id: ConnectionId, payload: &mut Bytes) -> AppResult<Packet> {
        let player_name = read_string(payload)?;
        if player_name.len() > MAX_PLAYER_NAME_BYTES {
            return Err(ProtocolViolation::PlayerNameTooLong(player_name.len()).into());
        }
        info!("session {} login attempt from {:?}", id, player_name);
        self.stats.record_login();
        Ok(Packet::new(
            LOGIN_DISCONNECT_PACKET_ID,
            self.disconnect_payload.clone(),
        ))
    }
}

fn string_payload(value: &str) -> AppResult<Bytes> {
    let mut payload = BytesMut::with_capacity(value.len() + 3);
    write_string(&mut payload, value)?;
    Ok(payload.freeze())
}
