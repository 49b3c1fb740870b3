use std::net::SocketAddr;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;

use crate::network::Packet;
use crate::service::FramingError;
use crate::AppResult;

/// A client connection: the socket behind a `BufWriter` plus the read buffer
/// that accumulates bytes until a whole frame is available.
#[derive(Debug)]
pub struct Connection {
    writer: BufWriter<TcpStream>,
    buffer: BytesMut,
    write_buffer: BytesMut,
    max_packet_size: usize,
    peer_addr: Option<SocketAddr>,
}

impl Connection {
    pub fn new(socket: TcpStream, max_packet_size: usize) -> Connection {
        let peer_addr = socket.peer_addr().ok();
        Connection {
            writer: BufWriter::new(socket),
            buffer: BytesMut::with_capacity(4 * 1024),
            write_buffer: BytesMut::with_capacity(1024),
            max_packet_size,
            peer_addr,
        }
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// Reads the next packet from the connection.
    ///
    /// Returns `None` when the client closed the connection between frames.
    /// A close in the middle of a frame is reported as `UnexpectedEndOfInput`;
    /// malformed or oversized frames are errors and the connection should be
    /// dropped.
    pub async fn read_packet(&mut self) -> AppResult<Option<Packet>> {
        loop {
            if let Some(packet) = Packet::parse(&mut self.buffer, self.max_packet_size)? {
                return Ok(Some(packet));
            }
            if 0 == self.writer.read_buf(&mut self.buffer).await? {
                return if self.buffer.is_empty() {
                    Ok(None)
                } else {
                    Err(FramingError::UnexpectedEndOfInput.into())
                };
            }
        }
    }

    /// Frames and sends one packet, flushing before returning.
    pub async fn write_packet(&mut self, packet: &Packet) -> AppResult<()> {
        self.write_buffer.clear();
        packet.write_to(&mut self.write_buffer)?;
        self.writer.write_all(&self.write_buffer).await?;
        self.writer.flush().await?;
        Ok(())
    }
}
