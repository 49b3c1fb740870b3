use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::protocol::{read_var_int, var_int_size, write_var_int};
use crate::service::FramingError;
use crate::{AppError, AppResult};

/// One protocol packet: a VarInt id followed by an opaque payload.
///
/// On the wire it is preceded by a VarInt frame length that covers the id and
/// the payload, but not the length prefix itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub id: i32,
    pub payload: Bytes,
}

impl Packet {
    pub fn new(id: i32, payload: impl Into<Bytes>) -> Packet {
        Packet {
            id,
            payload: payload.into(),
        }
    }

    /// Checks whether `buffer` starts with a complete frame.
    ///
    /// Returns the size of the length prefix and the frame length, or
    /// `AppError::Incomplete` when more bytes have to be read first.
    pub fn check(buffer: &mut BytesMut, max_packet_size: usize) -> AppResult<(usize, usize)> {
        let mut peek = &buffer[..];
        let (frame_length, prefix_size) = match read_var_int(&mut peek) {
            Ok(length) => length,
            Err(AppError::Framing(FramingError::UnexpectedEndOfInput)) => {
                return Err(AppError::Incomplete)
            }
            Err(e) => return Err(e),
        };
        if frame_length <= 0 || frame_length as usize > max_packet_size {
            return Err(FramingError::InvalidFrameLength(frame_length).into());
        }
        let frame_length = frame_length as usize;
        if buffer.remaining() < prefix_size + frame_length {
            buffer.reserve(prefix_size + frame_length - buffer.remaining());
            return Err(AppError::Incomplete);
        }
        Ok((prefix_size, frame_length))
    }

    /// Takes the next complete frame out of `buffer`, if there is one.
    pub fn parse(buffer: &mut BytesMut, max_packet_size: usize) -> AppResult<Option<Packet>> {
        // perform a check to ensure we have enough data
        match Packet::check(buffer, max_packet_size) {
            Ok((prefix_size, frame_length)) => {
                buffer.advance(prefix_size);
                let mut body = buffer.split_to(frame_length).freeze();
                // the id has to fit inside the declared frame
                let (id, _) = read_var_int(&mut body)?;
                Ok(Some(Packet { id, payload: body }))
            }
            Err(AppError::Incomplete) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Writes the framed packet to `writer` and returns the number of bytes written.
    pub fn write_to<B: BufMut>(&self, writer: &mut B) -> AppResult<usize> {
        write_packet(writer, self.id, &self.payload)
    }

    pub fn frame_length(&self) -> usize {
        var_int_size(self.id) + self.payload.len()
    }
}

/// Reads one frame from a source that already holds all of its bytes.
///
/// Returns the packet and the total number of bytes consumed, length prefix
/// included. A source that ends inside the frame yields `UnexpectedEndOfInput`.
pub fn read_packet<B: Buf>(source: &mut B) -> AppResult<(Packet, usize)> {
    let (frame_length, prefix_size) = read_var_int(source)?;
    if frame_length <= 0 {
        return Err(FramingError::InvalidFrameLength(frame_length).into());
    }
    let frame_length = frame_length as usize;
    let (id, id_size) = read_var_int(source)?;
    if id_size > frame_length {
        return Err(FramingError::UnexpectedEndOfInput.into());
    }
    let payload_length = frame_length - id_size;
    if source.remaining() < payload_length {
        return Err(FramingError::UnexpectedEndOfInput.into());
    }
    let payload = source.copy_to_bytes(payload_length);
    Ok((Packet { id, payload }, prefix_size + frame_length))
}

/// Frames `id` and `payload` into `writer`.
///
/// Frames whose length does not fit a VarInt are refused, never truncated.
pub fn write_packet<B: BufMut>(writer: &mut B, id: i32, payload: &[u8]) -> AppResult<usize> {
    if id < 0 {
        return Err(FramingError::InvalidPacketId(id).into());
    }
    let inner_length = var_int_size(id) + payload.len();
    let frame_length =
        i32::try_from(inner_length).map_err(|_| FramingError::FrameTooLarge(inner_length))?;
    let prefix_size = write_var_int(writer, frame_length);
    write_var_int(writer, id);
    writer.put_slice(payload);
    Ok(prefix_size + inner_length)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: usize = 2_097_151;

    #[test]
    fn test_write_packet_layout() {
        let mut writer = BytesMut::new();
        let written = write_packet(&mut writer, 1, &[0, 0, 0, 0, 0, 0, 0, 0x2a]).unwrap();
        assert_eq!(written, 10);
        assert_eq!(&writer[..], &[9, 1, 0, 0, 0, 0, 0, 0, 0, 0x2a]);
    }

    #[test]
    fn test_length_prefix_counts_multi_byte_id() {
        let mut writer = BytesMut::new();
        write_packet(&mut writer, 200, b"ab").unwrap();
        // id 200 takes two bytes
        assert_eq!(&writer[..], &[4, 0xc8, 0x01, b'a', b'b']);

        let packet = Packet::parse(&mut writer, MAX).unwrap().unwrap();
        assert_eq!(packet, Packet::new(200, Bytes::from_static(b"ab")));
        assert!(writer.is_empty());
    }

    #[test]
    fn test_empty_payload() {
        let mut writer = BytesMut::new();
        let packet = Packet::new(0, Bytes::new());
        assert_eq!(packet.write_to(&mut writer).unwrap(), 2);
        assert_eq!(&writer[..], &[1, 0]);
        assert_eq!(Packet::parse(&mut writer, MAX).unwrap(), Some(packet));
    }

    #[test]
    fn test_negative_id_rejected() {
        let mut writer = BytesMut::new();
        assert!(matches!(
            write_packet(&mut writer, -1, b"").unwrap_err(),
            AppError::Framing(FramingError::InvalidPacketId(-1))
        ));
        assert!(writer.is_empty());
    }

    #[test]
    fn test_parse_waits_for_whole_frame() {
        let mut full = BytesMut::new();
        write_packet(&mut full, 0, &[7u8; 300]).unwrap();

        let mut buffer = BytesMut::new();
        // frame length prefix split across reads
        buffer.extend_from_slice(&full[..1]);
        assert_eq!(Packet::parse(&mut buffer, MAX).unwrap(), None);
        buffer.extend_from_slice(&full[1..100]);
        assert_eq!(Packet::parse(&mut buffer, MAX).unwrap(), None);
        assert_eq!(buffer.len(), 100);

        buffer.extend_from_slice(&full[100..]);
        let packet = Packet::parse(&mut buffer, MAX).unwrap().unwrap();
        assert_eq!(packet.id, 0);
        assert_eq!(packet.payload.len(), 300);
        assert_eq!(packet.frame_length(), 301);
    }

    #[test]
    fn test_parse_keeps_following_frames() {
        let mut buffer = BytesMut::new();
        write_packet(&mut buffer, 0, b"").unwrap();
        write_packet(&mut buffer, 1, &42i64.to_be_bytes()).unwrap();

        assert_eq!(Packet::parse(&mut buffer, MAX).unwrap().unwrap().id, 0);
        let ping = Packet::parse(&mut buffer, MAX).unwrap().unwrap();
        assert_eq!(ping.id, 1);
        assert_eq!(&ping.payload[..], &42i64.to_be_bytes());
        assert_eq!(Packet::parse(&mut buffer, MAX).unwrap(), None);
    }

    #[test]
    fn test_parse_rejects_bad_lengths() {
        let mut zero = BytesMut::from(&[0x00, 0x00][..]);
        assert!(matches!(
            Packet::parse(&mut zero, MAX).unwrap_err(),
            AppError::Framing(FramingError::InvalidFrameLength(0))
        ));

        let mut too_big = BytesMut::new();
        write_var_int(&mut too_big, 1025);
        assert!(matches!(
            Packet::parse(&mut too_big, 1024).unwrap_err(),
            AppError::Framing(FramingError::InvalidFrameLength(1025))
        ));

        let mut too_long = BytesMut::from(&[0xff, 0xff, 0xff, 0xff, 0xff, 0x01][..]);
        assert!(matches!(
            Packet::parse(&mut too_long, MAX).unwrap_err(),
            AppError::Framing(FramingError::IntegerTooLong(5))
        ));
    }

    #[test]
    fn test_parse_id_overrunning_frame() {
        // frame of one byte whose id claims a continuation
        let mut buffer = BytesMut::from(&[0x01, 0x80, 0x01][..]);
        assert!(matches!(
            Packet::parse(&mut buffer, MAX).unwrap_err(),
            AppError::Framing(FramingError::UnexpectedEndOfInput)
        ));
    }

    #[test]
    fn test_read_packet_from_complete_source() {
        let mut writer = BytesMut::new();
        write_packet(&mut writer, 0, b"hello").unwrap();
        writer.put_u8(0xff);

        let mut source = writer.freeze();
        let (packet, consumed) = read_packet(&mut source).unwrap();
        assert_eq!(packet, Packet::new(0, Bytes::from_static(b"hello")));
        assert_eq!(consumed, 7);
        assert_eq!(&source[..], &[0xff]);
    }

    #[test]
    fn test_read_packet_truncated() {
        let mut writer = BytesMut::new();
        write_packet(&mut writer, 0, b"hello").unwrap();
        for cut in 0..writer.len() {
            let mut source = &writer[..cut];
            assert!(matches!(
                read_packet(&mut source).unwrap_err(),
                AppError::Framing(FramingError::UnexpectedEndOfInput)
            ));
        }
    }
}
