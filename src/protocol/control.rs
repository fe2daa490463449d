use crate::protocol::constants::*;
use crate::protocol::{RtmpHeader, RtmpPacket};
use crate::{ByteBuffer, Error, Result};

/// User control event (message type 4)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserControlEvent {
    StreamBegin(u32),
    StreamEof(u32),
    StreamDry(u32),
    SetBufferLength { stream_id: u32, buffer_ms: u32 },
    StreamIsRecorded(u32),
    PingRequest(u32),
    PingResponse(u32),
    Unknown(u16),
}

impl UserControlEvent {
    pub fn event_type(&self) -> u16 {
        match self {
            UserControlEvent::StreamBegin(_) => EVENT_STREAM_BEGIN,
            UserControlEvent::StreamEof(_) => EVENT_STREAM_EOF,
            UserControlEvent::StreamDry(_) => EVENT_STREAM_DRY,
            UserControlEvent::SetBufferLength { .. } => EVENT_SET_BUFFER_LENGTH,
            UserControlEvent::StreamIsRecorded(_) => EVENT_STREAM_IS_RECORDED,
            UserControlEvent::PingRequest(_) => EVENT_PING_REQUEST,
            UserControlEvent::PingResponse(_) => EVENT_PING_RESPONSE,
            UserControlEvent::Unknown(t) => *t,
        }
    }

    fn encode_into(&self, buffer: &mut ByteBuffer) {
        buffer.write_u16_be(self.event_type());
        match *self {
            UserControlEvent::StreamBegin(v)
            | UserControlEvent::StreamEof(v)
            | UserControlEvent::StreamDry(v)
            | UserControlEvent::StreamIsRecorded(v)
            | UserControlEvent::PingRequest(v)
            | UserControlEvent::PingResponse(v) => buffer.write_u32_be(v),
            UserControlEvent::SetBufferLength { stream_id, buffer_ms } => {
                buffer.write_u32_be(stream_id);
                buffer.write_u32_be(buffer_ms);
            }
            UserControlEvent::Unknown(_) => {}
        }
    }

    fn decode_from(buffer: &mut ByteBuffer) -> Result<Self> {
        let event_type = buffer.read_u16_be().map_err(short("user control"))?;
        let mut value = || buffer.read_u32_be().map_err(short("user control"));
        let event = match event_type {
            EVENT_STREAM_BEGIN => UserControlEvent::StreamBegin(value()?),
            EVENT_STREAM_EOF => UserControlEvent::StreamEof(value()?),
            EVENT_STREAM_DRY => UserControlEvent::StreamDry(value()?),
            EVENT_SET_BUFFER_LENGTH => {
                let stream_id = value()?;
                let buffer_ms = value()?;
                UserControlEvent::SetBufferLength { stream_id, buffer_ms }
            }
            EVENT_STREAM_IS_RECORDED => UserControlEvent::StreamIsRecorded(value()?),
            EVENT_PING_REQUEST => UserControlEvent::PingRequest(value()?),
            EVENT_PING_RESPONSE => UserControlEvent::PingResponse(value()?),
            other => UserControlEvent::Unknown(other),
        };
        Ok(event)
    }
}

/// Protocol control messages (types 1-6)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    SetChunkSize(u32),
    Abort(u32),
    Acknowledgement(u32),
    WindowAckSize(u32),
    SetPeerBandwidth { size: u32, limit_type: u8 },
    UserControl(UserControlEvent),
}

impl ControlMessage {
    pub fn message_type(&self) -> u8 {
        match self {
            ControlMessage::SetChunkSize(_) => MSG_TYPE_SET_CHUNK_SIZE,
            ControlMessage::Abort(_) => MSG_TYPE_ABORT,
            ControlMessage::Acknowledgement(_) => MSG_TYPE_ACK,
            ControlMessage::WindowAckSize(_) => MSG_TYPE_WINDOW_ACK,
            ControlMessage::SetPeerBandwidth { .. } => MSG_TYPE_SET_PEER_BW,
            ControlMessage::UserControl(_) => MSG_TYPE_USER_CONTROL,
        }
    }

    /// Encode the message body
    pub fn encode(&self) -> Vec<u8> {
        let mut buffer = ByteBuffer::with_capacity(10);
        match *self {
            ControlMessage::SetChunkSize(v)
            | ControlMessage::Abort(v)
            | ControlMessage::Acknowledgement(v)
            | ControlMessage::WindowAckSize(v) => buffer.write_u32_be(v),
            ControlMessage::SetPeerBandwidth { size, limit_type } => {
                buffer.write_u32_be(size);
                buffer.write_u8(limit_type);
            }
            ControlMessage::UserControl(event) => event.encode_into(&mut buffer),
        }
        buffer.into_vec()
    }

    /// Decode a control message body of the given type
    pub fn decode(message_type: u8, payload: &[u8]) -> Result<Self> {
        let mut buffer = ByteBuffer::new(payload.to_vec());
        let msg = match message_type {
            MSG_TYPE_SET_CHUNK_SIZE => {
                // Top bit is reserved
                let size = buffer.read_u32_be().map_err(short("set chunk size"))? & 0x7FFF_FFFF;
                ControlMessage::SetChunkSize(size)
            }
            MSG_TYPE_ABORT => ControlMessage::Abort(buffer.read_u32_be().map_err(short("abort"))?),
            MSG_TYPE_ACK => {
                ControlMessage::Acknowledgement(buffer.read_u32_be().map_err(short("acknowledgement"))?)
            }
            MSG_TYPE_WINDOW_ACK => {
                ControlMessage::WindowAckSize(buffer.read_u32_be().map_err(short("window ack size"))?)
            }
            MSG_TYPE_SET_PEER_BW => {
                let size = buffer.read_u32_be().map_err(short("set peer bandwidth"))?;
                let limit_type = buffer.read_u8().map_err(short("set peer bandwidth"))?;
                ControlMessage::SetPeerBandwidth { size, limit_type }
            }
            MSG_TYPE_USER_CONTROL => {
                ControlMessage::UserControl(UserControlEvent::decode_from(&mut buffer)?)
            }
            other => return Err(Error::protocol(format!("not a control message type: {}", other))),
        };
        Ok(msg)
    }

    /// Wrap into a packet on the protocol control chunk stream
    pub fn to_packet(&self) -> RtmpPacket {
        RtmpPacket::new(RtmpHeader::control(self.message_type()), self.encode())
    }
}

fn short(what: &'static str) -> impl Fn(std::io::Error) -> Error {
    move |_| Error::protocol(format!("{} message too short", what))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_peer_bandwidth_layout() {
        let msg = ControlMessage::SetPeerBandwidth {
            size: DEFAULT_PEER_BANDWIDTH,
            limit_type: PEER_BW_LIMIT_DYNAMIC,
        };
        assert_eq!(msg.encode(), vec![0x00, 0x4C, 0x4B, 0x40, 0x02]);
        assert_eq!(ControlMessage::decode(MSG_TYPE_SET_PEER_BW, &msg.encode()).unwrap(), msg);
    }

    #[test]
    fn test_set_buffer_length_layout() {
        let msg = ControlMessage::UserControl(UserControlEvent::SetBufferLength {
            stream_id: 0,
            buffer_ms: 100,
        });
        assert_eq!(msg.encode(), vec![0, 3, 0, 0, 0, 0, 0, 0, 0, 100]);

        let packet = msg.to_packet();
        assert_eq!(packet.chunk_stream_id(), CHUNK_STREAM_PROTOCOL);
        assert_eq!(packet.message_type(), MSG_TYPE_USER_CONTROL);
        assert_eq!(packet.message_stream_id(), 0);
    }

    #[test]
    fn test_chunk_size_reserved_bit() {
        let msg = ControlMessage::decode(MSG_TYPE_SET_CHUNK_SIZE, &[0x80, 0x00, 0x10, 0x00]).unwrap();
        assert_eq!(msg, ControlMessage::SetChunkSize(4096));
    }

    #[test]
    fn test_unknown_event_and_short_body() {
        let msg = ControlMessage::decode(MSG_TYPE_USER_CONTROL, &[0x00, 0x1F]).unwrap();
        assert_eq!(msg, ControlMessage::UserControl(UserControlEvent::Unknown(0x1F)));

        assert!(ControlMessage::decode(MSG_TYPE_WINDOW_ACK, &[0x00, 0x01]).is_err());
        assert!(ControlMessage::decode(MSG_TYPE_AUDIO, &[]).is_err());
    }
}
