use crate::message::types::MessageType;
use crate::protocol::{ControlMessage, RtmpCommand, RtmpData, RtmpPacket};
use crate::{Error, Result};

/// A reassembled message decoded according to its type id
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Control(ControlMessage),
    Command(RtmpCommand),
    Data(RtmpData),
    Audio(RtmpPacket),
    Video(RtmpPacket),
    /// Aggregate, shared object and unknown messages pass through undecoded
    Other(RtmpPacket),
}

impl Message {
    /// Decode a packet into a typed message
    pub fn dispatch(packet: &RtmpPacket) -> Result<Message> {
        let message = match MessageType::from_id(packet.message_type()) {
            MessageType::Control(_) => {
                Message::Control(ControlMessage::decode(packet.message_type(), &packet.payload)?)
            }
            MessageType::Command { amf3 } => {
                Message::Command(RtmpCommand::decode(amf0_body(&packet.payload, amf3)?)?)
            }
            MessageType::Data { amf3 } => {
                Message::Data(RtmpData::decode(amf0_body(&packet.payload, amf3)?)?)
            }
            MessageType::Audio => Message::Audio(packet.clone()),
            MessageType::Video => Message::Video(packet.clone()),
            MessageType::Aggregate | MessageType::SharedObject | MessageType::Unknown(_) => {
                Message::Other(packet.clone())
            }
        };
        Ok(message)
    }
}

/// AMF3 command/data messages carry one leading format byte before the AMF0 body
fn amf0_body(payload: &[u8], amf3: bool) -> Result<&[u8]> {
    if !amf3 {
        return Ok(payload);
    }
    payload
        .get(1..)
        .ok_or_else(|| Error::protocol("empty AMF3 message"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::constants::*;
    use crate::protocol::RtmpHeader;

    #[test]
    fn test_dispatch_command() {
        let cmd = RtmpCommand::create_stream(2.0);
        let packet = RtmpPacket::new(RtmpHeader::command(CHUNK_STREAM_COMMAND, 0), cmd.encode().unwrap());

        match Message::dispatch(&packet).unwrap() {
            Message::Command(decoded) => assert_eq!(decoded, cmd),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_dispatch_amf3_command_skips_format_byte() {
        let cmd = RtmpCommand::play("cam1");
        let mut payload = vec![0x00];
        payload.extend(cmd.encode().unwrap());

        let mut header = RtmpHeader::command(CHUNK_STREAM_STREAM_COMMAND, 1);
        header.message_type = MSG_TYPE_COMMAND_AMF3;
        let packet = RtmpPacket::new(header, payload);

        match Message::dispatch(&packet).unwrap() {
            Message::Command(decoded) => assert_eq!(decoded.stream_name(), Some("cam1")),
            other => panic!("unexpected {:?}", other),
        }

        let empty = RtmpPacket::new(header, Vec::new());
        assert!(Message::dispatch(&empty).is_err());
    }

    #[test]
    fn test_dispatch_control_and_media() {
        let packet = ControlMessage::WindowAckSize(2_500_000).to_packet();
        assert_eq!(
            Message::dispatch(&packet).unwrap(),
            Message::Control(ControlMessage::WindowAckSize(2_500_000))
        );

        let audio = RtmpPacket::new(RtmpHeader::audio(10, 1), vec![0xAF, 0x01]);
        assert!(matches!(Message::dispatch(&audio).unwrap(), Message::Audio(_)));

        let mut header = RtmpHeader::data(CHUNK_STREAM_STATUS, 1);
        header.message_type = MSG_TYPE_AGGREGATE;
        let aggregate = RtmpPacket::new(header, vec![1, 2, 3]);
        assert!(matches!(Message::dispatch(&aggregate).unwrap(), Message::Other(_)));
    }
}
