use crate::protocol::constants::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// Protocol control messages (1, 2, 3, 5, 6) and user control (4)
    Control(ControlType),

    /// Audio data
    Audio,

    /// Video data
    Video,

    /// Command, with whether it is AMF3-wrapped
    Command { amf3: bool },

    /// Data, with whether it is AMF3-wrapped
    Data { amf3: bool },

    /// Aggregate message
    Aggregate,

    /// Shared object (AMF0/AMF3)
    SharedObject,

    /// Unknown type
    Unknown(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlType {
    SetChunkSize,
    Abort,
    Acknowledgement,
    UserControl,
    WindowAcknowledgement,
    SetPeerBandwidth,
}

impl MessageType {
    /// Create from message type ID
    pub fn from_id(id: u8) -> Self {
        match id {
            MSG_TYPE_SET_CHUNK_SIZE => MessageType::Control(ControlType::SetChunkSize),
            MSG_TYPE_ABORT => MessageType::Control(ControlType::Abort),
            MSG_TYPE_ACK => MessageType::Control(ControlType::Acknowledgement),
            MSG_TYPE_USER_CONTROL => MessageType::Control(ControlType::UserControl),
            MSG_TYPE_WINDOW_ACK => MessageType::Control(ControlType::WindowAcknowledgement),
            MSG_TYPE_SET_PEER_BW => MessageType::Control(ControlType::SetPeerBandwidth),
            MSG_TYPE_AUDIO => MessageType::Audio,
            MSG_TYPE_VIDEO => MessageType::Video,
            MSG_TYPE_COMMAND_AMF0 => MessageType::Command { amf3: false },
            MSG_TYPE_COMMAND_AMF3 => MessageType::Command { amf3: true },
            MSG_TYPE_DATA_AMF0 => MessageType::Data { amf3: false },
            MSG_TYPE_DATA_AMF3 => MessageType::Data { amf3: true },
            MSG_TYPE_AGGREGATE => MessageType::Aggregate,
            MSG_TYPE_SHARED_OBJECT_AMF0 | MSG_TYPE_SHARED_OBJECT_AMF3 => MessageType::SharedObject,
            _ => MessageType::Unknown(id),
        }
    }

    /// Check if this is a control message
    pub fn is_control(&self) -> bool {
        matches!(self, MessageType::Control(_))
    }

    /// Check if this is a media message (audio/video)
    pub fn is_media(&self) -> bool {
        matches!(self, MessageType::Audio | MessageType::Video)
    }

    /// Check if this is a command message
    pub fn is_command(&self) -> bool {
        matches!(self, MessageType::Command { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(MessageType::from_id(4), MessageType::Control(ControlType::UserControl));
        assert_eq!(MessageType::from_id(17), MessageType::Command { amf3: true });
        assert_eq!(MessageType::from_id(18), MessageType::Data { amf3: false });
        assert!(MessageType::from_id(9).is_media());
        assert!(MessageType::from_id(20).is_command());
        assert_eq!(MessageType::from_id(99), MessageType::Unknown(99));
    }
}
