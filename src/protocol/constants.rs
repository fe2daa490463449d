// Message types
pub const MSG_TYPE_SET_CHUNK_SIZE: u8 = 1;
pub const MSG_TYPE_ABORT: u8 = 2;
pub const MSG_TYPE_ACK: u8 = 3;
pub const MSG_TYPE_USER_CONTROL: u8 = 4;
pub const MSG_TYPE_WINDOW_ACK: u8 = 5;
pub const MSG_TYPE_SET_PEER_BW: u8 = 6;
pub const MSG_TYPE_AUDIO: u8 = 8;
pub const MSG_TYPE_VIDEO: u8 = 9;
pub const MSG_TYPE_DATA_AMF3: u8 = 15;
pub const MSG_TYPE_SHARED_OBJECT_AMF3: u8 = 16;
pub const MSG_TYPE_COMMAND_AMF3: u8 = 17;
pub const MSG_TYPE_DATA_AMF0: u8 = 18;
pub const MSG_TYPE_SHARED_OBJECT_AMF0: u8 = 19;
pub const MSG_TYPE_COMMAND_AMF0: u8 = 20;
pub const MSG_TYPE_AGGREGATE: u8 = 22;

// User control event types
pub const EVENT_STREAM_BEGIN: u16 = 0;
pub const EVENT_STREAM_EOF: u16 = 1;
pub const EVENT_STREAM_DRY: u16 = 2;
pub const EVENT_SET_BUFFER_LENGTH: u16 = 3;
pub const EVENT_STREAM_IS_RECORDED: u16 = 4;
pub const EVENT_PING_REQUEST: u16 = 6;
pub const EVENT_PING_RESPONSE: u16 = 7;

// Chunk stream IDs used on the outbound side
pub const CHUNK_STREAM_PROTOCOL: u32 = 2;
pub const CHUNK_STREAM_COMMAND: u32 = 3;
pub const CHUNK_STREAM_STATUS: u32 = 5;
pub const CHUNK_STREAM_AUDIO: u32 = 6;
pub const CHUNK_STREAM_VIDEO: u32 = 7;
pub const CHUNK_STREAM_STREAM_COMMAND: u32 = 8;

// Default values
pub const DEFAULT_CHUNK_SIZE: u32 = 128;
pub const MAX_CHUNK_SIZE: u32 = 0xFF_FFFF;
pub const DEFAULT_WINDOW_SIZE: u32 = 5_000_000;
pub const DEFAULT_PEER_BANDWIDTH: u32 = 5_000_000;

/// SetPeerBandwidth limit type: dynamic
pub const PEER_BW_LIMIT_DYNAMIC: u8 = 2;

/// Largest value the 3-byte timestamp field carries before switching to the extended form
pub const MAX_TIMESTAMP_FIELD: u32 = 0xFF_FFFF;
