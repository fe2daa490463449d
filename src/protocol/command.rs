use crate::amf::{Amf0Decoder, Amf0Encoder, Amf0Value};
use crate::{ByteBuffer, Error, Result};

pub const CMD_CONNECT: &str = "connect";
pub const CMD_CREATE_STREAM: &str = "createStream";
pub const CMD_PUBLISH: &str = "publish";
pub const CMD_PLAY: &str = "play";
pub const CMD_RESULT: &str = "_result";
pub const CMD_ERROR: &str = "_error";
pub const CMD_ON_STATUS: &str = "onStatus";

pub const CODE_CONNECT_SUCCESS: &str = "NetConnection.Connect.Success";
pub const CODE_PUBLISH_START: &str = "NetStream.Publish.Start";
pub const CODE_PLAY_START: &str = "NetStream.Play.Start";

/// Version string the server advertises in its connect reply
pub const SERVER_FMS_VERSION: &str = "FMS/3,0,1,123";

/// AMF0 command message: name, transaction id, command object, arguments
#[derive(Debug, Clone, PartialEq)]
pub struct RtmpCommand {
    pub name: String,
    pub transaction_id: f64,
    pub command_object: Amf0Value,
    pub arguments: Vec<Amf0Value>,
}

impl RtmpCommand {
    /// Create new command with a null command object
    pub fn new(name: impl Into<String>, transaction_id: f64) -> Self {
        RtmpCommand {
            name: name.into(),
            transaction_id,
            command_object: Amf0Value::Null,
            arguments: Vec::new(),
        }
    }

    pub fn with_arg(mut self, value: impl Into<Amf0Value>) -> Self {
        self.arguments.push(value.into());
        self
    }

    /// Client `connect` (transaction 1)
    pub fn connect(app: &str, tc_url: &str, flash_version: &str) -> Self {
        let mut cmd = RtmpCommand::new(CMD_CONNECT, 1.0);
        cmd.command_object = Amf0Value::object([
            ("app", Amf0Value::from(app)),
            ("flashVer", Amf0Value::from(flash_version)),
            ("tcUrl", Amf0Value::from(tc_url)),
            ("fpad", Amf0Value::Boolean(false)),
            ("capabilities", Amf0Value::Number(15.0)),
            ("audioCodecs", Amf0Value::Number(4071.0)),
            ("videoCodecs", Amf0Value::Number(252.0)),
            ("videoFunction", Amf0Value::Number(1.0)),
        ]);
        cmd
    }

    /// Server reply to `connect`
    pub fn connect_result(transaction_id: f64) -> Self {
        let mut cmd = RtmpCommand::new(CMD_RESULT, transaction_id);
        cmd.command_object = Amf0Value::object([
            ("fmsVer", Amf0Value::from(SERVER_FMS_VERSION)),
            ("capabilities", Amf0Value::Number(31.0)),
        ]);
        cmd.with_arg(Amf0Value::object([
            ("level", Amf0Value::from("status")),
            ("code", Amf0Value::from(CODE_CONNECT_SUCCESS)),
            ("description", Amf0Value::from("Connection succeeded.")),
            ("objectEncoding", Amf0Value::Number(3.0)),
        ]))
    }

    /// Create createStream command
    pub fn create_stream(transaction_id: f64) -> Self {
        RtmpCommand::new(CMD_CREATE_STREAM, transaction_id)
    }

    /// Server reply to `createStream` carrying the allocated stream id
    pub fn create_stream_result(transaction_id: f64, stream_id: u32) -> Self {
        RtmpCommand::new(CMD_RESULT, transaction_id).with_arg(stream_id)
    }

    /// Create publish command
    pub fn publish(transaction_id: f64, stream_name: &str, publish_type: &str) -> Self {
        RtmpCommand::new(CMD_PUBLISH, transaction_id)
            .with_arg(stream_name)
            .with_arg(publish_type)
    }

    /// Create play command
    pub fn play(stream_name: &str) -> Self {
        RtmpCommand::new(CMD_PLAY, 0.0).with_arg(stream_name)
    }

    /// Create onStatus notification
    pub fn on_status(transaction_id: f64, level: &str, code: &str, description: &str) -> Self {
        RtmpCommand::new(CMD_ON_STATUS, transaction_id).with_arg(Amf0Value::object([
            ("level", Amf0Value::from(level)),
            ("code", Amf0Value::from(code)),
            ("description", Amf0Value::from(description)),
        ]))
    }

    /// First string argument, which is the stream name for publish/play
    pub fn stream_name(&self) -> Option<&str> {
        self.arguments.first().and_then(|v| v.as_string())
    }

    /// `code` of the first object argument (status replies)
    pub fn info_code(&self) -> Option<&str> {
        self.arguments
            .iter()
            .find_map(|v| v.get_property("code"))
            .and_then(|v| v.as_string())
    }

    /// Look up a string property of the command object
    pub fn object_string(&self, key: &str) -> Option<&str> {
        self.command_object.get_property(key).and_then(|v| v.as_string())
    }

    /// Encode command to bytes
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut encoder = Amf0Encoder::new();
        encoder.encode(&Amf0Value::String(self.name.clone()))?;
        encoder.encode(&Amf0Value::Number(self.transaction_id))?;
        encoder.encode(&self.command_object)?;
        for arg in &self.arguments {
            encoder.encode(arg)?;
        }
        Ok(encoder.into_bytes())
    }

    /// Decode command from bytes
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut buffer = ByteBuffer::new(data.to_vec());
        let mut decoder = Amf0Decoder::new(&mut buffer);

        let name = decoder
            .decode()?
            .as_string()
            .ok_or_else(|| Error::protocol("command name must be a string"))?
            .to_string();

        if !decoder.has_remaining() {
            return Err(Error::protocol(format!("{}: missing transaction id", name)));
        }
        // Some encoders send a non-number here; treat it as 0
        let transaction_id = decoder.decode()?.as_number().unwrap_or(0.0);

        if !decoder.has_remaining() {
            return Err(Error::protocol(format!("{}: missing command object", name)));
        }
        let command_object = decoder.decode()?;

        let mut arguments = Vec::new();
        while decoder.has_remaining() {
            arguments.push(decoder.decode()?);
        }

        Ok(RtmpCommand {
            name,
            transaction_id,
            command_object,
            arguments,
        })
    }
}
