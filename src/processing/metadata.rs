use crate::amf::{Amf0Object, Amf0Value};
use crate::processing::{CodecType, StreamDescriptor};
use crate::processing::audio::SOUND_FORMAT_AAC;

/// FLV codec id for H.264
pub const VIDEO_CODEC_ID_AVC: f64 = 7.0;
pub const AUDIO_CODEC_ID_AAC: f64 = SOUND_FORMAT_AAC as f64;

/// Build the onMetaData object describing outbound streams
pub fn build_metadata(streams: &[StreamDescriptor]) -> Amf0Object {
    let mut metadata = Amf0Object::new();

    for stream in streams {
        match stream.codec {
            CodecType::H264 => {
                metadata.insert("videocodecid".to_string(), Amf0Value::Number(VIDEO_CODEC_ID_AVC));
                if let (Some(width), Some(height)) = (stream.width, stream.height) {
                    metadata.insert("width".to_string(), width.into());
                    metadata.insert("height".to_string(), height.into());
                    metadata.insert("displayWidth".to_string(), width.into());
                    metadata.insert("displayHeight".to_string(), height.into());
                }
            }
            CodecType::Aac => {
                metadata.insert("audiocodecid".to_string(), Amf0Value::Number(AUDIO_CODEC_ID_AAC));
                if let Some(config) = stream.aac_config() {
                    metadata.insert("audiosamplerate".to_string(), config.sample_rate().into());
                }
            }
        }
    }

    metadata
}

/// Which elementary streams a metadata object announces
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Advertised {
    pub audio: bool,
    pub video: bool,
}

impl Advertised {
    pub fn from_metadata(metadata: &Amf0Object) -> Self {
        Advertised {
            audio: metadata.contains_key("audiocodecid"),
            video: metadata.contains_key("videocodecid"),
        }
    }

    pub fn any(&self) -> bool {
        self.audio || self.video
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_metadata() {
        let video = StreamDescriptor::h264(vec![
            0x01, 0x64, 0x00, 0x1F, 0xFF, 0xE1, 0x00, 0x01, 0x67, 0x00,
        ])
        .unwrap()
        .with_dimensions(1280, 720);
        let audio = StreamDescriptor::aac(vec![0x12, 0x10]).unwrap();

        let metadata = build_metadata(&[video, audio]);
        assert_eq!(metadata.get("videocodecid"), Some(&Amf0Value::Number(7.0)));
        assert_eq!(metadata.get("audiocodecid"), Some(&Amf0Value::Number(10.0)));
        assert_eq!(metadata.get("displayHeight"), Some(&Amf0Value::Number(720.0)));
        assert_eq!(metadata.get("audiosamplerate"), Some(&Amf0Value::Number(44100.0)));

        let advertised = Advertised::from_metadata(&metadata);
        assert!(advertised.audio && advertised.video);
    }

    #[test]
    fn test_unknown_dimensions_are_omitted() {
        let video = StreamDescriptor::h264(vec![0x01, 0x42, 0x00, 0x1E, 0xFF, 0xE1, 0x00, 0x01, 0x67, 0x00])
            .unwrap();
        let metadata = build_metadata(&[video]);
        assert!(!metadata.contains_key("width"));
        assert_eq!(
            Advertised::from_metadata(&metadata),
            Advertised { audio: false, video: true }
        );
    }
}
