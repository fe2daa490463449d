use crate::amf::Amf0Object;
use crate::processing::audio::{AAC_RAW, AudioTag};
use crate::processing::video::{AVC_NALU, FrameType, VideoCodec, VideoTag};
use crate::processing::{Advertised, Packet, StreamDescriptor};
use crate::protocol::RtmpPacket;
use crate::{Error, Result};
use log::{debug, warn};
use std::collections::VecDeque;

/// Parsed media message body
#[derive(Debug, Clone, PartialEq)]
pub enum MediaTag {
    Video(VideoTag),
    Audio(AudioTag),
}

impl MediaTag {
    /// Parse the body of an audio or video message. Empty bodies and other
    /// message types yield `None`.
    pub fn from_packet(packet: &RtmpPacket) -> Result<Option<Self>> {
        if packet.payload.is_empty() {
            return Ok(None);
        }
        if packet.is_video() {
            Ok(Some(MediaTag::Video(VideoTag::parse(&packet.payload)?)))
        } else if packet.is_audio() {
            Ok(Some(MediaTag::Audio(AudioTag::parse(&packet.payload)?)))
        } else {
            Ok(None)
        }
    }
}

/// Stream indices assigned while probing, used to turn tags into packets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamMap {
    pub video: Option<usize>,
    pub audio: Option<usize>,
}

impl StreamMap {
    /// Convert a media tag into a packet. Sequence headers, end-of-sequence
    /// markers and tags for streams that were never announced yield nothing.
    pub fn to_packet(&self, tag: &MediaTag, timestamp: u32) -> Option<Packet> {
        match tag {
            MediaTag::Video(video) => {
                let idx = self.video?;
                let frame_ok = matches!(video.frame_type, FrameType::Keyframe | FrameType::InterFrame);
                if video.codec != VideoCodec::H264 || video.avc_packet_type != AVC_NALU || !frame_ok {
                    return None;
                }
                Some(Packet {
                    idx,
                    is_key_frame: video.is_key_frame(),
                    composition_time: video.composition_time,
                    time: timestamp,
                    data: video.data.clone(),
                })
            }
            MediaTag::Audio(audio) => {
                let idx = self.audio?;
                if audio.aac_packet_type != Some(AAC_RAW) {
                    return None;
                }
                Some(Packet {
                    idx,
                    is_key_frame: false,
                    composition_time: 0,
                    time: timestamp,
                    data: audio.data.clone(),
                })
            }
        }
    }
}

/// Collects sequence headers into stream descriptors, caching media that
/// arrives meanwhile so it can be replayed in order.
pub struct Prober {
    advertised: Advertised,
    max_messages: usize,
    pushed: usize,
    streams: Vec<StreamDescriptor>,
    map: StreamMap,
    cached: Vec<(MediaTag, u32)>,
}

impl Prober {
    pub fn new(max_messages: usize) -> Self {
        Prober {
            advertised: Advertised::default(),
            max_messages,
            pushed: 0,
            streams: Vec::new(),
            map: StreamMap::default(),
            cached: Vec::new(),
        }
    }

    /// Record which streams the publisher's metadata announces
    pub fn set_metadata(&mut self, metadata: &Amf0Object) {
        self.advertised = Advertised::from_metadata(metadata);
        debug!("probe: metadata advertises {:?}", self.advertised);
    }

    pub fn push(&mut self, tag: MediaTag, timestamp: u32) -> Result<()> {
        self.pushed += 1;
        if self.pushed > self.max_messages {
            return Err(Error::protocol("max probe packet count reached"));
        }

        let cache = match &tag {
            MediaTag::Video(video) if video.is_sequence_header() => {
                if self.map.video.is_none() {
                    let stream = StreamDescriptor::h264(video.data.clone())
                        .map_err(|e| Error::protocol(format!("h264 sequence header invalid: {}", e)))?;
                    self.map.video = Some(self.streams.len());
                    self.streams.push(stream);
                    debug!("probe: video stream #{}", self.streams.len() - 1);
                }
                false
            }
            MediaTag::Audio(audio) if audio.is_aac() && audio.is_sequence_header() => {
                if self.map.audio.is_none() {
                    let stream = StreamDescriptor::aac(audio.data.clone())
                        .map_err(|e| Error::protocol(format!("aac sequence header invalid: {}", e)))?;
                    self.map.audio = Some(self.streams.len());
                    self.streams.push(stream);
                    debug!("probe: audio stream #{}", self.streams.len() - 1);
                }
                false
            }
            MediaTag::Audio(audio) if !audio.is_aac() => {
                warn!("probe: ignoring audio with sound format {}", audio.sound_format);
                false
            }
            MediaTag::Video(video) if video.codec != VideoCodec::H264 => {
                warn!("probe: ignoring video with codec {:?}", video.codec);
                false
            }
            _ => true,
        };
        if cache {
            self.cached.push((tag, timestamp));
        }

        if !self.advertised.any() && self.pushed >= self.max_messages && self.streams.is_empty() {
            return Err(Error::protocol("probe failed"));
        }
        Ok(())
    }

    pub fn is_probed(&self) -> bool {
        let got_audio = self.map.audio.is_some();
        let got_video = self.map.video.is_some();

        if self.advertised.any() {
            (!self.advertised.audio || got_audio) && (!self.advertised.video || got_video)
        } else {
            (got_audio && got_video) || (self.pushed >= self.max_messages && !self.streams.is_empty())
        }
    }

    /// Finish probing: the streams, their index map, and the cached packets in arrival order
    pub fn finish(self) -> (Vec<StreamDescriptor>, StreamMap, VecDeque<Packet>) {
        let map = self.map;
        let packets = self
            .cached
            .iter()
            .filter_map(|(tag, timestamp)| map.to_packet(tag, *timestamp))
            .collect();
        (self.streams, map, packets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amf::Amf0Value;
    use crate::processing::audio::AAC_SEQUENCE_HEADER;

    const AVC_RECORD: [u8; 10] = [0x01, 0x64, 0x00, 0x1F, 0xFF, 0xE1, 0x00, 0x01, 0x67, 0x00];

    fn video_header() -> MediaTag {
        MediaTag::Video(VideoTag::avc_sequence_header(&AVC_RECORD))
    }

    fn video_frame(key: bool, byte: u8) -> MediaTag {
        MediaTag::Video(VideoTag::avc_nalu(key, 0, &[byte]))
    }

    fn audio_header() -> MediaTag {
        MediaTag::Audio(AudioTag::aac(AAC_SEQUENCE_HEADER, 2, &[0x12, 0x10]))
    }

    fn audio_frame(byte: u8) -> MediaTag {
        MediaTag::Audio(AudioTag::aac(AAC_RAW, 2, &[byte]))
    }

    #[test]
    fn test_media_before_header_is_replayed() {
        let mut prober = Prober::new(20);
        prober.push(video_frame(true, 1), 0).unwrap();
        prober.push(video_header(), 0).unwrap();
        assert!(!prober.is_probed());
        prober.push(audio_frame(2), 10).unwrap();
        prober.push(audio_header(), 10).unwrap();
        assert!(prober.is_probed());

        let (streams, map, packets) = prober.finish();
        assert_eq!(streams.len(), 2);
        assert_eq!(map.video, Some(0));
        assert_eq!(map.audio, Some(1));
        let data: Vec<u8> = packets.iter().map(|p| p.data[0]).collect();
        assert_eq!(data, vec![1, 2]);
        assert!(packets[0].is_key_frame);
        assert_eq!(packets[1].idx, 1);
    }

    #[test]
    fn test_advertised_audio_only() {
        let mut prober = Prober::new(20);
        let mut metadata = Amf0Object::new();
        metadata.insert("audiocodecid".to_string(), Amf0Value::Number(10.0));
        prober.set_metadata(&metadata);

        prober.push(audio_header(), 0).unwrap();
        assert!(prober.is_probed());
        let (streams, _, _) = prober.finish();
        assert_eq!(streams.len(), 1);
    }

    #[test]
    fn test_budget_exceeded_with_advertised_stream_missing() {
        let mut prober = Prober::new(3);
        let mut metadata = Amf0Object::new();
        metadata.insert("videocodecid".to_string(), Amf0Value::Number(7.0));
        prober.set_metadata(&metadata);

        for i in 0..3 {
            prober.push(audio_frame(i), 0).unwrap();
        }
        let err = prober.push(audio_frame(9), 0).unwrap_err();
        assert!(err.to_string().contains("max probe packet count reached"));
    }

    #[test]
    fn test_budget_used_with_one_stream() {
        let mut prober = Prober::new(3);
        prober.push(audio_header(), 0).unwrap();
        prober.push(audio_frame(1), 23).unwrap();
        assert!(!prober.is_probed());
        prober.push(audio_frame(2), 46).unwrap();
        assert!(prober.is_probed());

        let (streams, _, packets) = prober.finish();
        assert_eq!(streams.len(), 1);
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[1].time, 46);
    }

    #[test]
    fn test_probe_failed_without_streams() {
        let mut prober = Prober::new(2);
        prober.push(audio_frame(1), 0).unwrap();
        let err = prober.push(audio_frame(2), 0).unwrap_err();
        assert!(err.to_string().contains("probe failed"));
    }

    #[test]
    fn test_invalid_sequence_header() {
        let mut prober = Prober::new(20);
        let bad = MediaTag::Video(VideoTag::avc_sequence_header(&[0x01]));
        assert!(prober.push(bad, 0).is_err());
    }

    #[test]
    fn test_tag_from_packet() {
        use crate::protocol::RtmpHeader;

        let packet = RtmpPacket::new(RtmpHeader::audio(0, 1), vec![0xAF, 0x01, 0x42]);
        assert_eq!(MediaTag::from_packet(&packet).unwrap(), Some(audio_frame(0x42)));

        let empty = RtmpPacket::new(RtmpHeader::video(0, 1), Vec::new());
        assert_eq!(MediaTag::from_packet(&empty).unwrap(), None);
    }

    #[test]
    fn test_end_of_sequence_yields_no_packet() {
        let map = StreamMap { video: Some(0), audio: None };
        let mut eos = VideoTag::avc_nalu(false, 0, &[]);
        eos.avc_packet_type = crate::processing::video::AVC_END_OF_SEQUENCE;
        assert!(map.to_packet(&MediaTag::Video(eos), 0).is_none());
        assert!(map.to_packet(&audio_frame(1), 0).is_none());
    }
}
