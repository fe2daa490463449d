use crate::{ByteBuffer, Error, Result};

/// AAC packet types carried in the second byte of an AAC audio message
pub const AAC_SEQUENCE_HEADER: u8 = 0;
pub const AAC_RAW: u8 = 1;

/// Sound format field value for AAC
pub const SOUND_FORMAT_AAC: u8 = 10;

const SAMPLE_RATES: [u32; 13] = [
    96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 7350,
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SoundRate {
    Rate5_5kHz,
    Rate11kHz,
    Rate22kHz,
    Rate44kHz,
}

impl SoundRate {
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => SoundRate::Rate5_5kHz,
            1 => SoundRate::Rate11kHz,
            2 => SoundRate::Rate22kHz,
            _ => SoundRate::Rate44kHz,
        }
    }

    pub fn bits(&self) -> u8 {
        match self {
            SoundRate::Rate5_5kHz => 0,
            SoundRate::Rate11kHz => 1,
            SoundRate::Rate22kHz => 2,
            SoundRate::Rate44kHz => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SoundSize {
    Bits8,
    Bits16,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SoundType {
    Mono,
    Stereo,
}

/// Body of an audio message
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTag {
    pub sound_format: u8,
    pub sound_rate: SoundRate,
    pub sound_size: SoundSize,
    pub sound_type: SoundType,
    /// Only present for AAC
    pub aac_packet_type: Option<u8>,
    pub data: Vec<u8>,
}

impl AudioTag {
    /// AAC message at 44 kHz / 16-bit, as written for every outbound AAC stream
    pub fn aac(packet_type: u8, channels: u8, data: &[u8]) -> Self {
        AudioTag {
            sound_format: SOUND_FORMAT_AAC,
            sound_rate: SoundRate::Rate44kHz,
            sound_size: SoundSize::Bits16,
            sound_type: if channels >= 2 { SoundType::Stereo } else { SoundType::Mono },
            aac_packet_type: Some(packet_type),
            data: data.to_vec(),
        }
    }

    pub fn parse(payload: &[u8]) -> Result<Self> {
        let mut buffer = ByteBuffer::new(payload.to_vec());
        let tag_header = buffer.read_u8().map_err(|_| Error::protocol("empty audio message"))?;

        let sound_format = tag_header >> 4;
        let aac_packet_type = if sound_format == SOUND_FORMAT_AAC {
            Some(
                buffer
                    .read_u8()
                    .map_err(|_| Error::protocol("audio message missing AAC packet type"))?,
            )
        } else {
            None
        };

        Ok(AudioTag {
            sound_format,
            sound_rate: SoundRate::from_bits(tag_header >> 2),
            sound_size: if tag_header & 0x02 == 0 { SoundSize::Bits8 } else { SoundSize::Bits16 },
            sound_type: if tag_header & 0x01 == 0 { SoundType::Mono } else { SoundType::Stereo },
            aac_packet_type,
            data: buffer.read_remaining(),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buffer = ByteBuffer::with_capacity(self.data.len() + 2);
        let size = match self.sound_size {
            SoundSize::Bits8 => 0,
            SoundSize::Bits16 => 1,
        };
        let channels = match self.sound_type {
            SoundType::Mono => 0,
            SoundType::Stereo => 1,
        };
        buffer.write_u8((self.sound_format << 4) | (self.sound_rate.bits() << 2) | (size << 1) | channels);
        if let Some(packet_type) = self.aac_packet_type {
            buffer.write_u8(packet_type);
        }
        buffer.write_bytes(&self.data);
        buffer.into_vec()
    }

    pub fn is_aac(&self) -> bool {
        self.sound_format == SOUND_FORMAT_AAC
    }

    pub fn is_sequence_header(&self) -> bool {
        self.aac_packet_type == Some(AAC_SEQUENCE_HEADER)
    }
}

/// Parsed MPEG-4 AudioSpecificConfig
#[derive(Debug, Clone, PartialEq)]
pub struct AacConfig {
    /// Audio object type
    pub object_type: u8,

    /// Sampling frequency index
    pub sampling_index: u8,

    /// Channel configuration
    pub channel_config: u8,
}

impl AacConfig {
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 2 {
            return Err(Error::stream("AAC config too short"));
        }
        let object_type = data[0] >> 3;
        let sampling_index = ((data[0] & 0x07) << 1) | (data[1] >> 7);
        let channel_config = (data[1] >> 3) & 0x0F;

        if sampling_index as usize >= SAMPLE_RATES.len() {
            return Err(Error::stream(format!("AAC config has reserved sampling index {}", sampling_index)));
        }

        Ok(AacConfig {
            object_type,
            sampling_index,
            channel_config,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        SAMPLE_RATES
            .get(self.sampling_index as usize)
            .copied()
            .unwrap_or(0)
    }

    /// Channel count; configuration 7 is 7.1
    pub fn channels(&self) -> u8 {
        match self.channel_config {
            7 => 8,
            n => n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aac_config() {
        // AAC-LC, 44.1 kHz, stereo
        let config = AacConfig::parse(&[0x12, 0x10]).unwrap();
        assert_eq!(config.object_type, 2);
        assert_eq!(config.sample_rate(), 44100);
        assert_eq!(config.channels(), 2);

        // AAC-LC, 48 kHz, mono
        let config = AacConfig::parse(&[0x11, 0x88]).unwrap();
        assert_eq!(config.sample_rate(), 48000);
        assert_eq!(config.channels(), 1);
    }

    #[test]
    fn test_invalid_aac_config() {
        assert!(AacConfig::parse(&[0x12]).is_err());
        // sampling index 15 (explicit frequency) is not supported
        assert!(AacConfig::parse(&[0x17, 0x90]).is_err());
    }

    #[test]
    fn test_aac_tag_layout() {
        let tag = AudioTag::aac(AAC_RAW, 2, &[0x21, 0x00]);
        let bytes = tag.encode();
        assert_eq!(bytes, vec![0xAF, 0x01, 0x21, 0x00]);
        assert_eq!(AudioTag::parse(&bytes).unwrap(), tag);

        let mono = AudioTag::aac(AAC_SEQUENCE_HEADER, 1, &[0x11, 0x88]).encode();
        assert_eq!(&mono[..2], &[0xAE, 0x00]);
        assert!(AudioTag::parse(&mono).unwrap().is_sequence_header());
    }

    #[test]
    fn test_non_aac_audio() {
        // MP3, 44 kHz, 16 bit, stereo
        let tag = AudioTag::parse(&[0x2F, 0xFF, 0xFB]).unwrap();
        assert!(!tag.is_aac());
        assert_eq!(tag.aac_packet_type, None);
        assert_eq!(tag.data, vec![0xFF, 0xFB]);
        assert_eq!(tag.encode(), vec![0x2F, 0xFF, 0xFB]);

        assert!(AudioTag::parse(&[]).is_err());
        assert!(AudioTag::parse(&[0xAF]).is_err());
    }
}
