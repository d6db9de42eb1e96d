//! Audio track descriptor types.

use ffmpeg_the_third as ffmpeg;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Audio codecs the prober can identify.
///
/// Anything not listed explicitly is carried as [`AudioCodec::Other`] with the
/// FFmpeg codec name, so the router can still make a (transcode) decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AudioCodec {
    /// AAC (Advanced Audio Coding)
    Aac,
    /// Apple Lossless
    Alac,
    /// MPEG layer III
    Mp3,
    /// Free Lossless Audio Codec
    Flac,
    /// Opus
    Opus,
    /// Vorbis
    Vorbis,
    /// Uncompressed PCM (any width/endianness)
    Pcm,
    /// Any other codec, identified by its FFmpeg name.
    Other(String),
}

impl AudioCodec {
    /// Map an FFmpeg codec id onto our codec enum.
    pub(crate) fn from_id(id: ffmpeg::codec::Id) -> Self {
        use ffmpeg::codec::Id;

        match id {
            Id::AAC => AudioCodec::Aac,
            Id::ALAC => AudioCodec::Alac,
            Id::MP3 => AudioCodec::Mp3,
            Id::FLAC => AudioCodec::Flac,
            Id::OPUS => AudioCodec::Opus,
            Id::VORBIS => AudioCodec::Vorbis,
            id => {
                let name = format!("{:?}", id);
                if name.starts_with("PCM_") {
                    AudioCodec::Pcm
                } else {
                    AudioCodec::Other(name)
                }
            }
        }
    }
}

impl std::fmt::Display for AudioCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioCodec::Aac => write!(f, "AAC"),
            AudioCodec::Alac => write!(f, "ALAC"),
            AudioCodec::Mp3 => write!(f, "MP3"),
            AudioCodec::Flac => write!(f, "FLAC"),
            AudioCodec::Opus => write!(f, "Opus"),
            AudioCodec::Vorbis => write!(f, "Vorbis"),
            AudioCodec::Pcm => write!(f, "PCM"),
            AudioCodec::Other(name) => write!(f, "{}", name),
        }
    }
}

/// Format metadata for one audio track, as read from the source container.
///
/// Immutable once probed; the trimmers reopen the source themselves and use
/// this only to locate the stream and configure the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioTrackInfo {
    /// Stream index inside the container.
    pub index: usize,
    /// Codec of the track.
    pub codec: AudioCodec,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of channels.
    pub channels: u32,
    /// Bit rate in bits per second, when the container declares one.
    pub bit_rate: Option<usize>,
    /// Container-reported duration, when known.
    pub duration: Option<Duration>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffmpeg::codec::Id;

    #[test]
    fn test_codec_mapping() {
        assert_eq!(AudioCodec::from_id(Id::AAC), AudioCodec::Aac);
        assert_eq!(AudioCodec::from_id(Id::MP3), AudioCodec::Mp3);
        assert_eq!(AudioCodec::from_id(Id::PCM_S16LE), AudioCodec::Pcm);
        assert_eq!(AudioCodec::from_id(Id::PCM_F32BE), AudioCodec::Pcm);
        assert!(matches!(
            AudioCodec::from_id(Id::AC3),
            AudioCodec::Other(_)
        ));
    }

    #[test]
    fn test_codec_display() {
        assert_eq!(AudioCodec::Aac.to_string(), "AAC");
        assert_eq!(AudioCodec::Other("AC3".into()).to_string(), "AC3");
    }
}
