//! Output format routing.
//!
//! Given a probed track descriptor and the requested output path, decide
//! whether the samples can be copied verbatim into the MP4-family output
//! container or have to go through the decode/encode pipeline, and compute
//! the final output path.

use crate::probe::{AudioCodec, AudioTrackInfo};
use ffmpeg_the_third as ffmpeg;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// FFmpeg muxer used for every output file.
pub(crate) const OUTPUT_MUXER: &str = "mp4";

/// Codecs the MP4 muxer stores without re-encoding. Everything else is
/// transcoded to AAC.
const MP4_NATIVE_CODECS: &[AudioCodec] = &[AudioCodec::Aac, AudioCodec::Alac];

/// Bit rate used for every transcoded track.
const TRANSCODE_BIT_RATE: usize = 128_000;

/// Encoder configuration for the transcode path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EncoderTarget {
    /// Sample rate in Hz, preserved from the source track.
    pub sample_rate: u32,
    /// Channel count, preserved from the source track.
    pub channels: u32,
    /// Target bit rate in bits per second.
    pub bit_rate: usize,
}

impl EncoderTarget {
    /// FFmpeg id of the target codec (AAC-LC).
    pub fn codec_id(&self) -> ffmpeg::codec::Id {
        ffmpeg::codec::Id::AAC
    }

    /// Canonical file extension for the target codec's container.
    pub fn extension(&self) -> &'static str {
        "m4a"
    }
}

/// How the samples travel from source to sink.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum TrimStrategy {
    /// Compressed samples are copied byte-for-byte, only timestamps change.
    DirectCopy,
    /// Samples are decoded and re-encoded to the given target.
    Transcode(EncoderTarget),
}

/// The routing decision: where the output goes and how it is produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputPlan {
    /// The path the finished file will be reported under. Differs from the
    /// requested path only when transcoding forces the `m4a` extension.
    pub final_path: PathBuf,
    /// Sample transfer strategy.
    pub strategy: TrimStrategy,
}

/// Decide how to produce the output for the given track.
///
/// Codecs in the routing table copy directly and keep the requested path
/// verbatim. Everything else transcodes to AAC-LC at 128 kbps with the source
/// sample rate and channel count preserved; the output extension is rewritten
/// to `m4a` when the requested one differs, so extension and content never
/// disagree.
pub fn route(track: &AudioTrackInfo, requested_output: &Path) -> OutputPlan {
    if MP4_NATIVE_CODECS.contains(&track.codec) {
        #[cfg(feature = "tracing")]
        tracing::debug!("{} muxes natively, using direct copy", track.codec);

        return OutputPlan {
            final_path: requested_output.to_path_buf(),
            strategy: TrimStrategy::DirectCopy,
        };
    }

    let target = EncoderTarget {
        sample_rate: track.sample_rate,
        channels: track.channels,
        bit_rate: TRANSCODE_BIT_RATE,
    };

    let mut final_path = requested_output.to_path_buf();
    let has_canonical_ext = final_path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case(target.extension()))
        .unwrap_or(false);
    if !has_canonical_ext {
        final_path.set_extension(target.extension());

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "{} requires transcoding, output renamed to {:?}",
            track.codec,
            final_path
        );
    }

    OutputPlan {
        final_path,
        strategy: TrimStrategy::Transcode(target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(codec: AudioCodec) -> AudioTrackInfo {
        AudioTrackInfo {
            index: 0,
            codec,
            sample_rate: 44_100,
            channels: 2,
            bit_rate: Some(192_000),
            duration: None,
        }
    }

    #[test]
    fn test_aac_copies_directly_and_keeps_path() {
        let plan = route(&track(AudioCodec::Aac), Path::new("/out/clip.m4a"));
        assert_eq!(plan.strategy, TrimStrategy::DirectCopy);
        assert_eq!(plan.final_path, PathBuf::from("/out/clip.m4a"));
    }

    #[test]
    fn test_alac_copies_directly() {
        let plan = route(&track(AudioCodec::Alac), Path::new("/out/clip.m4a"));
        assert_eq!(plan.strategy, TrimStrategy::DirectCopy);
    }

    #[test]
    fn test_mp3_transcodes_and_rewrites_extension() {
        let plan = route(&track(AudioCodec::Mp3), Path::new("/out/clip.mp3"));
        assert_eq!(plan.final_path, PathBuf::from("/out/clip.m4a"));
        match plan.strategy {
            TrimStrategy::Transcode(target) => {
                assert_eq!(target.sample_rate, 44_100);
                assert_eq!(target.channels, 2);
                assert_eq!(target.bit_rate, 128_000);
            }
            other => panic!("expected transcode, got {:?}", other),
        }
    }

    #[test]
    fn test_transcode_keeps_existing_m4a_extension() {
        let plan = route(&track(AudioCodec::Pcm), Path::new("/out/clip.M4A"));
        assert_eq!(plan.final_path, PathBuf::from("/out/clip.M4A"));
    }

    #[test]
    fn test_unknown_codec_falls_back_to_transcode() {
        let plan = route(
            &track(AudioCodec::Other("AC3".into())),
            Path::new("/out/clip.ac3"),
        );
        assert!(matches!(plan.strategy, TrimStrategy::Transcode(_)));
        assert_eq!(plan.final_path, PathBuf::from("/out/clip.m4a"));
    }

    #[test]
    fn test_extensionless_request_gains_extension() {
        let plan = route(&track(AudioCodec::Vorbis), Path::new("/out/clip"));
        assert_eq!(plan.final_path, PathBuf::from("/out/clip.m4a"));
    }
}
