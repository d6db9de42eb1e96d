//! Audio track probing.
//!
//! Opens the input container, finds the first audio track and returns its
//! format descriptor. The source handle is closed again before returning;
//! the trimmers open their own handle, so probing never leaks an open
//! demuxer into the rest of the pipeline.

mod types;

pub use types::{AudioCodec, AudioTrackInfo};

use crate::{Error, Result};
use ffmpeg_the_third as ffmpeg;
use std::path::Path;
use std::time::Duration;

/// Probe a media file and return the descriptor of its first audio track.
///
/// Fails with [`Error::InputNotFound`] when the file does not exist and with
/// [`Error::NoAudioTrack`] when the container holds no audio stream.
pub fn probe_audio_track(path: &Path) -> Result<AudioTrackInfo> {
    crate::init_ffmpeg();

    if !path.is_file() {
        return Err(Error::input_not_found(path));
    }

    let ictx = ffmpeg::format::input(path)?;

    let duration = if ictx.duration() > 0 {
        Some(Duration::from_micros(ictx.duration() as u64))
    } else {
        None
    };

    for stream in ictx.streams() {
        let params = stream.parameters();
        if params.medium() != ffmpeg::media::Type::Audio {
            continue;
        }

        let codec_ctx = ffmpeg::codec::context::Context::from_parameters(params)?;
        let codec_id = codec_ctx.id();
        let audio = match codec_ctx.decoder().audio() {
            Ok(audio) => audio,
            // A stream we cannot even open a decoder for is useless to both
            // trimmers; keep looking for a usable one.
            Err(_) => continue,
        };

        let info = AudioTrackInfo {
            index: stream.index(),
            codec: AudioCodec::from_id(codec_id),
            sample_rate: audio.rate(),
            channels: audio.ch_layout().channels(),
            bit_rate: match audio.bit_rate() {
                0 => None,
                rate => Some(rate),
            },
            duration,
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Probed {:?}: {} {} Hz {} ch",
            path,
            info.codec,
            info.sample_rate,
            info.channels
        );

        return Ok(info);
    }

    Err(Error::no_audio_track(path))
}
