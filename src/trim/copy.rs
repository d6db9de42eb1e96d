//! Direct-copy trimmer.
//!
//! Streams compressed samples from the input into the MP4 output without
//! touching the payload. Only the presentation timestamps change: everything
//! inside the window is shifted so the output starts at zero. Sync flags and
//! sample sizes are carried over with the packet.

use crate::probe::AudioTrackInfo;
use crate::trim::window::{TrimWindow, WindowPosition};
use crate::{Error, Result};
use ffmpeg_the_third as ffmpeg;

use ffmpeg::Rescale;
use std::path::Path;

/// Largest compressed sample accepted in copy mode. A sample that does not
/// fit is a hard error, never a truncated write.
pub(crate) const MAX_SAMPLE_BYTES: usize = 1024 * 1024;

pub(crate) fn run(
    input: &Path,
    track: &AudioTrackInfo,
    window: &TrimWindow,
    staged: &Path,
) -> Result<()> {
    let mut ictx = ffmpeg::format::input(input)?;

    let stream = ictx
        .stream(track.index)
        .ok_or_else(|| Error::no_audio_track(input))?;
    let in_tb = stream.time_base();

    let mut octx = ffmpeg::format::output_as(staged, crate::route::OUTPUT_MUXER)?;
    {
        let mut ost = octx.add_stream(ffmpeg::encoder::find(ffmpeg::codec::Id::None))?;
        ost.set_parameters(stream.parameters());

        // The source container's codec_tag may be meaningless in MP4.
        unsafe {
            (*(*ost.as_mut_ptr()).codecpar).codec_tag = 0;
        }
    }

    octx.write_header()?;
    let out_tb = octx.stream(0).map(|s| s.time_base()).unwrap_or(in_tb);

    super::seek_to_window_start(&mut ictx, window);

    let start_tb = window.start_us.rescale((1, 1_000_000), in_tb);
    let mut emitted = 0usize;

    for result in ictx.packets() {
        let (stream, mut packet) = result?;
        if stream.index() != track.index {
            continue;
        }

        // A packet we cannot place on the timeline cannot be windowed.
        let Some(ts) = packet.pts().or(packet.dts()) else {
            continue;
        };
        let ts_us = ts.rescale(in_tb, (1, 1_000_000));

        match window.classify(ts_us) {
            WindowPosition::After => break,
            WindowPosition::Before => continue,
            WindowPosition::Inside => {}
        }

        if packet.size() > MAX_SAMPLE_BYTES {
            return Err(Error::BufferOverflow {
                size: packet.size(),
                capacity: MAX_SAMPLE_BYTES,
            });
        }

        if let Some(pts) = packet.pts() {
            packet.set_pts(Some((pts - start_tb).max(0)));
        }
        if let Some(dts) = packet.dts() {
            packet.set_dts(Some((dts - start_tb).max(0)));
        }
        packet.set_stream(0);
        packet.set_position(-1);
        packet.rescale_ts(in_tb, out_tb);
        packet.write_interleaved(&mut octx)?;
        emitted += 1;
    }

    octx.write_trailer()?;

    #[cfg(feature = "tracing")]
    tracing::info!("Direct copy complete: {} samples emitted", emitted);
    let _ = emitted;

    Ok(())
}
