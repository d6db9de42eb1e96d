//! Cut a time range out of an audio file into an independently playable
//! M4A, without re-encoding when the source codec allows it.
//!
//! The input is probed for its primary audio track and routed to one of two
//! strategies: sources already carrying MP4-native audio (AAC, ALAC) are
//! trimmed by copying compressed samples with rebased timestamps, everything
//! else is decoded and re-encoded to AAC-LC. In both cases the output is
//! written to a staging area first and moved into place only on success.
//!
//! # Example
//!
//! ```no_run
//! # fn main() -> audiotrim::Result<()> {
//! // Keep seconds 2.5 through 7.5 of the source.
//! let written = audiotrim::trim("voice.mp3", "clip.m4a", 2.5, 7.5)?;
//! println!("trimmed file at {:?}", written);
//! # Ok(())
//! # }
//! ```

mod error;
pub mod probe;
pub mod route;
mod stage;
pub mod trim;

pub use error::{Error, Result};
pub use probe::{AudioCodec, AudioTrackInfo};
pub use route::{EncoderTarget, OutputPlan, TrimStrategy};
pub use trim::{TrimOptions, TrimRequest};

use ffmpeg_the_third as ffmpeg;
use std::path::{Path, PathBuf};
use std::sync::Once;

static FFMPEG_INIT: Once = Once::new();

/// Initialize FFmpeg once per process. Safe to call from multiple threads.
pub(crate) fn init_ffmpeg() {
    FFMPEG_INIT.call_once(|| {
        if let Err(e) = ffmpeg::init() {
            #[cfg(feature = "tracing")]
            tracing::error!("FFmpeg initialization failed: {}", e);
            let _ = e;
        }
    });
}

/// Trim `input` to the `start..end` window (in seconds) and write the result
/// to `output`.
///
/// Returns the path actually written, which differs from `output` only when
/// transcoding rewrites the extension to `m4a`. On error nothing is left at
/// the output path.
pub fn trim<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    start: f64,
    end: f64,
) -> Result<PathBuf> {
    let request = TrimRequest::new(input, output, start, end)?;
    trim::run(&request, &TrimOptions::default())
}

/// Like [`trim`], with explicit options.
pub fn trim_with(request: &TrimRequest, options: &TrimOptions) -> Result<PathBuf> {
    trim::run(request, options)
}

/// Describe the primary audio track of a media file.
pub fn probe<P: AsRef<Path>>(path: P) -> Result<AudioTrackInfo> {
    init_ffmpeg();
    probe::probe_audio_track(path.as_ref())
}

/// Run a trim on a blocking worker thread.
#[cfg(feature = "async")]
pub async fn trim_async<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    start: f64,
    end: f64,
) -> Result<PathBuf> {
    let request = TrimRequest::new(input, output, start, end)?;
    tokio::task::spawn_blocking(move || trim::run(&request, &TrimOptions::default()))
        .await
        .map_err(|e| Error::Unknown(format!("trim worker panicked: {}", e)))?
}
