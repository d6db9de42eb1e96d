//! The trim pipeline.
//!
//! A trim runs in four steps: probe the input for its primary audio track,
//! route the track to a strategy (direct copy or transcode), run that
//! trimmer against a staged file, and atomically move the result into place.
//! Failures at any step leave nothing at the output path.

mod copy;
mod transcode;
mod window;

use crate::stage::OutputStage;
use crate::{Error, Result};
use ffmpeg_the_third as ffmpeg;

use std::path::{Path, PathBuf};
use window::TrimWindow;

/// A validated trim request.
///
/// Construction enforces the argument contract: both bounds must be finite,
/// the start non-negative, and the end strictly after the start. A window
/// that reaches past the end of the input is legal; it is clamped by the
/// input simply running out of samples.
#[derive(Debug, Clone)]
pub struct TrimRequest {
    input: PathBuf,
    output: PathBuf,
    start: f64,
    end: f64,
}

impl TrimRequest {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        input: P,
        output: Q,
        start: f64,
        end: f64,
    ) -> Result<Self> {
        if !start.is_finite() || !end.is_finite() {
            return Err(Error::invalid_arguments(format!(
                "trim bounds must be finite, got {}..{}",
                start, end
            )));
        }
        if start < 0.0 {
            return Err(Error::invalid_arguments(format!(
                "trim start must be non-negative, got {}",
                start
            )));
        }
        if end <= start {
            return Err(Error::invalid_arguments(format!(
                "trim end must be after start, got {}..{}",
                start, end
            )));
        }

        Ok(Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            start,
            end,
        })
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }
}

/// Tuning knobs for a trim run.
#[derive(Debug, Clone)]
pub struct TrimOptions {
    /// How many consecutive no-progress retries a full codec is allowed
    /// before the run is abandoned as stalled.
    pub stall_limit: u32,
}

impl Default for TrimOptions {
    fn default() -> Self {
        Self { stall_limit: 1024 }
    }
}

/// Position the demuxer at the last seek point at or before the window
/// start, so the decoder sees every packet it needs to reconstruct the
/// first in-window sample.
///
/// A failed seek is not fatal; the read loop then starts from the beginning
/// of the file and the window filter drops the extra packets.
pub(crate) fn seek_to_window_start(
    ictx: &mut ffmpeg::format::context::Input,
    window: &TrimWindow,
) {
    if window.start_us == 0 {
        return;
    }

    if let Err(e) = ictx.seek(window.start_us, ..window.start_us) {
        #[cfg(feature = "tracing")]
        tracing::warn!(
            "Seek to {}us failed ({}), reading from the start instead",
            window.start_us,
            e
        );
        let _ = e;
    }
}

pub(crate) fn run(request: &TrimRequest, options: &TrimOptions) -> Result<PathBuf> {
    crate::init_ffmpeg();

    if !request.input.is_file() {
        return Err(Error::input_not_found(&request.input));
    }

    let track = crate::probe::probe_audio_track(&request.input)?;
    let plan = crate::route::route(&track, &request.output);
    let window = TrimWindow::from_seconds(request.start, request.end);

    #[cfg(feature = "tracing")]
    tracing::info!(
        "Trimming {:?} ({}) {}..{}s via {:?}",
        request.input,
        track.codec,
        request.start,
        request.end,
        plan.strategy
    );

    let stage = OutputStage::new(&plan.final_path)?;

    let outcome = match &plan.strategy {
        crate::route::TrimStrategy::DirectCopy => {
            copy::run(&request.input, &track, &window, stage.staged())
        }
        crate::route::TrimStrategy::Transcode(target) => transcode::run(
            &request.input,
            &track,
            target,
            &window,
            stage.staged(),
            options,
        ),
    };

    match outcome {
        Ok(()) => stage.finalize(),
        Err(e) => {
            stage.discard();
            Err(e)
        }
    }
}
