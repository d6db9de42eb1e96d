//! Error types for audiotrim.

use std::path::PathBuf;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while trimming audio.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The trim request itself is malformed (bad time range, non-finite input).
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The input file does not exist or is not a readable file.
    #[error("input file not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    /// The input container holds no audio track.
    #[error("no audio track found in {}", path.display())]
    NoAudioTrack { path: PathBuf },

    /// A decoder or encoder could not be created, configured or opened.
    #[error("codec initialization failed: {0}")]
    CodecInit(String),

    /// A compressed sample is larger than the transfer buffer.
    #[error("sample of {size} bytes exceeds the {capacity} byte sample buffer")]
    BufferOverflow { size: usize, capacity: usize },

    /// A pipeline stage stopped accepting and producing data.
    #[error("pipeline stalled in {stage} after {retries} retries")]
    StalledPipeline { stage: &'static str, retries: u32 },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// FFmpeg library error.
    #[error("FFmpeg error: {0}")]
    Ffmpeg(String),

    /// Catch-all for failures that fit no other variant.
    #[error("unknown error: {0}")]
    Unknown(String),
}

impl Error {
    /// Create an invalid arguments error.
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::InvalidArguments(message.into())
    }

    /// Create an input not found error.
    pub fn input_not_found(path: impl Into<PathBuf>) -> Self {
        Self::InputNotFound { path: path.into() }
    }

    /// Create a no audio track error.
    pub fn no_audio_track(path: impl Into<PathBuf>) -> Self {
        Self::NoAudioTrack { path: path.into() }
    }

    /// Create a codec initialization error.
    pub fn codec_init(message: impl Into<String>) -> Self {
        Self::CodecInit(message.into())
    }

    /// Stable machine-readable kind string, suitable for reporting across a
    /// host-language boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidArguments(_) => "INVALID_ARGUMENTS",
            Error::InputNotFound { .. } => "INPUT_NOT_FOUND",
            Error::NoAudioTrack { .. } => "NO_AUDIO_TRACK",
            Error::CodecInit(_) => "CODEC_INIT_FAILED",
            Error::BufferOverflow { .. } => "BUFFER_OVERFLOW",
            Error::StalledPipeline { .. } => "STALLED_PIPELINE",
            Error::Io(_) => "IO_ERROR",
            Error::Ffmpeg(_) => "FFMPEG_ERROR",
            Error::Unknown(_) => "UNKNOWN",
        }
    }
}

impl From<ffmpeg_the_third::Error> for Error {
    fn from(err: ffmpeg_the_third::Error) -> Self {
        Error::Ffmpeg(err.to_string())
    }
}
