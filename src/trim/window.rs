//! The shared trim window.
//!
//! Both trimmers apply the same rules: timestamps past the end stop the read
//! loop, timestamps before the start are consumed without being emitted, and
//! everything inside the window is emitted with the start subtracted so the
//! output begins at zero. The end is inclusive.

/// One microsecond tick per unit, the resolution of all window math.
pub(crate) const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Where a timestamp falls relative to the trim window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WindowPosition {
    /// Before the window: consume (prime decoders) but do not emit.
    Before,
    /// Inside the window: emit with a rebased timestamp.
    Inside,
    /// Past the window: stop reading, the sample is discarded.
    After,
}

/// Trim window in integer microseconds.
///
/// An empty window (nothing between start and end in the source) is not an
/// error; the trim still produces a structurally valid, empty-duration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TrimWindow {
    pub start_us: i64,
    pub end_us: i64,
}

impl TrimWindow {
    /// Build a window from validated start/end seconds, rounding to the
    /// nearest microsecond tick.
    pub fn from_seconds(start: f64, end: f64) -> Self {
        Self {
            start_us: (start * MICROS_PER_SECOND).round() as i64,
            end_us: (end * MICROS_PER_SECOND).round() as i64,
        }
    }

    /// Classify a presentation timestamp in microseconds.
    pub fn classify(&self, t_us: i64) -> WindowPosition {
        if t_us > self.end_us {
            WindowPosition::After
        } else if t_us < self.start_us {
            WindowPosition::Before
        } else {
            WindowPosition::Inside
        }
    }

    /// Shift a timestamp so the window start becomes zero.
    pub fn rebase(&self, t_us: i64) -> i64 {
        t_us - self.start_us
    }
}
