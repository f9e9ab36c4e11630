use thiserror::Error;

/// Fatal outcomes of a stream comparison.
///
/// Differing declared frame counts are not an error: they are recorded as a
/// report advisory, and per-frame read failures end the pull loop the same
/// way a normal end of stream does.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompareError {
    /// The two streams disagree on frame dimensions. Detected before any
    /// frame is pulled, so no partial report exists.
    #[error("video dimensions do not match: original {reference_width}x{reference_height}, compressed {candidate_width}x{candidate_height}")]
    DimensionMismatch {
        reference_width: u32,
        reference_height: u32,
        candidate_width: u32,
        candidate_height: u32,
    },

    /// Not a single frame pair could be read from the two streams.
    #[error("no frames were processed")]
    NoFramesProcessed,
}
