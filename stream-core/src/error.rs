//! Error types shared across the analysis core

use thiserror::Error;

/// Invalid construction or call-time parameters.
///
/// Configuration problems fail fast and are never silently coerced; they
/// surface to the caller that supplied the values.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The radix-2 transform only handles power-of-two lengths.
    #[error("transform length must be a power of two, got {0}")]
    NonPowerOfTwoLength(usize),

    /// A buffer does not match the transform length it was configured for.
    #[error("buffer length {actual} does not match transform length {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    /// The overlap must leave room for at least one fresh sample per frame.
    #[error("overlap ({overlap}) must be smaller than the frame size ({frame_size})")]
    OverlapTooLarge { overlap: usize, frame_size: usize },

    /// A detector received a block of a different size than it was built for.
    #[error("audio buffer holds {actual} samples, detector expects {expected}")]
    BufferSizeMismatch { expected: usize, actual: usize },
}

/// Failure surfaced from the underlying byte source.
///
/// Source errors are fatal: the dispatcher aborts its run loop as soon as one
/// occurs.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("error while reading audio input stream: {0}")]
    Io(#[from] std::io::Error),

    /// The stream skipped fewer bytes than requested before processing started.
    #[error("did not skip the expected amount of bytes, {skipped} skipped, {expected} expected")]
    SkipFailed { skipped: u64, expected: u64 },

    /// The stream delivered fewer bytes than requested without reaching its end.
    #[error(
        "end of stream not reached and the number of bytes read ({read}) \
         is not the expected amount ({expected})"
    )]
    ShortRead { read: usize, expected: usize },
}
