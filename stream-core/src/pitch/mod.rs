//! Pitch estimation

pub mod fast_yin;
pub mod processor;
mod result;

pub use fast_yin::FastYin;
pub use processor::PitchProcessor;
pub use result::PitchEstimate;

use crate::error::ConfigurationError;

/// A pitch estimation algorithm working on fixed-size blocks of audio.
pub trait PitchDetector {
    /// Estimate the fundamental frequency of one block of normalized
    /// samples. The block length must match the size the detector was built
    /// for.
    ///
    /// An unpitched block is an ordinary result, not an error.
    fn get_pitch(&mut self, audio_buffer: &[f32]) -> Result<PitchEstimate, ConfigurationError>;
}
