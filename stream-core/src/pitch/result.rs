//! Result carrier for pitch detection

/// Information about a pitch detection on one block of audio.
///
/// `confidence` is a periodicity (voicedness) measure in [0, 1], calculated
/// together with the pitch. A detector can come up with a best guess for a
/// frequency even when it considers the block unpitched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchEstimate {
    /// Estimated fundamental frequency in Hz, -1.0 when no pitch was found.
    pub frequency: f32,
    /// Periodicity confidence in [0, 1].
    pub confidence: f32,
    /// Whether the detector considers the block pitched.
    pub pitched: bool,
}

impl PitchEstimate {
    pub(crate) fn unpitched() -> Self {
        Self {
            frequency: -1.0,
            confidence: 0.0,
            pitched: false,
        }
    }
}

impl Default for PitchEstimate {
    fn default() -> Self {
        Self::unpitched()
    }
}
