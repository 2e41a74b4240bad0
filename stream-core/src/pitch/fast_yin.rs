//! FFT-accelerated YIN pitch estimator
//!
//! YIN (de Cheveigné & Kawahara, 2002) estimates the fundamental frequency
//! of a block of audio by searching a cumulative mean normalized difference
//! function for the first period below an absolute threshold. This variant
//! computes the difference function through an FFT correlation, replacing
//! the O(N²) lag loop with O(N log N) transforms.

use crate::error::ConfigurationError;
use crate::pitch::{PitchDetector, PitchEstimate};
use crate::spectrum::fft::{Direction, FftEngine};

/// Default absolute threshold for period candidates. Values around
/// 0.10..0.20 trade sensitivity against octave errors; see the YIN paper.
const DEFAULT_THRESHOLD: f64 = 0.20;

/// FFT-based YIN detector for blocks of a fixed power-of-two size.
///
/// Holds preallocated scratch for the transforms, so an instance is cheap to
/// call repeatedly but must not be shared between threads.
pub struct FastYin {
    sample_rate: f32,
    threshold: f64,

    /// Normalized difference values, exactly half the block size.
    yin_buffer: Vec<f64>,

    /// Signal energies over the sliding half-block window.
    power_terms: Vec<f64>,

    // Transform scratch, one complex pair per input sample.
    audio_re: Vec<f64>,
    audio_im: Vec<f64>,
    kernel_re: Vec<f64>,
    kernel_im: Vec<f64>,
    acf_re: Vec<f64>,
    acf_im: Vec<f64>,

    fft: FftEngine,
}

impl FastYin {
    /// Create a detector for a stream with the given sample rate, processing
    /// blocks of `buffer_size` samples (must be a power of two).
    pub fn new(sample_rate: f32, buffer_size: usize) -> Result<Self, ConfigurationError> {
        Self::with_threshold(sample_rate, buffer_size, DEFAULT_THRESHOLD)
    }

    /// Create a detector with a custom absolute threshold, the parameter
    /// that decides which dips of the difference function are kept as pitch
    /// candidates.
    pub fn with_threshold(
        sample_rate: f32,
        buffer_size: usize,
        threshold: f64,
    ) -> Result<Self, ConfigurationError> {
        let fft = FftEngine::new(buffer_size)?;
        Ok(Self {
            sample_rate,
            threshold,
            yin_buffer: vec![0.0; buffer_size / 2],
            power_terms: vec![0.0; buffer_size / 2],
            audio_re: vec![0.0; buffer_size],
            audio_im: vec![0.0; buffer_size],
            kernel_re: vec![0.0; buffer_size],
            kernel_im: vec![0.0; buffer_size],
            acf_re: vec![0.0; buffer_size],
            acf_im: vec![0.0; buffer_size],
            fft,
        })
    }

    /// Block size this detector was built for.
    pub fn buffer_size(&self) -> usize {
        self.audio_re.len()
    }

    /// The difference function of step 2 of the YIN paper, with the lag loop
    /// replaced by an FFT correlation.
    fn difference(&mut self, audio: &[f32]) -> Result<(), ConfigurationError> {
        let size = audio.len();
        let half = self.yin_buffer.len();

        // Power terms of equation (7), the first over the leading half
        // block, the rest by sliding the window one sample at a time.
        self.power_terms[0] = audio[..half].iter().map(|&s| s as f64 * s as f64).sum();
        for tau in 1..half {
            let dropped = audio[tau - 1] as f64;
            let added = audio[tau + half] as f64;
            self.power_terms[tau] =
                self.power_terms[tau - 1] - dropped * dropped + added * added;
        }

        // Correlation via FFT. First the signal spectrum,
        for (slot, &sample) in self.audio_re.iter_mut().zip(audio.iter()) {
            *slot = sample as f64;
        }
        self.audio_im.fill(0.0);
        self.fft
            .transform(&mut self.audio_re, &mut self.audio_im, Direction::Forward)?;

        // then half of the data, disguised as a convolution kernel.
        self.kernel_re.fill(0.0);
        self.kernel_im.fill(0.0);
        for j in 0..half {
            self.kernel_re[j] = audio[half - 1 - j] as f64;
        }
        self.fft
            .transform(&mut self.kernel_re, &mut self.kernel_im, Direction::Forward)?;

        // Convolution through pointwise complex multiplication.
        for j in 0..size {
            self.acf_re[j] =
                self.audio_re[j] * self.kernel_re[j] - self.audio_im[j] * self.kernel_im[j];
            self.acf_im[j] =
                self.audio_im[j] * self.kernel_re[j] + self.audio_re[j] * self.kernel_im[j];
        }
        self.fft
            .transform(&mut self.acf_re, &mut self.acf_im, Direction::Inverse)?;
        // The inverse transform is unnormalized; dividing by the length
        // completes it.
        let scale = 1.0 / size as f64;
        for value in self.acf_re.iter_mut() {
            *value *= scale;
        }

        // Assemble the difference function according to (7); the correlation
        // for lag tau sits at offset half - 1 + tau of the real part.
        for tau in 0..half {
            self.yin_buffer[tau] = self.power_terms[0] + self.power_terms[tau]
                - 2.0 * self.acf_re[half - 1 + tau];
        }
        Ok(())
    }

    /// The cumulative mean normalized difference function of step 3;
    /// `yin_buffer[0]` and `yin_buffer[1]` end up as 1.
    fn cumulative_mean_normalized_difference(&mut self) {
        self.yin_buffer[0] = 1.0;
        let mut running_sum = 0.0;
        for tau in 1..self.yin_buffer.len() {
            running_sum += self.yin_buffer[tau];
            if running_sum == 0.0 {
                // A silent block keeps the normalized difference at 1 so the
                // threshold scan finds no candidate.
                self.yin_buffer[tau] = 1.0;
            } else {
                self.yin_buffer[tau] *= tau as f64 / running_sum;
            }
        }
    }

    /// The absolute threshold step: the first lag whose normalized
    /// difference dips below the threshold, refined to the bottom of that
    /// dip. Returns the lag and the periodicity confidence.
    fn absolute_threshold(&self) -> Option<(usize, f64)> {
        let buffer = &self.yin_buffer;
        // The first two positions are always 1, start at the third.
        let mut tau = 2;
        while tau < buffer.len() {
            if buffer[tau] < self.threshold {
                while tau + 1 < buffer.len() && buffer[tau + 1] < buffer[tau] {
                    tau += 1;
                }
                // The threshold can be read as the proportion of aperiodic
                // power tolerated within a periodic signal; reported is the
                // periodicity, 1 - aperiodicity.
                let confidence = 1.0 - buffer[tau];
                if confidence > 1.0 {
                    // A negative difference value, treat as no detection.
                    return None;
                }
                return Some((tau, confidence));
            }
            tau += 1;
        }
        None
    }

    /// Step 5: refine the integer lag to sub-sample precision by fitting a
    /// parabola through the dip and its two neighbors. At a buffer boundary
    /// only the single available neighbor is compared.
    fn parabolic_interpolation(&self, tau_estimate: usize) -> f64 {
        let buffer = &self.yin_buffer;
        let x0 = if tau_estimate < 1 {
            tau_estimate
        } else {
            tau_estimate - 1
        };
        let x2 = if tau_estimate + 1 < buffer.len() {
            tau_estimate + 1
        } else {
            tau_estimate
        };

        if x0 == tau_estimate {
            if buffer[tau_estimate] <= buffer[x2] {
                tau_estimate as f64
            } else {
                x2 as f64
            }
        } else if x2 == tau_estimate {
            if buffer[tau_estimate] <= buffer[x0] {
                tau_estimate as f64
            } else {
                x0 as f64
            }
        } else {
            let s0 = buffer[x0];
            let s1 = buffer[tau_estimate];
            let s2 = buffer[x2];
            tau_estimate as f64 + (s2 - s0) / (2.0 * (2.0 * s1 - s2 - s0))
        }
    }
}

impl PitchDetector for FastYin {
    fn get_pitch(&mut self, audio_buffer: &[f32]) -> Result<PitchEstimate, ConfigurationError> {
        if audio_buffer.len() != self.buffer_size() {
            return Err(ConfigurationError::BufferSizeMismatch {
                expected: self.buffer_size(),
                actual: audio_buffer.len(),
            });
        }

        self.difference(audio_buffer)?;
        self.cumulative_mean_normalized_difference();

        Ok(match self.absolute_threshold() {
            Some((tau_estimate, confidence)) => {
                let better_tau = self.parabolic_interpolation(tau_estimate);
                PitchEstimate {
                    frequency: (self.sample_rate as f64 / better_tau) as f32,
                    confidence: confidence as f32,
                    pitched: true,
                }
            }
            None => PitchEstimate::unpitched(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sine(frequency: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                (std::f32::consts::TAU * frequency * i as f32 / sample_rate).sin() * 0.8
            })
            .collect()
    }

    #[test]
    fn detects_a_pure_tone_within_half_a_hertz() {
        let mut detector = FastYin::new(44100.0, 1024).unwrap();
        let estimate = detector.get_pitch(&sine(440.0, 44100.0, 1024)).unwrap();
        assert!(estimate.pitched);
        assert_abs_diff_eq!(estimate.frequency, 440.0, epsilon = 0.5);
        assert!(estimate.confidence > 0.9);
    }

    #[test]
    fn tracks_tones_across_the_range() {
        // The lag grid gets coarser towards high frequencies, so the
        // acceptable error grows with the tone.
        for (frequency, block, epsilon) in [
            (110.0, 2048, 0.5),
            (220.0, 2048, 0.5),
            (880.0, 1024, 4.0),
            (1760.0, 512, 10.0),
        ] {
            let mut detector = FastYin::new(44100.0, block).unwrap();
            let estimate = detector
                .get_pitch(&sine(frequency, 44100.0, block))
                .unwrap();
            assert!(estimate.pitched, "{frequency} Hz should be pitched");
            assert_abs_diff_eq!(estimate.frequency, frequency, epsilon = epsilon);
        }
    }

    #[test]
    fn a_silent_block_is_unpitched() {
        let mut detector = FastYin::new(44100.0, 1024).unwrap();
        let estimate = detector.get_pitch(&[0.0; 1024]).unwrap();
        assert!(!estimate.pitched);
        assert_eq!(estimate.frequency, -1.0);
        assert_eq!(estimate.confidence, 0.0);
    }

    #[test]
    fn white_noise_is_unpitched() {
        // Deterministic pseudo-noise with no periodicity to latch on to.
        let mut state = 0x9e3779b97f4a7c15u64;
        let noise: Vec<f32> = (0..1024)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
                ((state >> 40) as f32 / (1u64 << 24) as f32) * 2.0 - 1.0
            })
            .collect();
        let mut detector = FastYin::new(44100.0, 1024).unwrap();
        let estimate = detector.get_pitch(&noise).unwrap();
        assert!(!estimate.pitched);
    }

    #[test]
    fn rejects_blocks_of_the_wrong_size() {
        let mut detector = FastYin::new(44100.0, 1024).unwrap();
        assert_eq!(
            detector.get_pitch(&[0.0; 512]).unwrap_err(),
            ConfigurationError::BufferSizeMismatch {
                expected: 1024,
                actual: 512
            }
        );
    }

    #[test]
    fn rejects_a_non_power_of_two_block_size() {
        assert!(matches!(
            FastYin::new(44100.0, 1000),
            Err(ConfigurationError::NonPowerOfTwoLength(1000))
        ));
    }

    #[test]
    fn threshold_controls_sensitivity() {
        // An impossibly strict threshold turns a clean tone unpitched.
        let mut strict = FastYin::with_threshold(44100.0, 1024, 1e-9).unwrap();
        let estimate = strict.get_pitch(&sine(440.0, 44100.0, 1024)).unwrap();
        assert!(!estimate.pitched);
    }
}
