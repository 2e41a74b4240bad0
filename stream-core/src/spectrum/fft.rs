//! In-place radix-2 FFT engine for power-of-two lengths
//!
//! Complex data is stored in two separate arrays (real and imaginary part),
//! which keeps the derived real-input spectra allocation-free.

use num_complex::Complex64;

use crate::error::ConfigurationError;

/// Transform direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Inverse,
}

impl Direction {
    /// Sign of the twiddle-factor exponent.
    fn sign(self) -> f64 {
        match self {
            Direction::Forward => -1.0,
            Direction::Inverse => 1.0,
        }
    }
}

/// FFT engine of a fixed power-of-two size with derived spectral transforms.
pub struct FftEngine {
    size: usize,

    /// Scratch imaginary buffer for the real-input spectra.
    scratch: Vec<f64>,
}

/// In-place radix-2 Cooley-Tukey transform: bit-reversal permutation followed
/// by butterfly stages. Length of `re` and `im` must be an equal power of two;
/// the engine methods validate this before delegating here.
fn fft_in_place(re: &mut [f64], im: &mut [f64], direction: Direction) {
    let n = re.len();
    let bits = n.trailing_zeros();

    // Bit-reversal permutation.
    let mut j = 0usize;
    for i in 0..n.saturating_sub(1) {
        if i < j {
            re.swap(i, j);
            im.swap(i, j);
        }
        let mut k = n / 2;
        while k >= 1 && k - 1 < j {
            j -= k;
            k /= 2;
        }
        j += k;
    }

    // Butterfly stages of doubling span.
    for m in 1..=bits {
        let local_n = 1usize << m;
        let half_span = local_n / 2;
        let theta = std::f64::consts::TAU / local_n as f64;
        let w_step = Complex64::new(theta.cos(), direction.sign() * theta.sin());
        let mut w = Complex64::new(1.0, 0.0);
        for j in 0..half_span {
            let mut k = j;
            while k < n {
                let id = k + half_span;
                let t = w * Complex64::new(re[id], im[id]);
                re[id] = re[k] - t.re;
                im[id] = im[k] - t.im;
                re[k] += t.re;
                im[k] += t.im;
                k += local_n;
            }
            w *= w_step;
        }
    }
}

impl FftEngine {
    /// Create an engine for transforms of the given length.
    ///
    /// Returns a [`ConfigurationError`] unless `size` is a power of two.
    pub fn new(size: usize) -> Result<Self, ConfigurationError> {
        if size == 0 || !size.is_power_of_two() {
            return Err(ConfigurationError::NonPowerOfTwoLength(size));
        }
        Ok(Self {
            size,
            scratch: vec![0.0; size],
        })
    }

    /// Transform length (number of bins).
    pub fn size(&self) -> usize {
        self.size
    }

    fn check_len(&self, len: usize) -> Result<(), ConfigurationError> {
        if len != self.size {
            return Err(ConfigurationError::LengthMismatch {
                expected: self.size,
                actual: len,
            });
        }
        Ok(())
    }

    /// In-place discrete Fourier transform of complex data stored in two
    /// separate arrays.
    ///
    /// The inverse direction is the unnormalized adjoint of the forward
    /// transform: a forward/inverse round trip scales every sample by the
    /// transform length, and callers wanting an exact inverse must divide
    /// every output sample by [`size`](Self::size) themselves.
    pub fn transform(
        &self,
        re: &mut [f64],
        im: &mut [f64],
        direction: Direction,
    ) -> Result<(), ConfigurationError> {
        self.check_len(re.len())?;
        self.check_len(im.len())?;
        fft_in_place(re, im, direction);
        Ok(())
    }

    /// Compute the power spectrum of a real sequence in place.
    ///
    /// Forward-transforms `re` against a zero imaginary buffer and replaces
    /// `re[i]` with `re[i]² + im[i]²`.
    pub fn power_spectrum(&mut self, re: &mut [f64]) -> Result<(), ConfigurationError> {
        self.check_len(re.len())?;
        self.scratch.fill(0.0);
        fft_in_place(re, &mut self.scratch, Direction::Forward);
        for (r, i) in re.iter_mut().zip(self.scratch.iter()) {
            *r = *r * *r + *i * *i;
        }
        Ok(())
    }

    /// Compute the magnitude spectrum of a real sequence in place.
    pub fn magnitude_spectrum(&mut self, re: &mut [f64]) -> Result<(), ConfigurationError> {
        self.power_spectrum(re)?;
        for r in re.iter_mut() {
            *r = r.sqrt();
        }
        Ok(())
    }

    /// Transform complex input to polar form: power into `re`, phase
    /// (`atan2(im, re)`) into `im`.
    pub fn power_phase_spectrum(
        &self,
        re: &mut [f64],
        im: &mut [f64],
    ) -> Result<(), ConfigurationError> {
        self.transform(re, im, Direction::Forward)?;
        for (r, i) in re.iter_mut().zip(im.iter_mut()) {
            let power = *r * *r + *i * *i;
            *i = i.atan2(*r);
            *r = power;
        }
        Ok(())
    }

    /// Transform complex input to polar form: magnitude into `re`, phase into
    /// `im`.
    pub fn magnitude_phase_spectrum(
        &self,
        re: &mut [f64],
        im: &mut [f64],
    ) -> Result<(), ConfigurationError> {
        self.power_phase_spectrum(re, im)?;
        for r in re.iter_mut() {
            *r = r.sqrt();
        }
        Ok(())
    }

    /// Frequency in Hz at the center of the given bin.
    pub fn bin_to_hz(&self, bin: usize, sample_rate: f32) -> f64 {
        bin as f64 * sample_rate as f64 / self.size as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use rustfft::num_complex::Complex;
    use rustfft::FftPlanner;

    /// Small deterministic generator so the tests need no RNG dependency.
    struct Lcg(u64);

    impl Lcg {
        fn next_sample(&mut self) -> f64 {
            self.0 = self
                .0
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (self.0 >> 11) as f64 / (1u64 << 53) as f64 * 2.0 - 1.0
        }
    }

    #[test]
    fn round_trip_recovers_signal_after_division_by_n() {
        for k in 1..=16u32 {
            let n = 1usize << k;
            let engine = FftEngine::new(n).unwrap();
            let mut rng = Lcg(7 + k as u64);
            let re: Vec<f64> = (0..n).map(|_| rng.next_sample()).collect();
            let im: Vec<f64> = (0..n).map(|_| rng.next_sample()).collect();

            let mut re_t = re.clone();
            let mut im_t = im.clone();
            engine
                .transform(&mut re_t, &mut im_t, Direction::Forward)
                .unwrap();
            engine
                .transform(&mut re_t, &mut im_t, Direction::Inverse)
                .unwrap();
            // The inverse is unnormalized: completing the round trip is the
            // caller's job.
            for v in re_t.iter_mut().chain(im_t.iter_mut()) {
                *v /= n as f64;
            }

            for i in 0..n {
                assert_relative_eq!(re_t[i], re[i], max_relative = 1e-6, epsilon = 1e-9);
                assert_relative_eq!(im_t[i], im[i], max_relative = 1e-6, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn forward_twice_is_not_an_inverse() {
        // Documented misuse case: a second forward transform reverses the
        // signal (scaled by n) instead of restoring it.
        let n = 256;
        let engine = FftEngine::new(n).unwrap();
        let mut rng = Lcg(99);
        let re: Vec<f64> = (0..n).map(|_| rng.next_sample()).collect();
        let im: Vec<f64> = (0..n).map(|_| rng.next_sample()).collect();

        let mut re_t = re.clone();
        let mut im_t = im.clone();
        engine
            .transform(&mut re_t, &mut im_t, Direction::Forward)
            .unwrap();
        engine
            .transform(&mut re_t, &mut im_t, Direction::Forward)
            .unwrap();
        for v in re_t.iter_mut().chain(im_t.iter_mut()) {
            *v /= n as f64;
        }

        assert!(
            (0..n).any(|i| (re_t[i] - re[i]).abs() > 1e-3),
            "double forward transform must not reproduce the input"
        );
        // What it does produce is the index-reversed signal.
        for i in 0..n {
            let r = (n - i) % n;
            assert_relative_eq!(re_t[i], re[r], max_relative = 1e-6, epsilon = 1e-9);
            assert_relative_eq!(im_t[i], im[r], max_relative = 1e-6, epsilon = 1e-9);
        }
    }

    #[test]
    fn forward_matches_reference_transform() {
        let n = 1024;
        let engine = FftEngine::new(n).unwrap();
        let mut rng = Lcg(1234);
        let mut re: Vec<f64> = (0..n).map(|_| rng.next_sample()).collect();
        let mut im: Vec<f64> = (0..n).map(|_| rng.next_sample()).collect();

        let mut reference: Vec<Complex<f64>> = re
            .iter()
            .zip(im.iter())
            .map(|(&r, &i)| Complex::new(r, i))
            .collect();
        FftPlanner::new().plan_fft_forward(n).process(&mut reference);

        engine.transform(&mut re, &mut im, Direction::Forward).unwrap();

        for i in 0..n {
            assert_abs_diff_eq!(re[i], reference[i].re, epsilon = 1e-6);
            assert_abs_diff_eq!(im[i], reference[i].im, epsilon = 1e-6);
        }
    }

    #[test]
    fn inverse_of_flat_spectrum_is_scaled_impulse() {
        let n = 64;
        let engine = FftEngine::new(n).unwrap();
        let mut re = vec![1.0; n];
        let mut im = vec![0.0; n];
        engine.transform(&mut re, &mut im, Direction::Inverse).unwrap();

        // Unnormalized: the impulse comes back scaled by n, not by 1.
        assert_abs_diff_eq!(re[0], n as f64, epsilon = 1e-9);
        for i in 1..n {
            assert_abs_diff_eq!(re[i], 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn power_spectrum_peaks_at_tone_bin() {
        let n = 1024;
        let bin = 32;
        let mut engine = FftEngine::new(n).unwrap();
        let mut re: Vec<f64> = (0..n)
            .map(|i| (std::f64::consts::TAU * bin as f64 * i as f64 / n as f64).sin())
            .collect();

        engine.power_spectrum(&mut re).unwrap();

        let (peak_bin, _) = re[..n / 2]
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
            .unwrap();
        assert_eq!(peak_bin, bin);
        // A unit sine concentrates (n/2)² of power in its bin.
        let expected = (n as f64 / 2.0) * (n as f64 / 2.0);
        assert_relative_eq!(re[bin], expected, max_relative = 1e-6);
    }

    #[test]
    fn magnitude_phase_of_cosine_and_sine() {
        let n = 512;
        let bin = 16;
        let engine = FftEngine::new(n).unwrap();

        let mut re: Vec<f64> = (0..n)
            .map(|i| (std::f64::consts::TAU * bin as f64 * i as f64 / n as f64).cos())
            .collect();
        let mut im = vec![0.0; n];
        engine.magnitude_phase_spectrum(&mut re, &mut im).unwrap();
        assert_relative_eq!(re[bin], n as f64 / 2.0, max_relative = 1e-6);
        assert_abs_diff_eq!(im[bin], 0.0, epsilon = 1e-6);

        let mut re: Vec<f64> = (0..n)
            .map(|i| (std::f64::consts::TAU * bin as f64 * i as f64 / n as f64).sin())
            .collect();
        let mut im = vec![0.0; n];
        engine.magnitude_phase_spectrum(&mut re, &mut im).unwrap();
        assert_relative_eq!(re[bin], n as f64 / 2.0, max_relative = 1e-6);
        assert_abs_diff_eq!(im[bin], -std::f64::consts::FRAC_PI_2, epsilon = 1e-6);
    }

    #[test]
    fn rejects_invalid_lengths() {
        assert!(matches!(
            FftEngine::new(1000),
            Err(ConfigurationError::NonPowerOfTwoLength(1000))
        ));
        assert!(matches!(
            FftEngine::new(0),
            Err(ConfigurationError::NonPowerOfTwoLength(0))
        ));

        let engine = FftEngine::new(64).unwrap();
        let mut re = vec![0.0; 32];
        let mut im = vec![0.0; 64];
        assert_eq!(
            engine.transform(&mut re, &mut im, Direction::Forward),
            Err(ConfigurationError::LengthMismatch {
                expected: 64,
                actual: 32
            })
        );
    }
}
