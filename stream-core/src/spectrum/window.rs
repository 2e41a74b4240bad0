//! Window functions for short-time Fourier analysis
//!
//! Normalised smooth windows in the style of Harris (1978), "On the Use of
//! Windows for Harmonic Analysis with the Discrete Fourier Transform". All
//! windows are normalised by support length and coherent gain.

/// Window function families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    Rectangular,
    Hamming,
    Hann,
    /// Minimum 4-term Blackman-Harris.
    BlackmanHarris,
}

/// Returns the values of a normalised window function.
///
/// `support` is the number of non-zero values; it is clamped to `size`, and
/// when it is smaller the window is zero-padded symmetrically at both ends.
pub fn make_window(kind: WindowKind, size: usize, support: usize) -> Vec<f64> {
    let support = support.min(size);
    let mut data = vec![0.0; size];
    if support == 0 {
        return data;
    }
    let start = (size - support) / 2;
    let factor = std::f64::consts::TAU / support as f64;

    match kind {
        WindowKind::Rectangular => {
            let scale = 1.0 / support as f64;
            for value in data[start..start + support].iter_mut() {
                *value = scale;
            }
        }
        WindowKind::Hamming => {
            let scale = 1.0 / support as f64 / 0.54;
            for (i, value) in data[start..start + support].iter_mut().enumerate() {
                *value = scale * (25.0 / 46.0 - 21.0 / 46.0 * (factor * i as f64).cos());
            }
        }
        WindowKind::Hann => {
            let scale = 1.0 / support as f64 / 0.5;
            for (i, value) in data[start..start + support].iter_mut().enumerate() {
                *value = scale * (0.5 - 0.5 * (factor * i as f64).cos());
            }
        }
        WindowKind::BlackmanHarris => {
            let scale = 1.0 / support as f64 / 0.36;
            for (i, value) in data[start..start + support].iter_mut().enumerate() {
                let x = factor * i as f64;
                *value = scale
                    * (0.35875 - 0.48829 * x.cos() + 0.14128 * (2.0 * x).cos()
                        - 0.01168 * (3.0 * x).cos());
            }
        }
    }
    data
}

/// Applies a window function to a buffer in place (element-wise product).
pub fn apply_window(data: &mut [f64], window: &[f64]) {
    for (d, w) in data.iter_mut().zip(window.iter()) {
        *d *= w;
    }
}
