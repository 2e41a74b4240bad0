//! Spectral primitives: FFT engine and window functions

pub mod fft;
pub mod window;

pub use fft::{Direction, FftEngine};
pub use window::{apply_window, make_window, WindowKind};
