//! Tonestream - Streaming Audio Analysis Core
//!
//! Turns a raw byte stream of PCM audio into a sequence of fixed-size,
//! optionally overlapping analysis frames and runs a chain of processors
//! over them with frame-accurate timing. Ships an in-place radix-2 FFT
//! engine with derived spectral representations and an FFT-accelerated YIN
//! pitch estimator as the reference analysis processor.

pub mod dispatch;
pub mod io;
pub mod pitch;
pub mod spectrum;

mod error;

pub use dispatch::{AudioDispatcher, AudioFrame, AudioProcessor, FrameExtent};
pub use error::{ConfigurationError, SourceError};
pub use io::{AudioFormat, AudioInputStream, MemoryAudioStream, SampleEncoding};
pub use pitch::{FastYin, PitchDetector, PitchEstimate, PitchProcessor};
pub use spectrum::{Direction, FftEngine, WindowKind};
