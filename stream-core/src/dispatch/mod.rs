//! Streaming buffer engine and the processor contract

pub mod dispatcher;
pub mod frame;
pub mod processor;

pub use dispatcher::AudioDispatcher;
pub use frame::{AudioFrame, FrameExtent};
pub use processor::{AudioProcessor, SilenceDetector, ZeroCrossingRate};
