//! Source abstraction and the PCM byte boundary

pub mod format;
pub mod ring;
pub mod stream;

pub use format::{AudioFormat, FloatConverter, SampleEncoding};
pub use ring::{ring_buffer_stream, RingBufferStream, RingBufferWriter};
pub use stream::{AudioInputStream, MemoryAudioStream};
