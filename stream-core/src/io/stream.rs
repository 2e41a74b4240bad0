//! Abstract byte source consumed by the dispatcher

use crate::error::SourceError;
use crate::io::format::AudioFormat;

/// A stream of raw audio bytes in a known format.
///
/// Concrete sources (files, pipes, ring buffers fed by capture threads)
/// implement only this interface; decoding and frame management happen in the
/// dispatcher.
pub trait AudioInputStream {
    /// Read up to `buffer.len()` bytes into the buffer.
    ///
    /// Returns the number of bytes read; `Ok(0)` signals the end of the
    /// stream. A blocking source may wait for data before returning.
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, SourceError>;

    /// Skip over bytes without decoding them. Returns the number of bytes
    /// actually skipped, which is smaller than requested only at the end of
    /// the stream.
    fn skip(&mut self, bytes: u64) -> Result<u64, SourceError>;

    /// Release the underlying resource. Reads after close report end of
    /// stream.
    fn close(&mut self) -> Result<(), SourceError>;

    /// The format of the bytes this stream delivers.
    fn format(&self) -> AudioFormat;
}

/// Byte-vector backed stream, used to dispatch pre-decoded audio held in
/// memory and throughout the test suite.
pub struct MemoryAudioStream {
    data: Vec<u8>,
    position: usize,
    closed: bool,
    format: AudioFormat,
}

impl MemoryAudioStream {
    pub fn new(data: Vec<u8>, format: AudioFormat) -> Self {
        Self {
            data,
            position: 0,
            closed: false,
            format,
        }
    }

    /// Encode normalized samples with the format's converter and wrap the
    /// bytes as a stream.
    pub fn from_samples(samples: &[f32], format: AudioFormat) -> Self {
        let mut data = vec![0u8; samples.len() * format.bytes_per_frame()];
        format.converter().to_byte_array(samples, &mut data);
        Self::new(data, format)
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.position
    }
}

impl AudioInputStream for MemoryAudioStream {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, SourceError> {
        if self.closed {
            return Ok(0);
        }
        let n = buffer.len().min(self.remaining());
        buffer[..n].copy_from_slice(&self.data[self.position..self.position + n]);
        self.position += n;
        Ok(n)
    }

    fn skip(&mut self, bytes: u64) -> Result<u64, SourceError> {
        let n = (bytes.min(self.remaining() as u64)) as usize;
        self.position += n;
        Ok(n as u64)
    }

    fn close(&mut self) -> Result<(), SourceError> {
        self.closed = true;
        Ok(())
    }

    fn format(&self) -> AudioFormat {
        self.format
    }
}
