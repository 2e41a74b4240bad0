//! Lock-free ring buffer source for live audio
//!
//! Pairs a [`RingBufferWriter`] on a capture thread with a
//! [`RingBufferStream`] feeding a dispatcher on another thread. The stream
//! end blocks (spin-yield) until data arrives or the writer marks the end of
//! the stream.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ringbuf::{HeapConsumer, HeapProducer, HeapRb};

use crate::error::SourceError;
use crate::io::format::AudioFormat;
use crate::io::stream::AudioInputStream;

/// Create a connected writer/stream pair over a ring buffer of the given
/// byte capacity.
pub fn ring_buffer_stream(
    capacity: usize,
    format: AudioFormat,
) -> (RingBufferWriter, RingBufferStream) {
    let (producer, consumer) = HeapRb::<u8>::new(capacity).split();
    let finished = Arc::new(AtomicBool::new(false));
    (
        RingBufferWriter {
            producer,
            finished: Arc::clone(&finished),
        },
        RingBufferStream {
            consumer,
            finished,
            closed: false,
            format,
        },
    )
}

/// Producer end: pushes encoded audio bytes from the capture side.
pub struct RingBufferWriter {
    producer: HeapProducer<u8>,
    finished: Arc<AtomicBool>,
}

impl RingBufferWriter {
    /// Write bytes to the buffer. Returns the number actually written, which
    /// may be less when the buffer is full.
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        self.producer.push_slice(bytes)
    }

    /// Number of free byte slots.
    pub fn free_len(&self) -> usize {
        self.producer.free_len()
    }

    /// Mark the end of the stream. The reader drains whatever is still
    /// buffered and then observes end of stream.
    pub fn finish(&self) {
        self.finished.store(true, Ordering::Release);
    }
}

impl Drop for RingBufferWriter {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Consumer end: an [`AudioInputStream`] over the ring buffer.
pub struct RingBufferStream {
    consumer: HeapConsumer<u8>,
    finished: Arc<AtomicBool>,
    closed: bool,
    format: AudioFormat,
}

impl AudioInputStream for RingBufferStream {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, SourceError> {
        if self.closed || buffer.is_empty() {
            return Ok(0);
        }
        loop {
            let n = self.consumer.pop_slice(buffer);
            if n > 0 {
                return Ok(n);
            }
            if self.finished.load(Ordering::Acquire) {
                // Drain once more: the writer may have pushed between the
                // empty pop and the flag read.
                return Ok(self.consumer.pop_slice(buffer));
            }
            std::thread::yield_now();
        }
    }

    fn skip(&mut self, bytes: u64) -> Result<u64, SourceError> {
        let mut scratch = [0u8; 1024];
        let mut skipped = 0u64;
        while skipped < bytes {
            let want = ((bytes - skipped) as usize).min(scratch.len());
            let n = self.read(&mut scratch[..want])?;
            if n == 0 {
                break;
            }
            skipped += n as u64;
        }
        Ok(skipped)
    }

    fn close(&mut self) -> Result<(), SourceError> {
        self.closed = true;
        Ok(())
    }

    fn format(&self) -> AudioFormat {
        self.format
    }
}
