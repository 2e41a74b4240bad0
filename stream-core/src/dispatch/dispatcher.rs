//! Streaming buffer engine
//!
//! Slides a float frame over a byte source and drives the registered
//! processor chain with exact timing metadata. Conversion from bytes to
//! normalized floats happens here, at the last moment.

use log::{debug, error};

use crate::dispatch::frame::{AudioFrame, FrameExtent};
use crate::dispatch::processor::AudioProcessor;
use crate::error::{ConfigurationError, SourceError};
use crate::io::format::{AudioFormat, FloatConverter};
use crate::io::stream::AudioInputStream;

/// Pulls bytes from a source, converts them into a sliding window of float
/// frames and sends every frame through the processor chain.
///
/// The dispatcher is strictly single-threaded: [`run`](Self::run) executes on
/// the calling thread and every processor call returns before the next frame
/// is read. Processors request a stop by returning `false` from `process`.
pub struct AudioDispatcher<S: AudioInputStream> {
    stream: S,
    format: AudioFormat,
    converter: FloatConverter,

    /// Reused frame holding the decoded float samples.
    frame: AudioFrame,

    /// Reused buffer for the raw bytes backing one frame.
    byte_buffer: Vec<u8>,

    processors: Vec<Box<dyn AudioProcessor>>,

    /// Overlap and step size in samples.
    float_overlap: usize,
    float_step_size: usize,

    /// The same two quantities in bytes; they depend on the format's bytes
    /// per frame and are re-derived whenever the sizes change.
    byte_overlap: usize,
    byte_step_size: usize,

    /// Bytes to consume from the source before the first read.
    bytes_to_skip: u64,

    /// Position in the stream in bytes.
    bytes_processed: u64,

    stopped: bool,

    /// If true the first frame holds only `step_size` fresh samples in its
    /// tail while the head stays zero.
    zero_pad_first_buffer: bool,

    /// If true the last frame is padded with zeros up to the full frame
    /// size; otherwise it is delivered truncated to the remaining samples.
    zero_pad_last_buffer: bool,
}

impl<S: AudioInputStream> AudioDispatcher<S> {
    /// Create a dispatcher reading `frame_size` sample frames with the given
    /// overlap from the stream.
    ///
    /// Fails with a [`ConfigurationError`] unless `overlap < frame_size`.
    pub fn new(stream: S, frame_size: usize, overlap: usize) -> Result<Self, ConfigurationError> {
        if overlap >= frame_size {
            return Err(ConfigurationError::OverlapTooLarge {
                overlap,
                frame_size,
            });
        }
        let format = stream.format();
        let bytes_per_frame = format.bytes_per_frame();
        let mut dispatcher = Self {
            stream,
            format,
            converter: format.converter(),
            frame: AudioFrame::new(format.sample_rate, frame_size, overlap),
            byte_buffer: vec![0; frame_size * bytes_per_frame],
            processors: Vec::new(),
            float_overlap: overlap,
            float_step_size: frame_size - overlap,
            byte_overlap: 0,
            byte_step_size: 0,
            bytes_to_skip: 0,
            bytes_processed: 0,
            stopped: false,
            zero_pad_first_buffer: false,
            zero_pad_last_buffer: true,
        };
        dispatcher.derive_byte_sizes();
        Ok(dispatcher)
    }

    fn derive_byte_sizes(&mut self) {
        let bytes_per_frame = self.format.bytes_per_frame();
        self.byte_overlap = self.float_overlap * bytes_per_frame;
        self.byte_step_size = self.float_step_size * bytes_per_frame;
    }

    /// Set a new frame size and overlap, both in samples.
    ///
    /// Must be called between processed frames, never during one; exclusive
    /// access to the dispatcher enforces this.
    pub fn set_step_size_and_overlap(
        &mut self,
        frame_size: usize,
        overlap: usize,
    ) -> Result<(), ConfigurationError> {
        if overlap >= frame_size {
            return Err(ConfigurationError::OverlapTooLarge {
                overlap,
                frame_size,
            });
        }
        self.frame = AudioFrame::new(self.format.sample_rate, frame_size, overlap);
        self.frame.set_samples_processed(self.samples_processed());
        self.byte_buffer = vec![0; frame_size * self.format.bytes_per_frame()];
        self.float_overlap = overlap;
        self.float_step_size = frame_size - overlap;
        self.derive_byte_sizes();
        Ok(())
    }

    /// Skip a number of seconds of audio before processing starts.
    pub fn skip(&mut self, seconds: f64) {
        self.bytes_to_skip = (seconds * self.format.sample_rate as f64).round() as u64
            * self.format.bytes_per_frame() as u64;
    }

    /// Controls zero-padding of the first frame. E.g. with a frame size of
    /// 2048 and a step of 48 the first frame then holds 2000 zeros followed
    /// by 48 fresh samples.
    pub fn set_zero_pad_first_buffer(&mut self, zero_pad: bool) {
        self.zero_pad_first_buffer = zero_pad;
    }

    /// Controls zero-padding of the last frame (enabled by default). When
    /// disabled, the last frame is delivered truncated and processors must be
    /// prepared to handle a shorter buffer.
    pub fn set_zero_pad_last_buffer(&mut self, zero_pad: bool) {
        self.zero_pad_last_buffer = zero_pad;
    }

    /// Append a processor to the chain. Order is significant: each stage sees
    /// the frame as mutated by the stages before it.
    pub fn add_audio_processor(&mut self, processor: Box<dyn AudioProcessor>) {
        self.processors.push(processor);
        debug!(
            "added an audio processor to the chain, {} stage(s) registered",
            self.processors.len()
        );
    }

    /// Run the dispatch loop until the source is exhausted, a processor
    /// requests a stop, or a source error occurs.
    ///
    /// A source error aborts the loop immediately and is returned to the
    /// caller; completion notifications are not delivered on that path.
    pub fn run(&mut self) -> Result<(), SourceError> {
        if self.bytes_to_skip != 0 {
            self.skip_to_start()?;
        }

        // Needed for correct time info when the first seconds are skipped.
        self.frame.set_samples_processed(self.samples_processed());

        // Read the first (and possibly also last) audio block.
        let mut bytes_read = self.read_next_audio_block()?;

        while bytes_read != 0 && !self.stopped {
            let mut keep_running = true;
            for processor in self.processors.iter_mut() {
                if !processor.process(&mut self.frame) {
                    // The stop request takes effect only after the whole
                    // chain has seen the current frame.
                    keep_running = false;
                }
            }
            if !keep_running {
                self.stop();
            }

            if !self.stopped {
                self.bytes_processed += bytes_read as u64;
                self.frame.set_samples_processed(self.samples_processed());
                bytes_read = self.read_next_audio_block()?;
            }
        }

        // Notify the processors that no more data is available. An explicit
        // stop already did so.
        if !self.stopped {
            self.stop();
        }
        Ok(())
    }

    fn skip_to_start(&mut self) -> Result<(), SourceError> {
        let skipped = self.stream.skip(self.bytes_to_skip)?;
        if skipped != self.bytes_to_skip {
            return Err(SourceError::SkipFailed {
                skipped,
                expected: self.bytes_to_skip,
            });
        }
        self.bytes_processed += self.bytes_to_skip;
        Ok(())
    }

    /// Stop dispatching and notify every processor that processing finished.
    /// Calling stop more than once delivers the notification only once.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        for processor in self.processors.iter_mut() {
            processor.processing_finished();
        }
        if let Err(e) = self.stream.close() {
            error!("error while closing the audio stream: {e}");
        }
    }

    /// True once the dispatcher stopped or the end of the stream was reached.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Fresh samples consumed from the source so far.
    pub fn samples_processed(&self) -> u64 {
        self.bytes_processed / self.format.bytes_per_frame() as u64
    }

    /// The currently processed position in seconds.
    pub fn seconds_processed(&self) -> f64 {
        self.samples_processed() as f64 / self.format.sample_rate as f64
    }

    /// Read the next audio block: slide the frame, fill the freed tail from
    /// the stream and decode it.
    ///
    /// Tries to read `step_size` worth of bytes (a full frame for an unpadded
    /// first buffer). The behavior at the stream edges follows the zero-pad
    /// settings; the first buffer may simultaneously be the last.
    ///
    /// Returns the number of bytes read; 0 means nothing is left to process.
    fn read_next_audio_block(&mut self) -> Result<usize, SourceError> {
        debug_assert!(self.float_overlap < self.frame.frame_size());

        let is_first_buffer =
            self.bytes_processed == 0 || self.bytes_processed == self.bytes_to_skip;

        let (bytes_to_read, offset_in_bytes, offset_in_samples) =
            if is_first_buffer && !self.zero_pad_first_buffer {
                // Fill the whole frame, there is no previous overlap to keep.
                (self.byte_buffer.len(), 0, 0)
            } else {
                (self.byte_step_size, self.byte_overlap, self.float_overlap)
            };

        // Slide: the last overlap samples become the head of the new frame.
        // Nothing to slide for the first buffer, or once the frame has been
        // truncated.
        if !is_first_buffer && self.frame.extent() == FrameExtent::Full {
            self.frame.slide(self.float_step_size, self.float_overlap);
        }

        let mut total_bytes_read = 0usize;
        let mut end_of_stream = false;

        // Always try to read the full requested amount; sources may deliver
        // fewer bytes per call.
        while !self.stopped && !end_of_stream && total_bytes_read < bytes_to_read {
            let dest =
                &mut self.byte_buffer[offset_in_bytes + total_bytes_read..offset_in_bytes + bytes_to_read];
            let n = self.stream.read(dest)?;
            if n == 0 {
                end_of_stream = true;
            } else {
                total_bytes_read += n;
            }
        }

        let bytes_per_frame = self.format.bytes_per_frame();

        if end_of_stream {
            if self.zero_pad_last_buffer {
                // Deliver one final full-size frame, padded with zeros.
                for byte in self.byte_buffer[offset_in_bytes + total_bytes_read..].iter_mut() {
                    *byte = 0;
                }
                let src = &self.byte_buffer[offset_in_bytes..offset_in_bytes + self.byte_step_size];
                let dst = &mut self.frame.buffer_mut()
                    [offset_in_samples..offset_in_samples + self.float_step_size];
                self.converter.to_float_array(src, dst);
            } else {
                // Deliver a shorter frame holding only the valid samples.
                let samples_read = total_bytes_read / bytes_per_frame;
                let src = &self.byte_buffer
                    [offset_in_bytes..offset_in_bytes + samples_read * bytes_per_frame];
                let dst =
                    &mut self.frame.buffer_mut()[offset_in_samples..offset_in_samples + samples_read];
                self.converter.to_float_array(src, dst);
                self.frame.truncate(offset_in_samples + samples_read);
            }
        } else if total_bytes_read == bytes_to_read {
            // The expected amount of bytes was read from the stream.
            if is_first_buffer && !self.zero_pad_first_buffer {
                let frame_size = self.frame.frame_size();
                let src = &self.byte_buffer[..frame_size * bytes_per_frame];
                self.converter
                    .to_float_array(src, &mut self.frame.buffer_mut()[..frame_size]);
            } else {
                let src = &self.byte_buffer[offset_in_bytes..offset_in_bytes + self.byte_step_size];
                let dst = &mut self.frame.buffer_mut()
                    [offset_in_samples..offset_in_samples + self.float_step_size];
                self.converter.to_float_array(src, dst);
            }
        } else if !self.stopped {
            // Neither the end of the stream nor the expected amount of bytes:
            // the source is in an invalid state.
            return Err(SourceError::ShortRead {
                read: total_bytes_read,
                expected: bytes_to_read,
            });
        }

        self.frame.set_overlap(offset_in_samples);

        Ok(total_bytes_read)
    }
}
