//! Processor contract driven by the dispatcher, plus small frame analyses

use crate::dispatch::frame::AudioFrame;

/// One stage in the dispatcher's processing pipeline.
///
/// Stages receive the shared frame in registration order; a stage may mutate
/// the samples in place, and the mutated frame is what the next stage sees.
pub trait AudioProcessor {
    /// Handle one frame. Returning `false` requests a stop: the remaining
    /// stages still see the current frame, after which the dispatcher stops
    /// and delivers the completion notification.
    fn process(&mut self, frame: &mut AudioFrame) -> bool;

    /// Called exactly once when no more frames will follow, whether the
    /// source was exhausted or the dispatcher was stopped.
    fn processing_finished(&mut self) {}
}

/// Reports the zero-crossing rate of every processed frame to a handler.
pub struct ZeroCrossingRate<H: FnMut(f32, &AudioFrame)> {
    handler: H,
}

impl<H: FnMut(f32, &AudioFrame)> ZeroCrossingRate<H> {
    pub fn new(handler: H) -> Self {
        Self { handler }
    }
}

impl<H: FnMut(f32, &AudioFrame)> AudioProcessor for ZeroCrossingRate<H> {
    fn process(&mut self, frame: &mut AudioFrame) -> bool {
        let samples = frame.samples();
        let mut crossings = 0usize;
        for i in 1..samples.len() {
            if samples[i] * samples[i - 1] < 0.0 {
                crossings += 1;
            }
        }
        let rate = if samples.len() > 1 {
            crossings as f32 / (samples.len() - 1) as f32
        } else {
            0.0
        };
        (self.handler)(rate, frame);
        true
    }
}

/// Default silence threshold in dB.
pub const DEFAULT_SILENCE_THRESHOLD: f64 = -70.0;

/// Tracks the sound pressure level of the processed frames and can stop the
/// dispatcher when the signal falls silent.
pub struct SilenceDetector {
    threshold: f64,
    stop_on_silence: bool,
    current_spl: f64,
}

impl SilenceDetector {
    pub fn new(threshold: f64, stop_on_silence: bool) -> Self {
        Self {
            threshold,
            stop_on_silence,
            current_spl: 0.0,
        }
    }

    /// Level of the most recently processed frame in dB.
    pub fn current_spl(&self) -> f64 {
        self.current_spl
    }
}

impl Default for SilenceDetector {
    fn default() -> Self {
        Self::new(DEFAULT_SILENCE_THRESHOLD, false)
    }
}

impl AudioProcessor for SilenceDetector {
    fn process(&mut self, frame: &mut AudioFrame) -> bool {
        self.current_spl = frame.sound_pressure_level();
        let silent = self.current_spl < self.threshold;
        !(self.stop_on_silence && silent)
    }
}
