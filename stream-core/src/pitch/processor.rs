//! Bridges pitch detectors into the dispatcher's processor chain

use log::debug;

use crate::dispatch::frame::AudioFrame;
use crate::dispatch::processor::AudioProcessor;
use crate::pitch::{PitchDetector, PitchEstimate};

/// Runs a pitch detector on every frame and hands each estimate, together
/// with the frame it belongs to, to a handler.
pub struct PitchProcessor<D, H>
where
    D: PitchDetector,
    H: FnMut(PitchEstimate, &AudioFrame),
{
    detector: D,
    handler: H,
}

impl<D, H> PitchProcessor<D, H>
where
    D: PitchDetector,
    H: FnMut(PitchEstimate, &AudioFrame),
{
    pub fn new(detector: D, handler: H) -> Self {
        Self { detector, handler }
    }
}

impl<D, H> AudioProcessor for PitchProcessor<D, H>
where
    D: PitchDetector,
    H: FnMut(PitchEstimate, &AudioFrame),
{
    fn process(&mut self, frame: &mut AudioFrame) -> bool {
        match self.detector.get_pitch(frame.samples()) {
            Ok(estimate) => (self.handler)(estimate, frame),
            // A truncated final frame no longer matches the detector's block
            // size; there is nothing meaningful to estimate for it.
            Err(e) => debug!("skipping pitch estimation: {e}"),
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::dispatch::AudioDispatcher;
    use crate::io::format::AudioFormat;
    use crate::io::stream::MemoryAudioStream;
    use crate::pitch::FastYin;

    #[test]
    fn estimates_pitch_for_every_frame_of_a_tone() {
        let sample_rate = 44100.0;
        let samples: Vec<f32> = (0..8192)
            .map(|i| (std::f32::consts::TAU * 440.0 * i as f32 / sample_rate).sin() * 0.8)
            .collect();

        let stream = MemoryAudioStream::from_samples(&samples, AudioFormat::pcm16(sample_rate));
        let mut dispatcher = AudioDispatcher::new(stream, 1024, 512).unwrap();

        let estimates: Rc<RefCell<Vec<PitchEstimate>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&estimates);
        let detector = FastYin::new(sample_rate, 1024).unwrap();
        dispatcher.add_audio_processor(Box::new(PitchProcessor::new(
            detector,
            move |estimate, _frame| sink.borrow_mut().push(estimate),
        )));
        dispatcher.run().unwrap();

        let estimates = estimates.borrow();
        // 1024 samples first, then 512 fresh per frame.
        assert!(estimates.len() >= 14);
        let near_target = estimates
            .iter()
            .filter(|e| e.pitched && (e.frequency - 440.0).abs() < 1.0)
            .count();
        // Every full frame of the tone resolves to the target; only the
        // zero-padded tail frame may disagree.
        assert!(near_target >= estimates.len() - 1);
    }

    #[test]
    fn truncated_tail_frames_are_skipped() {
        let sample_rate = 44100.0;
        let samples: Vec<f32> = (0..1536)
            .map(|i| (std::f32::consts::TAU * 220.0 * i as f32 / sample_rate).sin() * 0.8)
            .collect();

        let stream = MemoryAudioStream::from_samples(&samples, AudioFormat::pcm16(sample_rate));
        let mut dispatcher = AudioDispatcher::new(stream, 1024, 0).unwrap();
        dispatcher.set_zero_pad_last_buffer(false);

        let estimates: Rc<RefCell<Vec<PitchEstimate>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&estimates);
        let detector = FastYin::new(sample_rate, 1024).unwrap();
        dispatcher.add_audio_processor(Box::new(PitchProcessor::new(
            detector,
            move |estimate, _frame| sink.borrow_mut().push(estimate),
        )));
        dispatcher.run().unwrap();

        // Two frames went through the chain, but the 512-sample tail was
        // skipped by the pitch stage.
        let estimates = estimates.borrow();
        assert_eq!(estimates.len(), 1);
        assert!(estimates[0].pitched);
        assert_abs_diff_eq!(estimates[0].frequency, 220.0, epsilon = 1.0);
    }
}
