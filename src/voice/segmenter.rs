//! Energy-based speech endpointing
//!
//! Splits a continuous PCM stream into speech segments: a segment starts
//! when energy crosses a threshold and ends after a stretch of silence.

/// Minimum audio energy threshold to consider speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum duration of speech to emit (in samples at 16kHz)
const MIN_SPEECH_SAMPLES: usize = 4800; // 0.3 seconds

/// Silence duration to consider end of utterance (in samples)
const SILENCE_SAMPLES: usize = 8000; // 0.5 seconds

/// Segments longer than this are cut and emitted as-is
const MAX_SEGMENT_SAMPLES: usize = 16000 * 15;

/// State of the segmenter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmenterState {
    /// Waiting for speech
    Idle,
    /// Speech detected, accumulating until silence
    Listening,
}

/// Accumulates speech and emits complete segments
#[derive(Debug)]
pub struct SpeechSegmenter {
    state: SegmenterState,
    speech_buffer: Vec<i16>,
    silence_counter: usize,
    threshold: f32,
}

impl Default for SpeechSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechSegmenter {
    /// Create a segmenter with the default energy threshold
    #[must_use]
    pub const fn new() -> Self {
        Self::with_threshold(ENERGY_THRESHOLD)
    }

    /// Create a segmenter with a custom RMS threshold (0.0 to 1.0)
    #[must_use]
    pub const fn with_threshold(threshold: f32) -> Self {
        Self {
            state: SegmenterState::Idle,
            speech_buffer: Vec::new(),
            silence_counter: 0,
            threshold,
        }
    }

    /// Process audio samples
    ///
    /// Returns a finished speech segment once enough speech has been
    /// followed by enough silence.
    pub fn process(&mut self, samples: &[i16]) -> Option<Vec<i16>> {
        let energy = rms(samples);
        let is_speech = energy > self.threshold;

        match self.state {
            SegmenterState::Idle => {
                if is_speech {
                    self.state = SegmenterState::Listening;
                    self.speech_buffer.clear();
                    self.speech_buffer.extend_from_slice(samples);
                    self.silence_counter = 0;
                    tracing::trace!(energy, "speech detected, listening");
                }
                None
            }
            SegmenterState::Listening => {
                self.speech_buffer.extend_from_slice(samples);

                if is_speech {
                    self.silence_counter = 0;
                } else {
                    self.silence_counter += samples.len();
                }

                if self.speech_buffer.len() >= MAX_SEGMENT_SAMPLES {
                    tracing::debug!(samples = self.speech_buffer.len(), "segment cut at max length");
                    return Some(self.finish());
                }

                if self.silence_counter > SILENCE_SAMPLES {
                    let voiced = self.speech_buffer.len().saturating_sub(self.silence_counter);
                    if voiced > MIN_SPEECH_SAMPLES {
                        tracing::debug!(samples = self.speech_buffer.len(), "speech segment complete");
                        return Some(self.finish());
                    }

                    tracing::trace!("too short - resetting");
                    self.reset();
                }

                None
            }
        }
    }

    fn finish(&mut self) -> Vec<i16> {
        let segment = std::mem::take(&mut self.speech_buffer);
        self.reset();
        segment
    }

    /// Reset to idle, discarding buffered audio
    pub fn reset(&mut self) {
        self.state = SegmenterState::Idle;
        self.speech_buffer.clear();
        self.silence_counter = 0;
    }

    /// Get current state
    #[must_use]
    pub const fn state(&self) -> SegmenterState {
        self.state
    }
}

/// RMS energy of 16-bit samples, normalized to 0.0..=1.0
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples
        .iter()
        .map(|&s| {
            let v = f32::from(s) / 32768.0;
            v * v
        })
        .sum();
    (sum_squares / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_energy_calculation() {
        let silence = vec![0i16; 100];
        assert!(rms(&silence) < 0.001);

        let loud = vec![16384i16; 100];
        assert!(rms(&loud) > 0.4);
    }

    #[test]
    fn test_short_blip_is_discarded() {
        let mut seg = SpeechSegmenter::new();

        assert!(seg.process(&vec![16384i16; 800]).is_none());
        assert_eq!(seg.state(), SegmenterState::Listening);

        assert!(seg.process(&vec![0i16; 9000]).is_none());
        assert_eq!(seg.state(), SegmenterState::Idle);
    }
}
