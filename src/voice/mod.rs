//! Voice processing module
//!
//! Handles audio capture, speech endpointing, transcription and playback.

mod capture;
mod playback;
mod segmenter;
mod stt;
mod transcript;

pub use capture::{AudioCapture, CHUNK_SAMPLES, SAMPLE_RATE, samples_to_wav};
pub use playback::{AudioPlayback, PLAYBACK_SAMPLE_RATE, apply_gain};
pub use segmenter::{SegmenterState, SpeechSegmenter, rms};
pub use stt::{SpeechRecognizer, WhisperRecognizer};
pub use transcript::{MicrophoneSource, TranscriptSource, Utterance};
