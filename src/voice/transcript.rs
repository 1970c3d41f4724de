//! Microphone + recognizer as a source of finalized utterances

use std::time::Duration;

use chrono::{DateTime, Local};

use super::capture::{AudioCapture, CHUNK_SAMPLES};
use super::stt::{SpeechRecognizer, WhisperRecognizer};
use crate::Result;
use crate::config::SttConfig;

/// How long one read waits for audio before yielding
const READ_WAIT: Duration = Duration::from_millis(250);

/// One finalized, lowercased piece of recognized speech
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    /// Recognized text, lowercase and trimmed
    pub text: String,
    /// When recognition finished
    pub timestamp: DateTime<Local>,
}

impl Utterance {
    /// Build an utterance stamped with the current time
    #[must_use]
    pub fn now(text: &str) -> Self {
        Self::at(text, Local::now())
    }

    /// Build an utterance with an explicit timestamp
    #[must_use]
    pub fn at(text: &str, timestamp: DateTime<Local>) -> Self {
        Self {
            text: text.trim().to_lowercase(),
            timestamp,
        }
    }
}

/// Produces utterances from some audio source
///
/// Driven by the capture worker on a dedicated thread; implementations may
/// block, but each call should return within a bounded time so the worker
/// can observe shutdown.
pub trait TranscriptSource {
    /// Pull the next chunk of audio and return an utterance if one completed
    ///
    /// # Errors
    ///
    /// `Error::Capture` for device failures, `Error::Recognition` for engine
    /// failures; both are recoverable.
    fn next_utterance(&mut self) -> Result<Option<Utterance>>;
}

/// Live microphone transcribed by a [`SpeechRecognizer`]
pub struct MicrophoneSource<R> {
    capture: AudioCapture,
    recognizer: R,
}

impl MicrophoneSource<WhisperRecognizer> {
    /// Open the default microphone with the HTTP recognizer
    ///
    /// # Errors
    ///
    /// Returns error if the microphone cannot be opened
    pub fn open(config: &SttConfig) -> Result<Self> {
        Self::with_recognizer(WhisperRecognizer::new(config)?)
    }
}

impl<R: SpeechRecognizer> MicrophoneSource<R> {
    /// Open the default microphone with a custom recognizer
    ///
    /// # Errors
    ///
    /// Returns error if the microphone cannot be opened
    pub fn with_recognizer(recognizer: R) -> Result<Self> {
        let mut capture = AudioCapture::new()?;
        capture.start()?;
        tracing::info!("microphone open");

        Ok(Self {
            capture,
            recognizer,
        })
    }
}

impl<R: SpeechRecognizer> TranscriptSource for MicrophoneSource<R> {
    fn next_utterance(&mut self) -> Result<Option<Utterance>> {
        let Some(chunk) = self.capture.read_chunk(CHUNK_SAMPLES, READ_WAIT)? else {
            return Ok(None);
        };

        Ok(self
            .recognizer
            .accept(&chunk)?
            .map(|text| Utterance::now(&text))
            .filter(|u| !u.text.is_empty()))
    }
}

impl<R> Drop for MicrophoneSource<R> {
    fn drop(&mut self) {
        self.capture.stop();
        tracing::info!("microphone released");
    }
}
