//! Speech-to-text (STT) processing

use reqwest::blocking::multipart::{Form, Part};

use super::capture::{SAMPLE_RATE, samples_to_wav};
use super::segmenter::SpeechSegmenter;
use crate::config::SttConfig;
use crate::{Error, Result};

/// Turns a stream of PCM frames into finalized transcripts
///
/// Implementations are driven from the capture thread and may block.
pub trait SpeechRecognizer {
    /// Feed one frame of 16kHz mono PCM
    ///
    /// Returns `Some(text)` when the frame completed an utterance.
    ///
    /// # Errors
    ///
    /// Returns error if the engine fails or produces malformed output
    fn accept(&mut self, frame: &[i16]) -> Result<Option<String>>;
}

/// Response from an OpenAI-compatible transcription API
#[derive(serde::Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Segments speech locally and transcribes each segment over HTTP
///
/// Works with any server exposing `/v1/audio/transcriptions`
/// (faster-whisper-server, whisper.cpp server, `OpenAI`).
pub struct WhisperRecognizer {
    client: reqwest::blocking::Client,
    segmenter: SpeechSegmenter,
    endpoint: String,
    model: String,
    language: String,
    api_key: Option<String>,
}

impl WhisperRecognizer {
    /// Create a new recognizer
    ///
    /// Must be called outside an async context (the client is blocking).
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: &SttConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        tracing::debug!(url = %config.url, model = %config.model, "speech recognizer initialized");

        Ok(Self {
            client,
            segmenter: SpeechSegmenter::new(),
            endpoint: format!("{}/v1/audio/transcriptions", config.url),
            model: config.model.clone(),
            language: config.language.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn transcribe(&self, segment: &[i16]) -> Result<String> {
        let wav = samples_to_wav(segment, SAMPLE_RATE)?;
        tracing::debug!(audio_bytes = wav.len(), "starting transcription");

        let form = Form::new()
            .part(
                "file",
                Part::bytes(wav)
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Recognition(e.to_string()))?,
            )
            .text("model", self.model.clone())
            .text("language", self.language.clone());

        let mut request = self.client.post(&self.endpoint).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send()?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::Recognition(format!(
                "transcription API error {status}: {body}"
            )));
        }

        let result: TranscriptionResponse = response
            .json()
            .map_err(|e| Error::Recognition(format!("malformed transcription response: {e}")))?;

        Ok(result.text)
    }
}

impl SpeechRecognizer for WhisperRecognizer {
    fn accept(&mut self, frame: &[i16]) -> Result<Option<String>> {
        let Some(segment) = self.segmenter.process(frame) else {
            return Ok(None);
        };

        let text = self.transcribe(&segment)?;
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        Ok(Some(text.to_string()))
    }
}
