//! Neural voice over an OpenAI-compatible speech API

use async_trait::async_trait;

use super::{ExclusivePlayer, SpeechBackend};
use crate::config::NeuralVoiceConfig;
use crate::voice::AudioPlayback;
use crate::{Error, Result};

/// Synthesizes MP3 over HTTP and plays it through the default output device
pub struct NeuralVoice {
    client: reqwest::Client,
    player: ExclusivePlayer,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    voice: String,
    speed: f32,
    volume: f32,
}

impl NeuralVoice {
    /// Create a new neural voice
    ///
    /// # Errors
    ///
    /// Returns error if no endpoint or key is configured
    pub fn new(config: &NeuralVoiceConfig) -> Result<Self> {
        if !config.is_configured() {
            return Err(Error::Config(
                "neural voice needs JARVIS_TTS_URL or an API key".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            player: ExclusivePlayer::new(),
            endpoint: config.endpoint().to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            voice: config.voice.clone(),
            speed: config.speed,
            volume: config.volume,
        })
    }

    /// Synthesize text to MP3 bytes
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the API rejects it
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
            response_format: &'a str,
        }

        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            speed: self.speed,
            response_format: "mp3",
        };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Synthesis(format!("TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        Ok(audio.to_vec())
    }
}

#[async_trait]
impl SpeechBackend for NeuralVoice {
    fn name(&self) -> &'static str {
        "neural"
    }

    async fn speak(&self, text: &str) -> Result<()> {
        let audio = self.synthesize(text).await?;
        tracing::debug!(bytes = audio.len(), voice = %self.voice, "synthesized speech");

        let gain = self.volume;
        self.player
            .play(move |cancel| AudioPlayback::play_mp3(&audio, gain, cancel))
            .await
    }
}
