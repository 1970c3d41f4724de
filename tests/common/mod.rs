//! Shared test utilities

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use jarvis::assistant::ModelBackend;
use jarvis::speech::SpeechBackend;
use jarvis::voice::{TranscriptSource, Utterance};
use jarvis::{Config, Error, Result};

/// One scripted recognition result
pub enum Step {
    /// Recognized text
    Heard(&'static str),
    /// A recoverable recognition failure
    Glitch,
}

/// Transcript source that replays a script, then stays silent
pub struct ScriptedSource {
    steps: VecDeque<Step>,
    released: Arc<AtomicUsize>,
}

impl ScriptedSource {
    /// Create a source from a script; `released` counts drops
    pub fn new(steps: Vec<Step>, released: Arc<AtomicUsize>) -> Self {
        Self {
            steps: steps.into(),
            released,
        }
    }

    /// Create a source that only hears the given phrases
    pub fn heard(phrases: &[&'static str], released: Arc<AtomicUsize>) -> Self {
        Self::new(phrases.iter().copied().map(Step::Heard).collect(), released)
    }
}

impl TranscriptSource for ScriptedSource {
    fn next_utterance(&mut self) -> Result<Option<Utterance>> {
        match self.steps.pop_front() {
            Some(Step::Heard(text)) => Ok(Some(Utterance::now(text))),
            Some(Step::Glitch) => Err(Error::Recognition("garbled".to_string())),
            None => {
                std::thread::sleep(Duration::from_millis(5));
                Ok(None)
            }
        }
    }
}

impl Drop for ScriptedSource {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Model that always answers the same and records prompts
pub struct FakeModel {
    reply: String,
    prompts: Mutex<Vec<String>>,
}

impl FakeModel {
    pub fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelBackend for FakeModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

/// Model that always fails
pub struct FailingModel {
    status: Option<u16>,
}

impl FailingModel {
    /// Fails with a non-success HTTP status
    pub fn status(status: u16) -> Arc<Self> {
        Arc::new(Self {
            status: Some(status),
        })
    }

    /// Fails as if the server were unreachable
    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self { status: None })
    }
}

#[async_trait]
impl ModelBackend for FailingModel {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        match self.status {
            Some(status) => Err(Error::ModelStatus {
                status,
                body: "internal error".to_string(),
            }),
            None => Err(Error::Model("connection refused".to_string())),
        }
    }
}

/// Speech backend that records what finished playing
///
/// Text equal to `stall_on` never finishes.
#[derive(Default)]
pub struct RecordingSpeech {
    spoken: Mutex<Vec<String>>,
    stall_on: Option<String>,
}

impl RecordingSpeech {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn stalling_on(text: &str) -> Arc<Self> {
        Arc::new(Self {
            spoken: Mutex::new(Vec::new()),
            stall_on: Some(text.to_string()),
        })
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechBackend for RecordingSpeech {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn speak(&self, text: &str) -> Result<()> {
        if self.stall_on.as_deref() == Some(text) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Default configuration with short speech timeouts
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.voice.playback_timeout = Duration::from_millis(200);
    config.voice.drain_timeout = Duration::from_secs(2);
    config
}
