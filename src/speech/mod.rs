//! Speech output
//!
//! A [`SpeechBackend`] turns text into sound. One backend is chosen at
//! startup by [`select_backend`] and driven by a single [`SpeechWorker`],
//! which plays queued requests strictly in order.

mod exclusive;
mod neural;
mod output;
mod probe;
mod system;

use async_trait::async_trait;

pub use exclusive::ExclusivePlayer;
pub use neural::NeuralVoice;
pub use output::{SPEECH_QUEUE_SIZE, SpeechOutput, SpeechRequest, SpeechWorker};
pub use probe::{BackendKind, probe_backends, select_backend};
pub use system::{SystemEngine, SystemVoice};

use crate::Result;

/// A way of making text audible
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Short identifier for logs
    fn name(&self) -> &'static str;

    /// Synthesize and play `text`, returning when playback has finished
    ///
    /// # Errors
    ///
    /// Returns `Error::Synthesis` if the engine fails
    async fn speak(&self, text: &str) -> Result<()>;
}

/// Prints text instead of speaking it
#[derive(Debug, Default)]
pub struct TextOnly;

#[async_trait]
impl SpeechBackend for TextOnly {
    fn name(&self) -> &'static str {
        "text"
    }

    async fn speak(&self, text: &str) -> Result<()> {
        println!("🤖 Джарвис: {text}");
        Ok(())
    }
}
