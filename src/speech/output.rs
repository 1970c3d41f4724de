//! Ordered speech queue and its worker

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

use super::SpeechBackend;
use crate::{Error, Result};

/// Capacity of the speech queue
pub const SPEECH_QUEUE_SIZE: usize = 32;

/// One unit of work for the speech worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    /// Text to speak
    pub text: String,
}

/// Cloneable handle for queueing speech
#[derive(Debug, Clone)]
pub struct SpeechOutput {
    tx: mpsc::Sender<SpeechRequest>,
}

impl SpeechOutput {
    /// Create a handle and the receiving end for a [`SpeechWorker`]
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<SpeechRequest>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Queue text without waiting
    ///
    /// Safe to call from non-async threads. Returns `false` if the queue is
    /// full or closed; the text is dropped.
    pub fn enqueue(&self, text: impl Into<String>) -> bool {
        let request = SpeechRequest { text: text.into() };
        match self.tx.try_send(request) {
            Ok(()) => true,
            Err(TrySendError::Full(req)) => {
                tracing::warn!(text = %req.text, "speech queue full, dropping");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Queue text, waiting for room if the queue is full
    ///
    /// # Errors
    ///
    /// Returns error if the speech worker has gone away
    pub async fn say(&self, text: impl Into<String>) -> Result<()> {
        self.tx
            .send(SpeechRequest { text: text.into() })
            .await
            .map_err(|_| Error::QueueClosed("speech"))
    }
}

/// Drains the speech queue through one backend, one request at a time
pub struct SpeechWorker {
    rx: mpsc::Receiver<SpeechRequest>,
    backend: Arc<dyn SpeechBackend>,
    playback_timeout: Duration,
    drain_timeout: Duration,
}

impl SpeechWorker {
    /// Create a worker
    #[must_use]
    pub fn new(
        rx: mpsc::Receiver<SpeechRequest>,
        backend: Arc<dyn SpeechBackend>,
        playback_timeout: Duration,
        drain_timeout: Duration,
    ) -> Self {
        Self {
            rx,
            backend,
            playback_timeout,
            drain_timeout,
        }
    }

    /// Run until `stop`, then drain what is already queued
    ///
    /// Draining is bounded by the drain timeout and cut short by `abort`.
    pub async fn run(mut self, stop: CancellationToken, abort: CancellationToken) {
        tracing::debug!(backend = self.backend.name(), "speech worker started");

        loop {
            tokio::select! {
                biased;
                () = stop.cancelled() => break,
                request = self.rx.recv() => match request {
                    Some(request) => self.play(&request).await,
                    None => {
                        tracing::debug!("speech queue closed");
                        return;
                    }
                },
            }
        }

        self.rx.close();
        let drain_timeout = self.drain_timeout;
        let drained = tokio::select! {
            () = abort.cancelled() => false,
            result = tokio::time::timeout(drain_timeout, self.drain()) => result.is_ok(),
        };

        if !drained {
            tracing::warn!("speech queue not fully drained before shutdown");
        }
        tracing::debug!("speech worker stopped");
    }

    async fn drain(&mut self) {
        while let Some(request) = self.rx.recv().await {
            self.play(&request).await;
        }
    }

    async fn play(&self, request: &SpeechRequest) {
        if request.text.trim().is_empty() {
            return;
        }

        tracing::info!(text = %request.text, backend = self.backend.name(), "speaking");

        let speak = self.backend.speak(&request.text);
        let result = match tokio::time::timeout(self.playback_timeout, speak).await {
            Ok(result) => result,
            Err(_) => Err(Error::SynthesisTimeout(self.playback_timeout)),
        };

        if let Err(e) = result {
            tracing::warn!(error = %e, "speech dropped");
        }
    }
}
