//! Daemon - the assistant service
//!
//! Orchestrates three workers around two bounded queues:
//!
//! ```text
//! capture thread ──Command──▶ command worker ──text──▶ speech worker
//!       │                                                  ▲
//!       └───────────────── acknowledgment ─────────────────┘
//! ```
//!
//! The capture worker runs on its own OS thread because audio streams are
//! not `Send`; it owns the microphone and the activation gate. The command
//! worker owns confirmation and conversation state. Nothing else is shared.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::Local;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::assistant::{
    Action, Activation, ActivationGate, Command, CommandClassifier, ConfirmationState,
    ConversationState, ModelBackend, confirmation_prompt, query_model,
};
use crate::config::AssistantConfig;
use crate::speech::{SPEECH_QUEUE_SIZE, SpeechBackend, SpeechOutput, SpeechWorker};
use crate::voice::TranscriptSource;
use crate::{Config, Error, Result};

/// Spoken when the wake phrase is heard on its own
pub const ACKNOWLEDGMENT: &str = "Слушаю вас";

/// Spoken before a confirmed model query
pub const PROCESSING_NOTICE: &str = "Обрабатываю ваш запрос...";

/// Spoken when handling a command fails unexpectedly
pub const COMMAND_ERROR: &str = "Произошла ошибка при обработке команды";

/// Capacity of the command queue
const COMMAND_QUEUE_SIZE: usize = 8;

/// Pause after a capture or recognition error
const CAPTURE_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Whether the assistant keeps running after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Wait for the next command
    Continue,
    /// Shut down
    Stop,
}

/// Turns commands into actions and speech
///
/// Owns the confirmation and conversation state, so it must only be driven
/// from one task.
pub struct Dispatcher {
    classifier: CommandClassifier,
    confirmation: ConfirmationState,
    conversation: ConversationState,
    model: Arc<dyn ModelBackend>,
    speech: SpeechOutput,
}

impl Dispatcher {
    /// Create a dispatcher with empty state
    #[must_use]
    pub fn new(
        config: &AssistantConfig,
        model: Arc<dyn ModelBackend>,
        speech: SpeechOutput,
    ) -> Self {
        Self {
            classifier: CommandClassifier::default(),
            confirmation: ConfirmationState::default(),
            conversation: ConversationState::new(config.history_turns),
            model,
            speech,
        }
    }

    /// Handle one command
    ///
    /// # Errors
    ///
    /// Returns error if the speech queue has gone away
    pub async fn handle(&mut self, command: &Command) -> Result<Flow> {
        let action = self
            .classifier
            .classify(&command.text, &mut self.confirmation, Local::now());
        tracing::debug!(command = %command.text, ?action, "classified");

        match action {
            Action::Exit(farewell) => {
                self.speech.say(farewell).await?;
                return Ok(Flow::Stop);
            }
            Action::LocalAnswer(text) => self.speech.say(text).await?,
            Action::ClearHistory(ack) => {
                self.conversation.clear();
                tracing::info!("conversation history cleared");
                self.speech.say(ack).await?;
            }
            Action::AskConfirmation(text) => {
                self.speech.say(confirmation_prompt(&text)).await?;
            }
            Action::ConfirmedModelQuery(text) => {
                self.speech.say(PROCESSING_NOTICE).await?;
                let reply =
                    query_model(self.model.as_ref(), &text, &mut self.conversation, Local::now())
                        .await;
                self.speech.say(reply).await?;
            }
        }

        Ok(Flow::Continue)
    }

    /// Conversation history
    #[must_use]
    pub const fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    /// Outstanding confirmation, if any
    #[must_use]
    pub const fn confirmation(&self) -> &ConfirmationState {
        &self.confirmation
    }
}

/// The assistant daemon
pub struct Daemon {
    config: Config,
    model: Arc<dyn ModelBackend>,
    speech: Arc<dyn SpeechBackend>,
}

impl Daemon {
    /// Create a daemon with the given backends
    #[must_use]
    pub fn new(
        config: Config,
        model: Arc<dyn ModelBackend>,
        speech: Arc<dyn SpeechBackend>,
    ) -> Self {
        Self {
            config,
            model,
            speech,
        }
    }

    /// Get the wake phrase
    #[must_use]
    pub fn wake_phrase(&self) -> &str {
        &self.config.assistant.wake_phrase
    }

    /// Run until an exit command or `stop`
    ///
    /// `open_source` is called on the capture thread; whatever it returns
    /// never leaves that thread and is dropped there. `abort` cuts speech
    /// draining short.
    ///
    /// # Errors
    ///
    /// Returns error if the transcript source cannot be opened
    pub async fn run<S, F>(
        self,
        open_source: F,
        stop: CancellationToken,
        abort: CancellationToken,
    ) -> Result<()>
    where
        S: TranscriptSource + 'static,
        F: FnOnce() -> Result<S> + Send + 'static,
    {
        let shutdown = stop.child_token();

        let (speech, speech_rx) = SpeechOutput::channel(SPEECH_QUEUE_SIZE);
        let speech_worker = SpeechWorker::new(
            speech_rx,
            Arc::clone(&self.speech),
            self.config.voice.playback_timeout,
            self.config.voice.drain_timeout,
        );
        let speech_handle = tokio::spawn(speech_worker.run(shutdown.clone(), abort));

        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_SIZE);
        let gate = ActivationGate::new(
            &self.config.assistant.wake_phrase,
            self.config.assistant.arm_timeout,
        );

        let capture = spawn_capture(
            open_source,
            gate,
            command_tx,
            speech.clone(),
            shutdown.clone(),
        );
        let capture_handle = match capture.await {
            Ok(handle) => handle,
            Err(e) => {
                shutdown.cancel();
                let _ = speech_handle.await;
                return Err(e);
            }
        };

        let dispatcher = Dispatcher::new(&self.config.assistant, Arc::clone(&self.model), speech);
        let command_handle = tokio::spawn(run_commands(dispatcher, command_rx, shutdown.clone()));

        tracing::info!(
            wake_phrase = %self.config.assistant.wake_phrase,
            speech = self.speech.name(),
            "assistant ready"
        );

        shutdown.cancelled().await;
        tracing::info!("shutting down");

        if let Err(e) = speech_handle.await {
            tracing::error!(error = %e, "speech worker panicked");
        }

        match tokio::task::spawn_blocking(move || capture_handle.join()).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => tracing::error!("capture thread panicked"),
            Err(e) => tracing::error!(error = %e, "failed to join capture thread"),
        }

        if let Err(e) = command_handle.await {
            tracing::error!(error = %e, "command worker panicked");
        }

        tracing::info!("daemon stopped");
        Ok(())
    }
}

/// Start the capture thread and wait until its source is open
async fn spawn_capture<S, F>(
    open_source: F,
    gate: ActivationGate,
    commands: mpsc::Sender<Command>,
    speech: SpeechOutput,
    stop: CancellationToken,
) -> Result<JoinHandle<()>>
where
    S: TranscriptSource + 'static,
    F: FnOnce() -> Result<S> + Send + 'static,
{
    let (ready_tx, ready_rx) = oneshot::channel();

    let handle = std::thread::Builder::new()
        .name("capture".to_string())
        .spawn(move || {
            let source = match open_source() {
                Ok(source) => {
                    let _ = ready_tx.send(Ok(()));
                    source
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            run_capture(source, gate, &commands, &speech, &stop);
        })?;

    match ready_rx.await {
        Ok(Ok(())) => Ok(handle),
        Ok(Err(e)) => {
            drop(handle);
            Err(e)
        }
        Err(_) => Err(Error::Capture("capture thread exited during startup".to_string())),
    }
}

/// Capture loop; owns and finally drops the source
fn run_capture<S: TranscriptSource>(
    mut source: S,
    mut gate: ActivationGate,
    commands: &mpsc::Sender<Command>,
    speech: &SpeechOutput,
    stop: &CancellationToken,
) {
    tracing::debug!("capture worker started");

    while !stop.is_cancelled() {
        let utterance = match source.next_utterance() {
            Ok(Some(utterance)) => utterance,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(error = %e, "capture error");
                std::thread::sleep(CAPTURE_ERROR_BACKOFF);
                continue;
            }
        };

        tracing::debug!(text = %utterance.text, "heard");

        match gate.observe(&utterance) {
            Activation::Ignored => {}
            Activation::Armed => {
                speech.enqueue(ACKNOWLEDGMENT);
            }
            Activation::Command(command) => match commands.try_send(command) {
                Ok(()) => {}
                Err(TrySendError::Full(command)) => {
                    tracing::warn!(command = %command.text, "command queue full, dropping");
                }
                Err(TrySendError::Closed(_)) => break,
            },
        }
    }

    drop(source);
    tracing::debug!("capture worker stopped");
}

/// Command loop; one command in flight at a time
async fn run_commands(
    mut dispatcher: Dispatcher,
    mut commands: mpsc::Receiver<Command>,
    stop: CancellationToken,
) {
    tracing::debug!("command worker started");

    loop {
        let command = tokio::select! {
            biased;
            () = stop.cancelled() => break,
            command = commands.recv() => match command {
                Some(command) => command,
                None => break,
            },
        };

        match dispatcher.handle(&command).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Stop) => {
                tracing::info!("exit requested");
                stop.cancel();
                break;
            }
            Err(e) => {
                tracing::error!(error = %e, command = %command.text, "command failed");
                dispatcher.speech.enqueue(COMMAND_ERROR);
            }
        }
    }

    tracing::debug!("command worker stopped");
}
