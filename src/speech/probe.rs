//! Startup detection of available speech backends

use std::sync::Arc;

use super::{NeuralVoice, SpeechBackend, SystemEngine, SystemVoice, TextOnly};
use crate::config::VoiceConfig;

/// Backends in preference order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// HTTP neural voice
    Neural,
    /// A system command engine
    System(SystemEngine),
    /// Printed text
    Text,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Neural => f.write_str("neural"),
            Self::System(engine) => f.write_str(engine.program()),
            Self::Text => f.write_str("text"),
        }
    }
}

/// List usable backends, most preferred first
///
/// `has_program` answers whether an executable is on `PATH`; the text
/// fallback is always last.
pub fn probe_backends<F>(config: &VoiceConfig, has_program: F) -> Vec<BackendKind>
where
    F: Fn(&str) -> bool,
{
    let mut found = Vec::new();

    if config.disable_neural {
        tracing::debug!("neural voice disabled by configuration");
    } else if config.neural.is_configured() {
        found.push(BackendKind::Neural);
    }

    for engine in [SystemEngine::Espeak, SystemEngine::Say, SystemEngine::PowerShell] {
        if has_program(engine.program()) {
            found.push(BackendKind::System(engine));
        }
    }

    found.push(BackendKind::Text);
    found
}

/// Pick the first backend that can be instantiated
///
/// `text_only` skips probing and prints everything.
#[must_use]
pub fn select_backend(config: &VoiceConfig, text_only: bool) -> Arc<dyn SpeechBackend> {
    if text_only {
        return Arc::new(TextOnly);
    }

    for kind in probe_backends(config, |program| which::which(program).is_ok()) {
        match kind {
            BackendKind::Neural => match NeuralVoice::new(&config.neural) {
                Ok(voice) => return Arc::new(voice),
                Err(e) => tracing::warn!(error = %e, "neural voice unavailable"),
            },
            BackendKind::System(engine) => return Arc::new(SystemVoice::new(engine, config)),
            BackendKind::Text => {
                tracing::warn!("no speech engine found, replies will be printed");
                return Arc::new(TextOnly);
            }
        }
    }

    Arc::new(TextOnly)
}
