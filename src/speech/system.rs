//! Operating-system speech engines driven as subprocesses

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use super::SpeechBackend;
use crate::config::VoiceConfig;
use crate::{Error, Result};

/// Supported command-line engines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEngine {
    /// `espeak` (Linux)
    Espeak,
    /// `say` (macOS)
    Say,
    /// `System.Speech` through `PowerShell` (Windows)
    PowerShell,
}

impl SystemEngine {
    /// Executable looked up on `PATH`
    #[must_use]
    pub const fn program(self) -> &'static str {
        match self {
            Self::Espeak => "espeak",
            Self::Say => "say",
            Self::PowerShell => "powershell",
        }
    }
}

/// Speaks by running a system TTS command per request
#[derive(Debug, Clone)]
pub struct SystemVoice {
    engine: SystemEngine,
    espeak_voice: String,
    espeak_speed: u32,
    say_voice: String,
}

impl SystemVoice {
    /// Create a voice for the given engine
    #[must_use]
    pub fn new(engine: SystemEngine, config: &VoiceConfig) -> Self {
        Self {
            engine,
            espeak_voice: config.espeak_voice.clone(),
            espeak_speed: config.espeak_speed,
            say_voice: config.say_voice.clone(),
        }
    }

    /// Command-line arguments for speaking `text`
    #[must_use]
    pub fn args(&self, text: &str) -> Vec<String> {
        match self.engine {
            SystemEngine::Espeak => vec![
                "-v".to_string(),
                self.espeak_voice.clone(),
                "-s".to_string(),
                self.espeak_speed.to_string(),
                text.to_string(),
            ],
            SystemEngine::Say => vec!["-v".to_string(), self.say_voice.clone(), text.to_string()],
            SystemEngine::PowerShell => vec![
                "-Command".to_string(),
                format!(
                    "Add-Type -AssemblyName System.Speech; \
                     $speak = New-Object System.Speech.Synthesis.SpeechSynthesizer; \
                     $speak.Speak(\"{}\")",
                    escape_powershell(text)
                ),
            ],
        }
    }
}

#[async_trait]
impl SpeechBackend for SystemVoice {
    fn name(&self) -> &'static str {
        self.engine.program()
    }

    async fn speak(&self, text: &str) -> Result<()> {
        // kill_on_drop: a timed-out speak future takes the child down with it
        let output = Command::new(self.engine.program())
            .args(self.args(text))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::Synthesis(format!("{} failed to start: {e}", self.name())))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Synthesis(format!(
                "{} exited with {}: {}",
                self.name(),
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}

/// Escape text for a double-quoted `PowerShell` string
fn escape_powershell(text: &str) -> String {
    text.replace('`', "``").replace('"', "`\"").replace('$', "`$")
}
