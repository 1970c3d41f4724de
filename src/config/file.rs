//! TOML configuration file loading
//!
//! Supports `~/.config/jarvis/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct JarvisConfigFile {
    /// Activation and conversation settings
    #[serde(default)]
    pub assistant: AssistantFileConfig,

    /// Speech output configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Language model configuration
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// Speech recognition configuration
    #[serde(default)]
    pub stt: SttFileConfig,
}

/// Activation and conversation settings
#[derive(Debug, Default, Deserialize)]
pub struct AssistantFileConfig {
    /// Wake phrase (e.g. "джарвис")
    pub wake_phrase: Option<String>,

    /// Seconds the gate stays armed without a command
    pub arm_timeout_secs: Option<u64>,

    /// Turns of history included in model prompts
    pub history_turns: Option<usize>,
}

/// Speech output configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Skip the neural voice even if it is configured
    pub disable_neural: Option<bool>,

    /// Neural voice name
    pub voice_name: Option<String>,

    /// Speech rate in percent notation (e.g. "-10%")
    pub rate: Option<String>,

    /// Speech volume in percent notation (e.g. "+0%")
    pub volume: Option<String>,

    /// OpenAI-compatible speech endpoint
    pub tts_url: Option<String>,

    /// Speech model identifier
    pub tts_model: Option<String>,

    /// espeak voice (language code)
    pub espeak_voice: Option<String>,

    /// espeak words per minute
    pub espeak_speed: Option<u32>,

    /// macOS `say` voice
    pub say_voice: Option<String>,

    /// Hard limit for one playback, in seconds
    pub playback_timeout_secs: Option<u64>,

    /// Time allowed for draining the speech queue on shutdown
    pub drain_timeout_secs: Option<u64>,
}

/// Language model configuration
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    /// Ollama base URL
    pub url: Option<String>,

    /// Model identifier (e.g. "gemma3:1b")
    pub model: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Speech recognition configuration
#[derive(Debug, Default, Deserialize)]
pub struct SttFileConfig {
    /// Base URL of an OpenAI-compatible transcription server
    pub url: Option<String>,

    /// Transcription model
    pub model: Option<String>,

    /// Spoken language hint (ISO 639-1)
    pub language: Option<String>,
}

/// Parse a config file body
///
/// # Errors
///
/// Returns error if the TOML is malformed or has wrongly typed fields
pub fn parse_config_file(content: &str) -> Result<JarvisConfigFile> {
    Ok(toml::from_str(content)?)
}

/// Load the TOML config file from the standard path
///
/// Returns `JarvisConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> JarvisConfigFile {
    let Some(path) = config_file_path() else {
        return JarvisConfigFile::default();
    };

    if !path.exists() {
        return JarvisConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match parse_config_file(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                JarvisConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            JarvisConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/jarvis/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("jarvis").join("config.toml"))
}
