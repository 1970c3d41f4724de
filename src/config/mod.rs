//! Configuration management for Jarvis
//!
//! Every option is read once at startup with the priority env > toml > default.

pub mod file;

use std::time::Duration;

use crate::{Error, Result};
use file::JarvisConfigFile;

/// Default wake phrase
pub const DEFAULT_WAKE_PHRASE: &str = "джарвис";

/// Default Ollama endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Default Ollama model
pub const DEFAULT_LLM_MODEL: &str = "gemma3:1b";

/// Default OpenAI-compatible speech endpoint
pub const DEFAULT_TTS_URL: &str = "https://api.openai.com/v1/audio/speech";

/// Jarvis configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Activation and conversation settings
    pub assistant: AssistantConfig,

    /// Speech output configuration
    pub voice: VoiceConfig,

    /// Language model configuration
    pub llm: LlmConfig,

    /// Speech recognition configuration
    pub stt: SttConfig,
}

/// Activation and conversation settings
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Phrase that arms command capture (lowercase)
    pub wake_phrase: String,

    /// How long the gate stays armed without a command
    pub arm_timeout: Duration,

    /// Turns of history included in model prompts
    pub history_turns: usize,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            wake_phrase: DEFAULT_WAKE_PHRASE.to_string(),
            arm_timeout: Duration::from_secs(30),
            history_turns: 2,
        }
    }
}

/// Speech output configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Skip the neural voice even if it is configured
    pub disable_neural: bool,

    /// Neural (HTTP) voice settings
    pub neural: NeuralVoiceConfig,

    /// espeak voice (language code)
    pub espeak_voice: String,

    /// espeak words per minute
    pub espeak_speed: u32,

    /// macOS `say` voice
    pub say_voice: String,

    /// Hard limit for one playback
    pub playback_timeout: Duration,

    /// Time allowed for draining the speech queue on shutdown
    pub drain_timeout: Duration,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            disable_neural: false,
            neural: NeuralVoiceConfig::default(),
            espeak_voice: "ru".to_string(),
            espeak_speed: 150,
            say_voice: "Milena".to_string(),
            playback_timeout: Duration::from_secs(10),
            drain_timeout: Duration::from_secs(5),
        }
    }
}

/// Neural voice settings
#[derive(Debug, Clone)]
pub struct NeuralVoiceConfig {
    /// Speech endpoint, set explicitly or implied by an API key
    pub url: Option<String>,

    /// Bearer token for the speech endpoint
    pub api_key: Option<String>,

    /// Speech model identifier
    pub model: String,

    /// Voice name
    pub voice: String,

    /// Speed multiplier (1.0 = normal)
    pub speed: f32,

    /// Output gain (1.0 = unchanged)
    pub volume: f32,
}

impl Default for NeuralVoiceConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            model: "tts-1".to_string(),
            voice: "onyx".to_string(),
            speed: 0.9,
            volume: 1.0,
        }
    }
}

impl NeuralVoiceConfig {
    /// Whether enough is configured to reach a speech endpoint
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.url.is_some() || self.api_key.is_some()
    }

    /// Effective endpoint URL
    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.url.as_deref().unwrap_or(DEFAULT_TTS_URL)
    }
}

/// Language model configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Ollama base URL
    pub url: String,

    /// Model identifier
    pub model: String,

    /// Request timeout
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_LLM_MODEL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Speech recognition configuration
#[derive(Debug, Clone)]
pub struct SttConfig {
    /// Base URL of an OpenAI-compatible transcription server
    pub url: String,

    /// Transcription model
    pub model: String,

    /// Spoken language hint
    pub language: String,

    /// Optional bearer token
    pub api_key: Option<String>,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000".to_string(),
            model: "whisper-1".to_string(),
            language: "ru".to_string(),
            api_key: None,
        }
    }
}

impl Config {
    /// Load configuration from the environment and the optional TOML file
    ///
    /// # Errors
    ///
    /// Returns error if a value is present but malformed
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();
        Self::from_sources(&fc, |key| std::env::var(key).ok())
    }

    /// Build configuration from a parsed file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if a value is present but malformed
    pub fn from_sources<F>(fc: &JarvisConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let assistant = AssistantConfig {
            wake_phrase: env("JARVIS_WAKE_PHRASE")
                .or_else(|| fc.assistant.wake_phrase.clone())
                .map_or(defaults.assistant.wake_phrase, |w| w.trim().to_lowercase()),
            arm_timeout: parse_number(env("JARVIS_ARM_TIMEOUT_SECS"), "JARVIS_ARM_TIMEOUT_SECS")?
                .or(fc.assistant.arm_timeout_secs)
                .map_or(defaults.assistant.arm_timeout, Duration::from_secs),
            history_turns: parse_number(env("JARVIS_HISTORY_TURNS"), "JARVIS_HISTORY_TURNS")?
                .or(fc.assistant.history_turns)
                .unwrap_or(defaults.assistant.history_turns),
        };

        if assistant.wake_phrase.is_empty() {
            return Err(Error::Config("wake phrase must not be empty".to_string()));
        }

        let rate = env("JARVIS_VOICE_RATE").or_else(|| fc.voice.rate.clone());
        let volume = env("JARVIS_VOICE_VOLUME").or_else(|| fc.voice.volume.clone());
        let neural_defaults = defaults.voice.neural;
        let neural = NeuralVoiceConfig {
            url: env("JARVIS_TTS_URL").or_else(|| fc.voice.tts_url.clone()),
            api_key: env("JARVIS_TTS_API_KEY").or_else(|| env("OPENAI_API_KEY")),
            model: env("JARVIS_TTS_MODEL")
                .or_else(|| fc.voice.tts_model.clone())
                .unwrap_or(neural_defaults.model),
            voice: env("JARVIS_VOICE_NAME")
                .or_else(|| fc.voice.voice_name.clone())
                .unwrap_or(neural_defaults.voice),
            speed: rate
                .as_deref()
                .map(parse_percent)
                .transpose()?
                .unwrap_or(neural_defaults.speed),
            volume: volume
                .as_deref()
                .map(parse_percent)
                .transpose()?
                .unwrap_or(neural_defaults.volume),
        };

        let voice = VoiceConfig {
            disable_neural: env("DISABLE_JARVIS_VOICE")
                .map(|v| is_truthy(&v))
                .or(fc.voice.disable_neural)
                .unwrap_or(false),
            neural,
            espeak_voice: env("JARVIS_ESPEAK_VOICE")
                .or_else(|| fc.voice.espeak_voice.clone())
                .unwrap_or(defaults.voice.espeak_voice),
            espeak_speed: parse_number(env("JARVIS_ESPEAK_SPEED"), "JARVIS_ESPEAK_SPEED")?
                .or(fc.voice.espeak_speed)
                .unwrap_or(defaults.voice.espeak_speed),
            say_voice: env("JARVIS_SAY_VOICE")
                .or_else(|| fc.voice.say_voice.clone())
                .unwrap_or(defaults.voice.say_voice),
            playback_timeout: fc
                .voice
                .playback_timeout_secs
                .map_or(defaults.voice.playback_timeout, Duration::from_secs),
            drain_timeout: fc
                .voice
                .drain_timeout_secs
                .map_or(defaults.voice.drain_timeout, Duration::from_secs),
        };

        let llm = LlmConfig {
            url: env("JARVIS_OLLAMA_URL")
                .or_else(|| fc.llm.url.clone())
                .map_or(defaults.llm.url, |u| u.trim_end_matches('/').to_string()),
            model: env("JARVIS_LLM_MODEL")
                .or_else(|| fc.llm.model.clone())
                .unwrap_or(defaults.llm.model),
            timeout: parse_number(env("JARVIS_LLM_TIMEOUT_SECS"), "JARVIS_LLM_TIMEOUT_SECS")?
                .or(fc.llm.timeout_secs)
                .map_or(defaults.llm.timeout, Duration::from_secs),
        };

        let stt = SttConfig {
            url: env("JARVIS_STT_URL")
                .or_else(|| fc.stt.url.clone())
                .map_or(defaults.stt.url, |u| u.trim_end_matches('/').to_string()),
            model: env("JARVIS_STT_MODEL")
                .or_else(|| fc.stt.model.clone())
                .unwrap_or(defaults.stt.model),
            language: env("JARVIS_STT_LANGUAGE")
                .or_else(|| fc.stt.language.clone())
                .unwrap_or(defaults.stt.language),
            api_key: env("JARVIS_STT_API_KEY"),
        };

        Ok(Self {
            assistant,
            voice,
            llm,
            stt,
        })
    }
}

/// Parse an Edge-style relative percentage ("-10%", "+5%", "0%") into a multiplier
///
/// # Errors
///
/// Returns error if the value is not a percentage or yields a non-positive multiplier
pub fn parse_percent(value: &str) -> Result<f32> {
    let trimmed = value.trim();
    let number = trimmed
        .strip_suffix('%')
        .ok_or_else(|| Error::Config(format!("expected a percentage like \"-10%\", got {value:?}")))?;

    let percent: f32 = number
        .trim_start_matches('+')
        .parse()
        .map_err(|_| Error::Config(format!("invalid percentage {value:?}")))?;

    let multiplier = 1.0 + percent / 100.0;
    if multiplier <= 0.0 || !multiplier.is_finite() {
        return Err(Error::Config(format!("percentage {value:?} out of range")));
    }

    Ok(multiplier)
}

fn parse_number<T: std::str::FromStr>(value: Option<String>, key: &str) -> Result<Option<T>> {
    value
        .map(|v| {
            v.trim()
                .parse()
                .map_err(|_| Error::Config(format!("{key} must be a number, got {v:?}")))
        })
        .transpose()
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_sources(&JarvisConfigFile::default(), env_of(&[])).unwrap();

        assert_eq!(config.assistant.wake_phrase, "джарвис");
        assert_eq!(config.assistant.history_turns, 2);
        assert_eq!(config.llm.url, DEFAULT_OLLAMA_URL);
        assert!(!config.voice.disable_neural);
        assert!(!config.voice.neural.is_configured());
    }

    #[test]
    fn test_env_overrides_file() {
        let fc = file::parse_config_file("[llm]\nmodel = \"from-file\"\n").unwrap();
        let config = Config::from_sources(
            &fc,
            env_of(&[
                ("JARVIS_LLM_MODEL", "from-env"),
                ("JARVIS_VOICE_RATE", "-10%"),
                ("JARVIS_VOICE_VOLUME", "+20%"),
                ("DISABLE_JARVIS_VOICE", "Yes"),
                ("JARVIS_WAKE_PHRASE", "  Пятница "),
            ]),
        )
        .unwrap();

        assert_eq!(config.llm.model, "from-env");
        assert!((config.voice.neural.speed - 0.9).abs() < 1e-6);
        assert!((config.voice.neural.volume - 1.2).abs() < 1e-6);
        assert!(config.voice.disable_neural);
        assert_eq!(config.assistant.wake_phrase, "пятница");
    }

    #[test]
    fn test_api_key_enables_neural_voice() {
        let config = Config::from_sources(
            &JarvisConfigFile::default(),
            env_of(&[("OPENAI_API_KEY", "sk-test")]),
        )
        .unwrap();

        assert!(config.voice.neural.is_configured());
        assert_eq!(config.voice.neural.endpoint(), DEFAULT_TTS_URL);
    }

    #[test]
    fn test_parse_percent() {
        assert!((parse_percent("-10%").unwrap() - 0.9).abs() < 1e-6);
        assert!((parse_percent("+0%").unwrap() - 1.0).abs() < 1e-6);
        assert!((parse_percent("25%").unwrap() - 1.25).abs() < 1e-6);
        assert!(parse_percent("fast").is_err());
        assert!(parse_percent("-100%").is_err());
    }

    #[test]
    fn test_malformed_number_is_error() {
        let err = Config::from_sources(
            &JarvisConfigFile::default(),
            env_of(&[("JARVIS_HISTORY_TURNS", "two")]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
