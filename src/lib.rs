//! Jarvis - voice-activated assistant
//!
//! This library provides the core functionality for the assistant:
//! - Voice processing (capture, endpointing, speech-to-text, playback)
//! - Wake phrase gating and keyword command classification
//! - Confirmation-gated language model queries with short history
//! - Ordered speech output over interchangeable backends
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Microphone                        │
//! └────────────────────┬────────────────────────────────┘
//!                      │ PCM 16 kHz
//! ┌────────────────────▼────────────────────────────────┐
//! │  Capture thread: segmenter → STT → activation gate  │
//! └────────────────────┬────────────────────────────────┘
//!                      │ commands
//! ┌────────────────────▼────────────────────────────────┐
//! │  Command worker: classifier → confirmation → model  │
//! └────────────────────┬────────────────────────────────┘
//!                      │ text
//! ┌────────────────────▼────────────────────────────────┐
//! │  Speech worker: neural │ espeak │ say │ PowerShell  │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod assistant;
pub mod config;
pub mod daemon;
pub mod error;
pub mod speech;
pub mod voice;

pub use config::Config;
pub use daemon::{Daemon, Dispatcher, Flow};
pub use error::{Error, Result};
