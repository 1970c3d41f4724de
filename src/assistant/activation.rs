//! Wake phrase gate
//!
//! Watches utterances for the wake phrase and lets exactly one following
//! utterance through as a command.

use std::time::Duration;

use chrono::{DateTime, Local};

use crate::voice::Utterance;

/// A command that passed the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command text with the wake phrase removed
    pub text: String,
}

/// Gate state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationState {
    /// Only the wake phrase is of interest
    Idle,
    /// The next non-empty utterance is a command
    Armed {
        /// When the gate was (re)armed
        since: DateTime<Local>,
    },
}

/// Result of observing one utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// Nothing to do
    Ignored,
    /// The gate armed (or re-armed); the user should hear an acknowledgment
    Armed,
    /// A command to dispatch
    Command(Command),
}

/// Stateful wake phrase filter
#[derive(Debug)]
pub struct ActivationGate {
    wake_phrase: String,
    arm_timeout: Duration,
    state: ActivationState,
}

impl ActivationGate {
    /// Create an idle gate
    #[must_use]
    pub fn new(wake_phrase: &str, arm_timeout: Duration) -> Self {
        let wake_phrase = wake_phrase.trim().to_lowercase();
        tracing::debug!(wake_phrase, "activation gate initialized");

        Self {
            wake_phrase,
            arm_timeout,
            state: ActivationState::Idle,
        }
    }

    /// Feed one utterance through the gate
    pub fn observe(&mut self, utterance: &Utterance) -> Activation {
        let text = utterance.text.to_lowercase();
        let mentions_wake = text.contains(&self.wake_phrase);

        if let ActivationState::Armed { since } = self.state {
            let expired = (utterance.timestamp - since)
                .to_std()
                .is_ok_and(|elapsed| elapsed > self.arm_timeout);
            if expired {
                tracing::debug!("armed state expired");
                self.state = ActivationState::Idle;
            }
        }

        match self.state {
            ActivationState::Idle => {
                if !mentions_wake {
                    return Activation::Ignored;
                }

                let remainder = self.strip_wake_phrase(&text);
                if remainder.is_empty() {
                    tracing::info!(text, "wake phrase detected");
                    self.state = ActivationState::Armed {
                        since: utterance.timestamp,
                    };
                    Activation::Armed
                } else {
                    tracing::info!(command = %remainder, "wake phrase with inline command");
                    Activation::Command(Command { text: remainder })
                }
            }
            ActivationState::Armed { .. } => {
                let remainder = self.strip_wake_phrase(&text);
                if remainder.is_empty() {
                    tracing::info!("wake phrase repeated, re-arming");
                    self.state = ActivationState::Armed {
                        since: utterance.timestamp,
                    };
                    return Activation::Armed;
                }

                self.state = ActivationState::Idle;
                tracing::info!(command = %remainder, "command received");
                Activation::Command(Command { text: remainder })
            }
        }
    }

    /// Remove at most one occurrence of the wake phrase and tidy the rest
    fn strip_wake_phrase(&self, text: &str) -> String {
        text.replacen(&self.wake_phrase, " ", 1)
            .split_whitespace()
            .filter(|word| !word.chars().all(|c| c == ',' || c == '.'))
            .collect::<Vec<_>>()
            .join(" ")
            .trim_matches(|c: char| c == ',' || c == '.' || c.is_whitespace())
            .to_string()
    }

    /// Whether the next utterance will be taken as a command
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        matches!(self.state, ActivationState::Armed { .. })
    }

    /// Get current state
    #[must_use]
    pub const fn state(&self) -> ActivationState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn gate() -> ActivationGate {
        ActivationGate::new("джарвис", Duration::from_secs(30))
    }

    fn command(text: &str) -> Activation {
        Activation::Command(Command {
            text: text.to_string(),
        })
    }

    #[test]
    fn test_idle_ignores_plain_speech() {
        let mut gate = gate();
        for text in ["который час", "стоп", "да", "джар вис"] {
            assert_eq!(gate.observe(&Utterance::now(text)), Activation::Ignored);
        }
        assert_eq!(gate.state(), ActivationState::Idle);
    }

    #[test]
    fn test_wake_then_command() {
        let mut gate = gate();

        assert_eq!(gate.observe(&Utterance::now("Джарвис")), Activation::Armed);
        assert!(gate.is_armed());

        assert_eq!(gate.observe(&Utterance::now("который час")), command("который час"));
        assert!(!gate.is_armed());

        // disarmed after one command
        assert_eq!(gate.observe(&Utterance::now("который час")), Activation::Ignored);
    }

    #[test]
    fn test_inline_command() {
        let mut gate = gate();
        assert_eq!(
            gate.observe(&Utterance::now("джарвис какая погода в москве")),
            command("какая погода в москве")
        );
        assert!(!gate.is_armed());
    }

    #[test]
    fn test_wake_phrase_anywhere() {
        let mut gate = gate();
        assert_eq!(
            gate.observe(&Utterance::now("ну джарвис, который час")),
            command("ну который час")
        );
    }

    #[test]
    fn test_repeated_wake_phrase_rearms() {
        let mut gate = gate();
        let start = Local::now();

        assert_eq!(gate.observe(&Utterance::at("джарвис", start)), Activation::Armed);
        let later = start + TimeDelta::seconds(20);
        assert_eq!(gate.observe(&Utterance::at("джарвис", later)), Activation::Armed);
        assert_eq!(gate.state(), ActivationState::Armed { since: later });

        // the re-arm refreshed the timeout
        let after = start + TimeDelta::seconds(45);
        assert_eq!(gate.observe(&Utterance::at("стоп", after)), command("стоп"));
    }

    #[test]
    fn test_armed_strips_only_one_occurrence() {
        let mut gate = gate();
        gate.observe(&Utterance::now("джарвис"));
        assert_eq!(
            gate.observe(&Utterance::now("джарвис скажи джарвис")),
            command("скажи джарвис")
        );
    }

    #[test]
    fn test_armed_state_expires() {
        let mut gate = gate();
        let start = Local::now();

        gate.observe(&Utterance::at("джарвис", start));
        let late = start + TimeDelta::seconds(31);
        assert_eq!(gate.observe(&Utterance::at("который час", late)), Activation::Ignored);
        assert_eq!(gate.state(), ActivationState::Idle);
    }
}
