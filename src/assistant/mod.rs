//! Assistant logic
//!
//! Everything between a recognized utterance and the text to speak:
//! wake phrase gating, keyword classification, the confirmation handshake,
//! conversation history and model queries.

mod activation;
mod classifier;
mod conversation;
mod model;

pub use activation::{Activation, ActivationGate, ActivationState, Command};
pub use classifier::{
    Action, CANCEL_REPLY, CommandClassifier, ConfirmationState, FAREWELL, GRATITUDE_REPLY,
    HISTORY_CLEARED, KeywordSet, Keywords, OK_REPLY, confirmation_prompt, pending_reminder,
    spoken_date,
};
pub use conversation::{ConversationState, ConversationTurn};
pub use model::{
    ERROR_FALLBACK, ModelBackend, OllamaClient, STATUS_FALLBACK, build_prompt, query_model,
};
