//! In-memory conversation history

use std::collections::VecDeque;

use chrono::{DateTime, Local};

/// Turns kept in memory; older turns are forgotten
const MAX_STORED_TURNS: usize = 50;

/// One user/assistant exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    /// What the user asked
    pub user: String,
    /// What the model answered
    pub assistant: String,
    /// When the answer arrived
    pub timestamp: DateTime<Local>,
}

/// Ordered, append-only history
#[derive(Debug, Clone)]
pub struct ConversationState {
    turns: VecDeque<ConversationTurn>,
    context_turns: usize,
}

impl ConversationState {
    /// Create an empty history that feeds `context_turns` turns into prompts
    #[must_use]
    pub fn new(context_turns: usize) -> Self {
        Self {
            turns: VecDeque::new(),
            context_turns,
        }
    }

    /// Append a completed turn
    pub fn push(&mut self, turn: ConversationTurn) {
        if self.turns.len() == MAX_STORED_TURNS {
            self.turns.pop_front();
        }
        self.turns.push_back(turn);
    }

    /// The most recent turns used as prompt context, oldest first
    pub fn recent(&self) -> impl Iterator<Item = &ConversationTurn> {
        let skip = self.turns.len().saturating_sub(self.context_turns);
        self.turns.iter().skip(skip)
    }

    /// Recent turns rendered as `User:` / `Assistant:` lines
    #[must_use]
    pub fn context(&self) -> String {
        self.recent()
            .map(|t| format!("User: {}\nAssistant: {}", t.user, t.assistant))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Forget everything
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Number of stored turns
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether no turns are stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
