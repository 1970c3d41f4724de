//! Keyword command classification
//!
//! Maps command text to an [`Action`] using fixed keyword sets, checked in a
//! fixed order where the first match wins:
//!
//! | Order | Set | Action |
//! |-------|-----|--------|
//! | 1 | exit | `Exit` |
//! | 2 | time | `LocalAnswer` |
//! | 3 | date | `LocalAnswer` |
//! | 4 | gratitude | `LocalAnswer` |
//! | 5 | clear history | `ClearHistory` |
//! | 6 | affirmative | `ConfirmedModelQuery` if a confirmation is pending |
//! | 7 | negative | cancels a pending confirmation |
//! | 8 | anything else | `AskConfirmation` |
//!
//! Keywords match whole words (or whole word sequences), so "да" does not
//! fire inside "погода".

use chrono::{DateTime, Datelike, Local};

/// Spoken when the assistant shuts down
pub const FAREWELL: &str = "Завершаю работу. До свидания!";

/// Reply to thanks
pub const GRATITUDE_REPLY: &str = "Всегда рад помочь!";

/// Reply after clearing history
pub const HISTORY_CLEARED: &str = "История разговора очищена.";

/// Neutral acknowledgment for a yes/no with nothing pending
pub const OK_REPLY: &str = "Хорошо";

/// Reply when a pending model query is declined
pub const CANCEL_REPLY: &str = "Понимаю, отменяю запрос к нейросети.";

const GENITIVE_MONTHS: [&str; 12] = [
    "января",
    "февраля",
    "марта",
    "апреля",
    "мая",
    "июня",
    "июля",
    "августа",
    "сентября",
    "октября",
    "ноября",
    "декабря",
];

/// What to do with a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Say goodbye and stop
    Exit(String),
    /// Speak a locally computed answer
    LocalAnswer(String),
    /// Forget the conversation, then speak the acknowledgment
    ClearHistory(String),
    /// Ask whether to send this text to the model
    AskConfirmation(String),
    /// The user agreed; send the pending text to the model
    ConfirmedModelQuery(String),
}

/// The single outstanding yes/no question, if any
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfirmationState {
    pending_text: Option<String>,
}

impl ConfirmationState {
    /// Whether a confirmation is outstanding
    #[must_use]
    pub const fn pending(&self) -> bool {
        self.pending_text.is_some()
    }

    /// Text awaiting confirmation
    #[must_use]
    pub fn pending_text(&self) -> Option<&str> {
        self.pending_text.as_deref()
    }

    /// Raise a confirmation; refuses if one is already outstanding
    pub fn raise(&mut self, text: &str) -> bool {
        if self.pending() {
            return false;
        }
        self.pending_text = Some(text.to_string());
        true
    }

    /// Clear the confirmation, returning its text
    pub fn resolve(&mut self) -> Option<String> {
        self.pending_text.take()
    }
}

/// A set of keywords and keyword phrases
#[derive(Debug, Clone)]
pub struct KeywordSet {
    phrases: Vec<Vec<String>>,
}

impl KeywordSet {
    /// Build a set from phrases; each phrase is split into words
    #[must_use]
    pub fn new(phrases: &[&str]) -> Self {
        Self {
            phrases: phrases
                .iter()
                .map(|p| tokenize(p))
                .filter(|words| !words.is_empty())
                .collect(),
        }
    }

    /// Whether any phrase occurs as consecutive words
    #[must_use]
    pub fn matches(&self, words: &[String]) -> bool {
        self.phrases
            .iter()
            .any(|phrase| words.windows(phrase.len()).any(|w| w == phrase.as_slice()))
    }
}

/// Keyword sets, one per rule
#[derive(Debug, Clone)]
pub struct Keywords {
    /// Stop the assistant
    pub exit: KeywordSet,
    /// Ask for the time
    pub time: KeywordSet,
    /// Ask for the date
    pub date: KeywordSet,
    /// Thanks
    pub gratitude: KeywordSet,
    /// Forget the conversation
    pub clear_history: KeywordSet,
    /// Yes
    pub affirmative: KeywordSet,
    /// No
    pub negative: KeywordSet,
}

impl Default for Keywords {
    fn default() -> Self {
        Self {
            exit: KeywordSet::new(&["стоп", "выход", "закройся"]),
            time: KeywordSet::new(&["время", "который час"]),
            date: KeywordSet::new(&["дата", "число", "какое число"]),
            gratitude: KeywordSet::new(&["спасибо", "благодарю"]),
            clear_history: KeywordSet::new(&["очисти историю", "забудь всё"]),
            affirmative: KeywordSet::new(&["да", "конечно", "ага", "угу", "согласен"]),
            negative: KeywordSet::new(&["нет", "не надо", "отмена", "отменить"]),
        }
    }
}

/// Classifies command text into actions
#[derive(Debug, Clone, Default)]
pub struct CommandClassifier {
    keywords: Keywords,
}

impl CommandClassifier {
    /// Create a classifier with custom keyword sets
    #[must_use]
    pub const fn new(keywords: Keywords) -> Self {
        Self { keywords }
    }

    /// Classify `text`, updating `confirmation` for yes/no and new questions
    pub fn classify(
        &self,
        text: &str,
        confirmation: &mut ConfirmationState,
        now: DateTime<Local>,
    ) -> Action {
        let words = tokenize(text);
        let kw = &self.keywords;

        if kw.exit.matches(&words) {
            return Action::Exit(FAREWELL.to_string());
        }

        if kw.time.matches(&words) {
            return Action::LocalAnswer(format!("Сейчас {}", now.format("%H:%M")));
        }

        if kw.date.matches(&words) {
            return Action::LocalAnswer(format!("Сегодня {}", spoken_date(now)));
        }

        if kw.gratitude.matches(&words) {
            return Action::LocalAnswer(GRATITUDE_REPLY.to_string());
        }

        if kw.clear_history.matches(&words) {
            return Action::ClearHistory(HISTORY_CLEARED.to_string());
        }

        if kw.affirmative.matches(&words) {
            return confirmation.resolve().map_or_else(
                || Action::LocalAnswer(OK_REPLY.to_string()),
                Action::ConfirmedModelQuery,
            );
        }

        if kw.negative.matches(&words) {
            let reply = if confirmation.resolve().is_some() {
                CANCEL_REPLY
            } else {
                OK_REPLY
            };
            return Action::LocalAnswer(reply.to_string());
        }

        if confirmation.raise(text) {
            return Action::AskConfirmation(text.to_string());
        }

        let pending = confirmation.pending_text().unwrap_or_default();
        tracing::debug!(pending, ignored = text, "confirmation already pending");
        Action::LocalAnswer(pending_reminder(pending))
    }
}

/// Question asked before sending `text` to the model
#[must_use]
pub fn confirmation_prompt(text: &str) -> String {
    format!(
        "Это сложный запрос: '{text}'. Обратиться к нейросети для ответа? Скажите 'да' или 'нет'."
    )
}

/// Reply to a new request while a confirmation is still open
#[must_use]
pub fn pending_reminder(pending: &str) -> String {
    format!("Сначала ответьте 'да' или 'нет' на запрос: '{pending}'.")
}

/// Date as spoken in Russian, e.g. "16 октября 2026"
#[must_use]
pub fn spoken_date(now: DateTime<Local>) -> String {
    let month = GENITIVE_MONTHS[now.month0() as usize];
    format!("{} {month} {}", now.day(), now.year())
}

/// Lowercase words with `ё` folded to `е`
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .replace('ё', "е")
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(ToString::to_string)
        .collect()
}
