//! Language model queries
//!
//! One attempt per question, never an error to the caller: failures turn
//! into a spoken apology and leave the history untouched.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local};

use super::conversation::{ConversationState, ConversationTurn};
use crate::config::LlmConfig;
use crate::{Error, Result};

/// Spoken when the model answers with an error status
pub const STATUS_FALLBACK: &str = "Извините, возникла проблема с обработкой запроса.";

/// Spoken when the model cannot be reached or the reply is unusable
pub const ERROR_FALLBACK: &str = "Произошла ошибка при обработке вашего запроса.";

/// Timeout for the startup reachability check
const PING_TIMEOUT: Duration = Duration::from_secs(5);

/// Something that completes prompts
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Complete a prompt
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or a non-success response
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Ollama `/api/generate` client
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(serde::Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(serde::Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaClient {
    /// Create a client
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url: config.url.clone(),
            model: config.model.clone(),
        })
    }

    /// Check that the server is up
    ///
    /// # Errors
    ///
    /// Returns error if the server is unreachable or unhealthy
    pub async fn ping(&self) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(PING_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::ModelStatus {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        tracing::info!(url = %self.base_url, model = %self.model, "ollama reachable");
        Ok(())
    }
}

#[async_trait]
impl ModelBackend for OllamaClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ModelStatus {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await?;
        parse_generate_response(&body)
    }
}

/// Extract the reply text from an `/api/generate` body
fn parse_generate_response(body: &[u8]) -> Result<String> {
    let result: GenerateResponse = serde_json::from_slice(body)?;
    Ok(result.response)
}

/// Build the prompt for `text` with recent history as context
#[must_use]
pub fn build_prompt(text: &str, history: &ConversationState, now: DateTime<Local>) -> String {
    format!(
        "Ты Джарвис - интеллектуальный голосовой помощник.\n\
         Текущее время: {time}\n\
         \n\
         Контекст разговора:\n\
         {context}\n\
         \n\
         Пользователь: {text}\n\
         Твой ответ должен быть кратким (1-2 предложения), полезным и естественным для голосового воспроизведения.\n\
         Ответ:",
        time = now.format("%H:%M %d.%m.%Y"),
        context = history.context(),
    )
}

/// Ask the model about `text`, recording the turn on success
///
/// Always returns something to say.
pub async fn query_model(
    backend: &dyn ModelBackend,
    text: &str,
    history: &mut ConversationState,
    now: DateTime<Local>,
) -> String {
    let prompt = build_prompt(text, history, now);

    match backend.complete(&prompt).await {
        Ok(reply) => {
            let reply = reply.trim();
            if reply.is_empty() {
                tracing::warn!("model returned an empty reply");
                return ERROR_FALLBACK.to_string();
            }

            history.push(ConversationTurn {
                user: text.to_string(),
                assistant: reply.to_string(),
                timestamp: Local::now(),
            });
            reply.to_string()
        }
        Err(Error::ModelStatus { status, body }) => {
            tracing::warn!(status, body = %body, "model request rejected");
            STATUS_FALLBACK.to_string()
        }
        Err(e) => {
            tracing::warn!(error = %e, "model request failed");
            ERROR_FALLBACK.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct Scripted {
        reply: Mutex<Option<Result<String>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(reply: Result<String>) -> Self {
            Self {
                reply: Mutex::new(Some(reply)),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ModelBackend for Scripted {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(Error::Model("exhausted".to_string())))
        }
    }

    #[test]
    fn test_prompt_contains_context_and_text() {
        let mut history = ConversationState::new(2);
        history.push(ConversationTurn {
            user: "привет".to_string(),
            assistant: "здравствуйте".to_string(),
            timestamp: Local::now(),
        });

        let prompt = build_prompt("какая погода", &history, Local::now());
        assert!(prompt.contains("User: привет\nAssistant: здравствуйте"));
        assert!(prompt.contains("Пользователь: какая погода"));
        assert!(prompt.contains("1-2 предложения"));
    }

    #[tokio::test]
    async fn test_success_records_turn() {
        let model = Scripted::new(Ok("  Солнечно.  ".to_string()));
        let mut history = ConversationState::new(2);

        let reply = query_model(&model, "какая погода", &mut history, Local::now()).await;

        assert_eq!(reply, "Солнечно.");
        assert_eq!(history.len(), 1);
        assert_eq!(model.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_status_error_falls_back() {
        let model = Scripted::new(Err(Error::ModelStatus {
            status: 500,
            body: String::new(),
        }));
        let mut history = ConversationState::new(2);

        let reply = query_model(&model, "вопрос", &mut history, Local::now()).await;

        assert_eq!(reply, STATUS_FALLBACK);
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_falls_back() {
        let model = Scripted::new(Err(Error::Model("connection refused".to_string())));
        let mut history = ConversationState::new(2);

        let reply = query_model(&model, "вопрос", &mut history, Local::now()).await;

        assert_eq!(reply, ERROR_FALLBACK);
        assert!(history.is_empty());
    }

    #[test]
    fn test_generate_response_parsing() {
        let body = r#"{"model":"llama3","response":"Привет!","done":true}"#.as_bytes();
        assert_eq!(parse_generate_response(body).unwrap(), "Привет!");

        let err = parse_generate_response(b"<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
