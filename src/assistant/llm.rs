//! Text-generation collaborator.
//!
//! `DeepSeekClient` talks to an OpenAI-compatible chat completions
//! endpoint. `UnconfiguredGenerator` stands in when no key is set.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::CollaboratorError;

/// Default OpenAI-compatible endpoint.
pub const DEFAULT_API_URL: &str = "https://api.deepseek.com/v1";
pub const DEFAULT_MODEL: &str = "deepseek-chat";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
        }
    }
}

/// One text-generation call: system prompt, optional prior context, user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub system: String,
    pub context: Option<String>,
    pub user: String,
}

impl GenerationRequest {
    pub fn messages(&self) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::new("system", &self.system)];
        if let Some(context) = self.context.as_deref().filter(|c| !c.trim().is_empty()) {
            messages.push(ChatMessage::new("user", &format!("Background: {context}")));
        }
        messages.push(ChatMessage::new("user", &self.user));
        messages
    }
}

/// External text-generation collaborator (allows mocking).
pub trait TextGenerator: Send + Sync {
    fn generate(&self, request: &GenerationRequest) -> Result<String, CollaboratorError>;
}

// ═══════════════════════════════════════════════════════════
// DeepSeek (OpenAI-compatible chat completions)
// ═══════════════════════════════════════════════════════════

/// Blocking HTTP client for `/chat/completions`.
pub struct DeepSeekClient {
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout_secs: u64,
    client: reqwest::blocking::Client,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl DeepSeekClient {
    pub fn new(base_url: &str, api_key: &str, timeout_secs: u64) -> Result<Self, CollaboratorError> {
        if api_key.trim().is_empty() {
            return Err(CollaboratorError::NotConfigured(
                "DEEPSEEK_API_KEY is not set".into(),
            ));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CollaboratorError::NotConfigured(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 1000,
            timeout_secs,
            client,
        })
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl TextGenerator for DeepSeekClient {
    fn generate(&self, request: &GenerationRequest) -> Result<String, CollaboratorError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: request.messages(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| CollaboratorError::from_reqwest(e, &self.base_url, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(CollaboratorError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .map_err(|e| CollaboratorError::ResponseParsing(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| CollaboratorError::ResponseParsing("no choices in response".into()))?;

        if content.trim().is_empty() {
            return Err(CollaboratorError::EmptyResponse);
        }
        tracing::debug!(model = %self.model, chars = content.len(), "Text generated");
        Ok(content)
    }
}

/// Selected at startup when no API key is configured. Every call fails
/// with `NotConfigured`.
pub struct UnconfiguredGenerator {
    reason: String,
}

impl UnconfiguredGenerator {
    pub fn new(reason: &str) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }
}

impl TextGenerator for UnconfiguredGenerator {
    fn generate(&self, _request: &GenerationRequest) -> Result<String, CollaboratorError> {
        Err(CollaboratorError::NotConfigured(self.reason.clone()))
    }
}

// ═══════════════════════════════════════════════════════════
// Mock
// ═══════════════════════════════════════════════════════════

/// Mock generator for testing: returns a fixed answer or a fixed failure,
/// and records the last request it saw.
pub struct MockTextGenerator {
    outcome: Result<String, String>,
    last_request: std::sync::Mutex<Option<GenerationRequest>>,
    delay: Duration,
}

impl MockTextGenerator {
    pub fn answering(text: &str) -> Self {
        Self {
            outcome: Ok(text.to_string()),
            last_request: std::sync::Mutex::new(None),
            delay: Duration::ZERO,
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            outcome: Err(reason.to_string()),
            last_request: std::sync::Mutex::new(None),
            delay: Duration::ZERO,
        }
    }

    /// Block for `delay` before answering, like a slow upstream.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.last_request.lock().ok().and_then(|g| g.clone())
    }
}

impl TextGenerator for MockTextGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<String, CollaboratorError> {
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        match &self.outcome {
            Ok(text) => Ok(text.clone()),
            Err(reason) => Err(CollaboratorError::Connection(reason.clone())),
        }
    }
}
