//! Health Q&A: text answers from an external LLM, rendered to speech by an
//! external TTS service, with degrade-to-text when synthesis fails.

pub mod answer;
pub mod audio_store;
pub mod llm;
pub mod orchestrator;
pub mod speech;

pub use answer::AnswerPipeline;
pub use audio_store::{AudioNaming, AudioRef, AudioStore};
pub use llm::{ChatMessage, DeepSeekClient, GenerationRequest, TextGenerator};
pub use orchestrator::{QaOrchestrator, QaResult};
pub use speech::{
    HttpSpeechSynthesizer, NullSynthesizer, RetryPolicy, Sleeper, SpeechPipeline,
    SpeechRequest, SpeechSynthesizer, ThreadSleeper,
};

use thiserror::Error;

/// Failures talking to the text-generation or speech-synthesis services.
#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Cannot reach {0}")]
    Connection(String),

    #[error("Service returned error (status {status}): {body}")]
    Http { status: u16, body: String },

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Service returned an empty response")]
    EmptyResponse,

    #[error("Service not configured: {0}")]
    NotConfigured(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Audio storage failed: {0}")]
    Storage(#[from] std::io::Error),
}

impl CollaboratorError {
    /// Worth another attempt. Configuration and input problems never are.
    pub fn is_transient(&self) -> bool {
        match self {
            CollaboratorError::Timeout(_)
            | CollaboratorError::Connection(_)
            | CollaboratorError::EmptyResponse
            | CollaboratorError::Storage(_) => true,
            CollaboratorError::Http { status, .. } => *status == 429 || *status >= 500,
            CollaboratorError::ResponseParsing(_)
            | CollaboratorError::NotConfigured(_)
            | CollaboratorError::InvalidInput(_) => false,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, CollaboratorError::Timeout(_))
    }

    /// Classify a reqwest failure the way both HTTP clients report it.
    pub(crate) fn from_reqwest(err: reqwest::Error, endpoint: &str, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            CollaboratorError::Timeout(timeout_secs)
        } else if err.is_connect() {
            CollaboratorError::Connection(endpoint.to_string())
        } else if err.is_decode() {
            CollaboratorError::ResponseParsing(err.to_string())
        } else {
            CollaboratorError::Connection(format!("{endpoint}: {err}"))
        }
    }
}
