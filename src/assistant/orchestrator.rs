//! Question → text answer → optional audio.
//!
//! Text generation failing is a failure of the whole request. Speech
//! failing is not: the result is still a success, flagged with a warning.
//! Speech only gets whatever is left of the request deadline once the
//! text answer exists, so a slow synthesizer can cost audio but never text.

use std::time::{Duration, Instant};

use serde::Serialize;

use super::answer::AnswerPipeline;
use super::speech::SpeechPipeline;

pub const SPEECH_DEGRADED_WARNING: &str = "speech synthesis failed, text-only";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QaResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Always present on the wire; `null` when the answer is text-only.
    pub audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QaResult {
    fn answered(text: String, audio_url: Option<String>) -> Self {
        let warning = audio_url.is_none().then(|| SPEECH_DEGRADED_WARNING.to_string());
        Self {
            success: true,
            text: Some(text),
            audio_url,
            warning,
            error: None,
        }
    }

    fn failed(reason: String) -> Self {
        Self {
            success: false,
            text: None,
            audio_url: None,
            warning: None,
            error: Some(format!("generation failed: {reason}")),
        }
    }
}

pub struct QaOrchestrator {
    answers: AnswerPipeline,
    speech: SpeechPipeline,
    deadline: Option<Duration>,
}

impl QaOrchestrator {
    pub fn new(answers: AnswerPipeline, speech: SpeechPipeline) -> Self {
        Self {
            answers,
            speech,
            deadline: None,
        }
    }

    /// Bound one `pipeline` call. Speech is cut short, never text.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn answers(&self) -> &AnswerPipeline {
        &self.answers
    }

    pub fn speech(&self) -> &SpeechPipeline {
        &self.speech
    }

    pub fn pipeline(&self, question: &str) -> QaResult {
        self.pipeline_with_context(question, None)
    }

    /// Blocking; run under `spawn_blocking` from async code.
    pub fn pipeline_with_context(&self, question: &str, context: Option<&str>) -> QaResult {
        let started = Instant::now();
        let text = match self.answers.try_ask(question, context) {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                tracing::error!("QA pipeline: generator returned blank text");
                return QaResult::failed("empty answer".into());
            }
            Err(e) => {
                tracing::error!(error = %e, "QA pipeline: text generation failed");
                return QaResult::failed(e.to_string());
            }
        };

        let audio = match self.deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_sub(started.elapsed());
                self.speech.synthesize_within(&text, remaining)
            }
            None => self.speech.synthesize(&text),
        };
        let audio_url = audio.map(|audio| audio.url);
        if audio_url.is_none() {
            tracing::warn!("QA pipeline: returning text without audio");
        }
        QaResult::answered(text, audio_url)
    }
}
