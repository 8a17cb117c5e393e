//! Health answers from the text-generation collaborator.
//!
//! `try_ask` surfaces collaborator failures; `ask` turns them into a fixed
//! apology so callers that only want text always get some.

use std::sync::Arc;

use serde_json::{Map, Value};

use super::llm::{GenerationRequest, TextGenerator};
use super::CollaboratorError;
use crate::prediction::PredictionResult;

pub const SYSTEM_PROMPT: &str = "You are a professional cardiovascular health advisor. \
Answer health questions accurately and clearly, give practical lifestyle advice, \
and recommend seeing a doctor when symptoms warrant it. \
Never diagnose; remind the user that your answer does not replace medical care.";

const ADVICE_PROMPT: &str = "Based on the profile and risk assessment above, give \
personalised advice on diet, exercise and daily habits, and say when a medical \
check-up is advisable. Keep it concise and actionable.";

/// Prompt assembly around a `TextGenerator`.
#[derive(Clone)]
pub struct AnswerPipeline {
    generator: Arc<dyn TextGenerator>,
    system_prompt: String,
}

impl AnswerPipeline {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            system_prompt: SYSTEM_PROMPT.to_string(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = prompt.to_string();
        self
    }

    /// Answer `question`, surfacing collaborator failures.
    pub fn try_ask(&self, question: &str, context: Option<&str>) -> Result<String, CollaboratorError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(CollaboratorError::InvalidInput("question is empty".into()));
        }
        let request = GenerationRequest {
            system: self.system_prompt.clone(),
            context: context.map(str::to_string),
            user: question.to_string(),
        };
        self.generator.generate(&request)
    }

    /// Answer `question`. Never fails: collaborator errors become a fixed
    /// apology text that names the reason.
    pub fn ask(&self, question: &str, context: Option<&str>) -> String {
        match self.try_ask(question, context) {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(error = %e, "Answer generation failed");
                fallback_answer(&e)
            }
        }
    }

    /// Lifestyle advice for a user whose features produced `result`.
    pub fn health_advice(&self, features: &Map<String, Value>, result: &PredictionResult) -> String {
        let context = advice_context(features, result);
        self.ask(ADVICE_PROMPT, Some(&context))
    }
}

pub fn fallback_answer(err: &CollaboratorError) -> String {
    format!("Sorry, an error occurred while generating the answer: {err}")
}

fn advice_context(features: &Map<String, Value>, result: &PredictionResult) -> String {
    let mut lines = vec!["User profile:".to_string()];
    for (name, value) in features {
        let rendered = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        lines.push(format!("- {name}: {rendered}"));
    }
    lines.push(format!("Risk level: {}", result.risk_tier));
    lines.push(format!(
        "Cardiovascular disease probability: {:.1}%",
        result.probability.positive * 100.0
    ));
    lines.join("\n")
}
