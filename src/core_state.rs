//! Process-wide application state.
//!
//! Built once at startup from `AppConfig` and shared as `Arc<CoreState>`
//! with every handler. A missing or corrupt model artifact does not stop
//! the process: prediction calls report `ModelUnavailable` while the Q&A
//! routes keep working.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::assistant::llm::UnconfiguredGenerator;
use crate::assistant::{
    AnswerPipeline, AudioStore, DeepSeekClient, HttpSpeechSynthesizer, NullSynthesizer,
    QaOrchestrator, RetryPolicy, SpeechPipeline, SpeechSynthesizer, TextGenerator,
};
use crate::config::AppConfig;
use crate::prediction::risk::RiskTierPolicy;
use crate::prediction::{ModelArtifact, PredictionError, PredictionService};

pub struct CoreState {
    pub config: AppConfig,
    prediction: Option<Arc<PredictionService>>,
    /// Why the model is unavailable, when it is.
    model_error: Option<String>,
    qa: QaOrchestrator,
    started_at: DateTime<Utc>,
}

impl CoreState {
    /// Assemble from already-built parts.
    pub fn new(
        config: AppConfig,
        prediction: Result<PredictionService, PredictionError>,
        qa: QaOrchestrator,
    ) -> Self {
        let (prediction, model_error) = match prediction {
            Ok(service) => (Some(Arc::new(service)), None),
            Err(e) => (None, Some(e.to_string())),
        };
        Self {
            config,
            prediction,
            model_error,
            qa,
            started_at: Utc::now(),
        }
    }

    /// Load the model and wire up the collaborators described by `config`.
    ///
    /// Creates blocking HTTP clients; call outside any async runtime.
    pub fn from_config(config: AppConfig) -> Self {
        let prediction = load_prediction_service(&config);
        if let Err(e) = &prediction {
            tracing::error!(
                dir = %config.model_dir.display(),
                error = %e,
                "Model not loaded, prediction endpoints disabled"
            );
        }

        let qa = build_orchestrator(&config);
        Self::new(config, prediction, qa)
    }

    pub fn prediction(&self) -> Result<&PredictionService, PredictionError> {
        self.prediction.as_deref().ok_or_else(|| {
            PredictionError::ModelUnavailable(
                self.model_error
                    .clone()
                    .unwrap_or_else(|| "model not loaded".into()),
            )
        })
    }

    pub fn is_model_loaded(&self) -> bool {
        self.prediction.is_some()
    }

    pub fn qa(&self) -> &QaOrchestrator {
        &self.qa
    }

    pub fn audio_store(&self) -> &AudioStore {
        self.qa.speech().store()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Apply the audio retention limit. Failures are logged, never raised.
    pub fn enforce_audio_retention(&self) {
        if let Err(e) = self.audio_store().cleanup_old(self.config.max_audio_files) {
            tracing::warn!(error = %e, "Audio retention pass failed");
        }
    }
}

fn load_prediction_service(config: &AppConfig) -> Result<PredictionService, PredictionError> {
    let artifact = ModelArtifact::load_auto(&config.model_dir)?;
    PredictionService::from_artifact(
        artifact,
        RiskTierPolicy::from_variant(config.risk_tiers),
        config.unknown_keys,
    )
}

fn build_orchestrator(config: &AppConfig) -> QaOrchestrator {
    let generator: Arc<dyn TextGenerator> = match DeepSeekClient::new(
        &config.llm_api_url,
        config.llm_api_key.as_deref().unwrap_or_default(),
        config.llm_timeout_secs,
    ) {
        Ok(client) => Arc::new(client.with_model(&config.llm_model)),
        Err(e) => {
            tracing::warn!(error = %e, "Text generation disabled");
            Arc::new(UnconfiguredGenerator::new(&e.to_string()))
        }
    };

    let synthesizer: Arc<dyn SpeechSynthesizer> = match HttpSpeechSynthesizer::new(
        &config.tts_api_url,
        config.tts_api_key.as_deref().unwrap_or_default(),
    ) {
        Ok(client) => Arc::new(client.with_model(&config.tts_model)),
        Err(e) => {
            tracing::warn!(error = %e, "Speech synthesis disabled, answers will be text-only");
            Arc::new(NullSynthesizer::new(&e.to_string()))
        }
    };

    let store = AudioStore::new(config.audio_dir.clone(), config.audio_naming);
    let speech = SpeechPipeline::new(synthesizer, store)
        .with_policy(RetryPolicy {
            max_attempts: config.tts_max_retries,
            ..RetryPolicy::default()
        })
        .with_voice(&config.tts_voice, &config.tts_format)
        .with_timeout(Duration::from_secs(config.tts_timeout_secs));

    let deadline = config.qa_deadline();
    let worst_case = speech.policy().worst_case(speech.timeout());
    if worst_case > deadline {
        tracing::info!(
            worst_case_secs = worst_case.as_secs(),
            deadline_secs = deadline.as_secs(),
            "Speech retries will be cut short by the request deadline"
        );
    }

    QaOrchestrator::new(AnswerPipeline::new(generator), speech).with_deadline(deadline)
}
