//! Application constants, data directories and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::assistant::audio_store::AudioNaming;
use crate::assistant::{llm, speech};
use crate::prediction::risk::RiskTierVariant;
use crate::prediction::UnknownKeyPolicy;

/// Application-level constants
pub const APP_NAME: &str = "Cardiorisk";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
/// Reserved at the end of a Q&A request for persisting audio and replying.
pub const QA_DEADLINE_MARGIN_SECS: u64 = 1;
pub const DEFAULT_MAX_AUDIO_FILES: usize = 100;
pub const DEFAULT_TTS_URL: &str =
    "https://dashscope.aliyuncs.com/api/v1/services/aigc/multimodal-generation/generation";

/// Get the application data directory.
/// `~/Cardiorisk/` unless `CARDIORISK_HOME` is set.
pub fn app_data_dir() -> PathBuf {
    if let Some(home) = std::env::var_os("CARDIORISK_HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(home);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Directory holding the model artifact.
pub fn model_dir() -> PathBuf {
    app_data_dir().join("models")
}

/// Directory synthesized audio is written to and served from.
pub fn audio_dir() -> PathBuf {
    app_data_dir().join("audio")
}

/// Filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> String {
    let level = std::env::var("LOG_LEVEL")
        .ok()
        .map(|l| l.trim().to_ascii_lowercase())
        .filter(|l| matches!(l.as_str(), "trace" | "debug" | "info" | "warn" | "error"))
        .unwrap_or_else(|| "info".to_string());
    format!("cardiorisk={level},cardiorisk_lib={level},tower_http=info,warn")
}

// ═══════════════════════════════════════════════════════════
// Runtime configuration
// ═══════════════════════════════════════════════════════════

/// Everything read from the environment at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub model_dir: PathBuf,
    pub audio_dir: PathBuf,
    pub risk_tiers: RiskTierVariant,
    pub unknown_keys: UnknownKeyPolicy,
    pub audio_naming: AudioNaming,
    pub max_audio_files: usize,
    pub request_timeout_secs: u64,

    pub llm_api_key: Option<String>,
    pub llm_api_url: String,
    pub llm_model: String,
    pub llm_timeout_secs: u64,

    pub tts_api_key: Option<String>,
    pub tts_api_url: String,
    pub tts_model: String,
    pub tts_voice: String,
    pub tts_format: String,
    pub tts_timeout_secs: u64,
    pub tts_max_retries: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            model_dir: model_dir(),
            audio_dir: audio_dir(),
            risk_tiers: RiskTierVariant::default(),
            unknown_keys: UnknownKeyPolicy::default(),
            audio_naming: AudioNaming::default(),
            max_audio_files: DEFAULT_MAX_AUDIO_FILES,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            llm_api_key: None,
            llm_api_url: llm::DEFAULT_API_URL.to_string(),
            llm_model: llm::DEFAULT_MODEL.to_string(),
            llm_timeout_secs: llm::DEFAULT_TIMEOUT_SECS,
            tts_api_key: None,
            tts_api_url: DEFAULT_TTS_URL.to_string(),
            tts_model: speech::DEFAULT_MODEL.to_string(),
            tts_voice: speech::DEFAULT_VOICE.to_string(),
            tts_format: speech::DEFAULT_FORMAT.to_string(),
            tts_timeout_secs: speech::DEFAULT_TIMEOUT_SECS,
            tts_max_retries: speech::DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable values keep the
    /// default and log a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(host) = get("CARDIORISK_HOST") {
            config.host = host;
        }
        parse_into(&get, "CARDIORISK_PORT", &mut config.port);
        if let Some(dir) = get("CARDIORISK_MODEL_DIR") {
            config.model_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get("CARDIORISK_AUDIO_DIR") {
            config.audio_dir = PathBuf::from(dir);
        }
        parse_into(&get, "CARDIORISK_RISK_TIERS", &mut config.risk_tiers);
        if let Some(value) = get("CARDIORISK_UNKNOWN_KEYS") {
            match value.to_ascii_lowercase().as_str() {
                "ignore" => config.unknown_keys = UnknownKeyPolicy::Ignore,
                "reject" => config.unknown_keys = UnknownKeyPolicy::Reject,
                _ => warn_invalid("CARDIORISK_UNKNOWN_KEYS", &value),
            }
        }
        if let Some(value) = get("CARDIORISK_AUDIO_NAMING") {
            match value.to_ascii_lowercase().as_str() {
                "uuid" => config.audio_naming = AudioNaming::Uuid,
                "hash" | "content_hash" => config.audio_naming = AudioNaming::ContentHash,
                _ => warn_invalid("CARDIORISK_AUDIO_NAMING", &value),
            }
        }
        parse_into(&get, "CARDIORISK_MAX_AUDIO_FILES", &mut config.max_audio_files);
        parse_into(&get, "CARDIORISK_REQUEST_TIMEOUT_SECS", &mut config.request_timeout_secs);

        config.llm_api_key = get("DEEPSEEK_API_KEY");
        if let Some(url) = get("DEEPSEEK_API_URL") {
            config.llm_api_url = url;
        }
        if let Some(model) = get("DEEPSEEK_MODEL") {
            config.llm_model = model;
        }

        config.tts_api_key = get("COSYVOICE_APPKEY");
        if let Some(url) = get("COSYVOICE_API_URL") {
            config.tts_api_url = url;
        }
        if let Some(voice) = get("COSYVOICE_VOICE") {
            config.tts_voice = voice;
        }
        parse_into(&get, "COSYVOICE_TIMEOUT", &mut config.tts_timeout_secs);
        parse_into(&get, "COSYVOICE_MAX_RETRIES", &mut config.tts_max_retries);

        config.raise_request_timeout_floor();
        config
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Shortest request deadline that still fits one text answer and one
    /// speech attempt.
    pub fn min_request_timeout_secs(&self) -> u64 {
        self.llm_timeout_secs
            .saturating_add(self.tts_timeout_secs)
            .saturating_add(QA_DEADLINE_MARGIN_SECS)
    }

    /// Time a Q&A pipeline may spend before the HTTP deadline fires.
    pub fn qa_deadline(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .saturating_sub(QA_DEADLINE_MARGIN_SECS),
        )
    }

    fn raise_request_timeout_floor(&mut self) {
        let floor = self.min_request_timeout_secs();
        if self.request_timeout_secs < floor {
            tracing::warn!(
                configured = self.request_timeout_secs,
                raised_to = floor,
                "CARDIORISK_REQUEST_TIMEOUT_SECS too short for a text answer plus speech, raising it"
            );
            self.request_timeout_secs = floor;
        }
    }
}

fn parse_into<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    slot: &mut T,
) {
    if let Some(raw) = get(key) {
        match raw.parse::<T>() {
            Ok(value) => *slot = value,
            Err(_) => warn_invalid(key, &raw),
        }
    }
}

fn warn_invalid(key: &str, value: &str) {
    tracing::warn!(key, value, "Invalid configuration value, using default");
}
