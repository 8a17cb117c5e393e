//! Text-to-speech with a bounded retry policy.
//!
//! Each attempt runs Init → Call → {Success, Timeout, Error}. Timeouts and
//! transient errors are retried after a fixed backoff until the policy's
//! attempt budget is spent; then `synthesize` returns `None`. Synthesis
//! failure is never fatal to the caller: the text answer stands on its own.
//!
//! `synthesize_within` additionally bounds wall-clock time: each attempt's
//! timeout is clamped to what is left, and no backoff starts that would
//! overrun the budget.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use base64::Engine;
use serde::{Deserialize, Serialize};

use super::audio_store::{AudioRef, AudioStore};
use super::CollaboratorError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(2);
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MODEL: &str = "cosyvoice-v1";
pub const DEFAULT_VOICE: &str = "longxiaochun";
pub const DEFAULT_FORMAT: &str = "wav";

// ═══════════════════════════════════════════════════════════
// Collaborator interface
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    pub text: String,
    pub voice: String,
    pub format: String,
    pub timeout: Duration,
}

/// External speech-synthesis collaborator.
pub trait SpeechSynthesizer: Send + Sync {
    /// Render `request.text` to an audio payload.
    fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, CollaboratorError>;

    /// Whether this synthesizer can produce audio at all.
    fn is_available(&self) -> bool {
        true
    }
}

/// Stand-in selected at startup when no TTS credentials are configured.
pub struct NullSynthesizer {
    reason: String,
}

impl NullSynthesizer {
    pub fn new(reason: &str) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }
}

impl SpeechSynthesizer for NullSynthesizer {
    fn synthesize(&self, _request: &SpeechRequest) -> Result<Vec<u8>, CollaboratorError> {
        Err(CollaboratorError::NotConfigured(self.reason.clone()))
    }

    fn is_available(&self) -> bool {
        false
    }
}

// ═══════════════════════════════════════════════════════════
// HTTP synthesizer (DashScope-compatible)
// ═══════════════════════════════════════════════════════════

/// Blocking HTTP speech client.
///
/// Accepts either a raw audio body or a JSON envelope carrying the audio
/// as base64 (`output.audio.data`) or as a download URL (`output.audio.url`).
pub struct HttpSpeechSynthesizer {
    endpoint: String,
    api_key: String,
    model: String,
    client: reqwest::blocking::Client,
}

#[derive(Serialize)]
struct SynthesisBody<'a> {
    model: &'a str,
    input: SynthesisInput<'a>,
    parameters: SynthesisParameters<'a>,
}

#[derive(Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct SynthesisParameters<'a> {
    voice: &'a str,
    format: &'a str,
}

#[derive(Deserialize)]
struct SynthesisEnvelope {
    output: SynthesisOutput,
}

#[derive(Deserialize)]
struct SynthesisOutput {
    audio: EnvelopeAudio,
}

#[derive(Deserialize)]
struct EnvelopeAudio {
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl HttpSpeechSynthesizer {
    pub fn new(endpoint: &str, api_key: &str) -> Result<Self, CollaboratorError> {
        if api_key.trim().is_empty() {
            return Err(CollaboratorError::NotConfigured(
                "COSYVOICE_APPKEY is not set".into(),
            ));
        }
        // Per-request timeouts come from `SpeechRequest::timeout`.
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| CollaboratorError::NotConfigured(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            model: DEFAULT_MODEL.to_string(),
            client,
        })
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    fn decode_envelope(
        &self,
        bytes: &[u8],
        request: &SpeechRequest,
    ) -> Result<Vec<u8>, CollaboratorError> {
        let envelope: SynthesisEnvelope = serde_json::from_slice(bytes)
            .map_err(|e| CollaboratorError::ResponseParsing(e.to_string()))?;

        if let Some(data) = envelope.output.audio.data.filter(|d| !d.is_empty()) {
            return base64::engine::general_purpose::STANDARD
                .decode(data)
                .map_err(|e| CollaboratorError::ResponseParsing(format!("audio base64: {e}")));
        }
        if let Some(url) = envelope.output.audio.url.filter(|u| !u.is_empty()) {
            let timeout_secs = request.timeout.as_secs();
            let response = self
                .client
                .get(&url)
                .timeout(request.timeout)
                .send()
                .map_err(|e| CollaboratorError::from_reqwest(e, &url, timeout_secs))?;
            let status = response.status();
            if !status.is_success() {
                return Err(CollaboratorError::Http {
                    status: status.as_u16(),
                    body: String::new(),
                });
            }
            return response
                .bytes()
                .map(|b| b.to_vec())
                .map_err(|e| CollaboratorError::from_reqwest(e, &url, timeout_secs));
        }
        Err(CollaboratorError::EmptyResponse)
    }
}

impl SpeechSynthesizer for HttpSpeechSynthesizer {
    fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, CollaboratorError> {
        let timeout_secs = request.timeout.as_secs();
        let body = SynthesisBody {
            model: &self.model,
            input: SynthesisInput {
                text: &request.text,
            },
            parameters: SynthesisParameters {
                voice: &request.voice,
                format: &request.format,
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .timeout(request.timeout)
            .json(&body)
            .send()
            .map_err(|e| CollaboratorError::from_reqwest(e, &self.endpoint, timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(CollaboratorError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/json"));

        let bytes = response
            .bytes()
            .map_err(|e| CollaboratorError::from_reqwest(e, &self.endpoint, timeout_secs))?;

        if is_json {
            self.decode_envelope(&bytes, request)
        } else {
            Ok(bytes.to_vec())
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Retry policy
// ═══════════════════════════════════════════════════════════

/// Blocking delay between attempts. Injected so tests run without real sleeps.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Bounded attempts with a fixed backoff between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Upper bound on time spent inside `synthesize` for a given call timeout.
    pub fn worst_case(&self, timeout: Duration) -> Duration {
        let attempts = self.max_attempts;
        timeout
            .saturating_mul(attempts)
            .saturating_add(self.backoff.saturating_mul(attempts.saturating_sub(1)))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BACKOFF)
    }
}

// ═══════════════════════════════════════════════════════════
// Speech pipeline
// ═══════════════════════════════════════════════════════════

/// Terminal state of one attempt.
#[derive(Debug)]
enum AttemptOutcome {
    Success(AudioRef),
    Timeout,
    Error(CollaboratorError),
}

pub struct SpeechPipeline {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    store: AudioStore,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    voice: String,
    format: String,
    timeout: Duration,
}

impl SpeechPipeline {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, store: AudioStore) -> Self {
        Self {
            synthesizer,
            store,
            policy: RetryPolicy::default(),
            sleeper: Arc::new(ThreadSleeper),
            voice: DEFAULT_VOICE.to_string(),
            format: DEFAULT_FORMAT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_voice(mut self, voice: &str, format: &str) -> Self {
        self.voice = voice.to_string();
        self.format = format.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_available(&self) -> bool {
        self.synthesizer.is_available()
    }

    pub fn store(&self) -> &AudioStore {
        &self.store
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Synthesize with the configured timeout and attempt budget.
    pub fn synthesize(&self, text: &str) -> Option<AudioRef> {
        self.synthesize_with(text, self.timeout, self.policy.max_attempts)
    }

    /// Like `synthesize`, but gives up once `budget` of wall-clock time is spent.
    pub fn synthesize_within(&self, text: &str, budget: Duration) -> Option<AudioRef> {
        self.run(text, self.timeout, self.policy.max_attempts, Some(budget))
    }

    /// Synthesize `text`, making at most `max_attempts` collaborator calls.
    pub fn synthesize_with(
        &self,
        text: &str,
        timeout: Duration,
        max_attempts: u32,
    ) -> Option<AudioRef> {
        self.run(text, timeout, max_attempts, None)
    }

    fn run(
        &self,
        text: &str,
        timeout: Duration,
        max_attempts: u32,
        budget: Option<Duration>,
    ) -> Option<AudioRef> {
        if text.trim().is_empty() {
            tracing::warn!("Speech synthesis skipped: empty text");
            return None;
        }

        let started = Instant::now();
        let mut request = SpeechRequest {
            text: text.to_string(),
            voice: self.voice.clone(),
            format: self.format.clone(),
            timeout,
        };
        tracing::info!(
            chars = text.chars().count(),
            timeout_secs = timeout.as_secs(),
            max_attempts,
            "Speech synthesis started"
        );

        for attempt in 1..=max_attempts {
            if let Some(budget) = budget {
                let remaining = budget.saturating_sub(started.elapsed());
                if remaining.is_zero() {
                    tracing::warn!(attempt, "Speech synthesis out of time, giving up");
                    return None;
                }
                request.timeout = timeout.min(remaining);
            }

            match self.attempt(&request) {
                AttemptOutcome::Success(audio) => {
                    tracing::info!(attempt, url = %audio.url, "Speech synthesis succeeded");
                    return Some(audio);
                }
                AttemptOutcome::Timeout => {
                    tracing::warn!(attempt, max_attempts, "Speech synthesis timed out");
                }
                AttemptOutcome::Error(e) if !e.is_transient() => {
                    tracing::warn!(attempt, error = %e, "Speech synthesis failed, not retrying");
                    return None;
                }
                AttemptOutcome::Error(e) => {
                    tracing::warn!(attempt, max_attempts, error = %e, "Speech synthesis failed");
                }
            }

            if attempt < max_attempts {
                if let Some(budget) = budget {
                    if started.elapsed().saturating_add(self.policy.backoff) >= budget {
                        tracing::warn!(attempt, "Speech synthesis out of time, giving up");
                        return None;
                    }
                }
                self.sleeper.sleep(self.policy.backoff);
            }
        }

        tracing::error!(max_attempts, "Speech synthesis gave up after all attempts");
        None
    }

    /// One independent attempt. Nothing carries over between attempts.
    fn attempt(&self, request: &SpeechRequest) -> AttemptOutcome {
        let audio = match self.synthesizer.synthesize(request) {
            Ok(audio) => audio,
            Err(e) if e.is_timeout() => return AttemptOutcome::Timeout,
            Err(e) => return AttemptOutcome::Error(e),
        };
        if audio.is_empty() {
            return AttemptOutcome::Error(CollaboratorError::EmptyResponse);
        }
        match self.store.save(&audio, &request.format) {
            Ok(audio_ref) => AttemptOutcome::Success(audio_ref),
            Err(e) => AttemptOutcome::Error(CollaboratorError::Storage(e)),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Test doubles
// ═══════════════════════════════════════════════════════════

/// Mock synthesizer that replays a script of outcomes, then repeats the
/// last one. Counts calls and records each call's timeout.
pub struct MockSynthesizer {
    script: Mutex<Vec<MockSpeech>>,
    calls: AtomicUsize,
    timeouts: Mutex<Vec<Duration>>,
    delay: Duration,
}

#[derive(Debug, Clone)]
pub enum MockSpeech {
    Audio(Vec<u8>),
    Timeout,
    Fail(u16),
    NotConfigured,
}

impl MockSynthesizer {
    pub fn scripted(script: Vec<MockSpeech>) -> Self {
        Self {
            script: Mutex::new(script),
            calls: AtomicUsize::new(0),
            timeouts: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    /// Block for `delay` on every call before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn always(outcome: MockSpeech) -> Self {
        Self::scripted(vec![outcome])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn timeouts(&self) -> Vec<Duration> {
        self.timeouts.lock().map(|t| t.clone()).unwrap_or_default()
    }
}

impl SpeechSynthesizer for MockSynthesizer {
    fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, CollaboratorError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut timeouts) = self.timeouts.lock() {
            timeouts.push(request.timeout);
        }
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        let outcome = match self.script.lock() {
            Ok(script) => script
                .get(call)
                .or_else(|| script.last())
                .cloned()
                .unwrap_or(MockSpeech::Timeout),
            Err(_) => MockSpeech::Timeout,
        };
        match outcome {
            MockSpeech::Audio(bytes) => Ok(bytes),
            MockSpeech::Timeout => Err(CollaboratorError::Timeout(request.timeout.as_secs())),
            MockSpeech::Fail(status) => Err(CollaboratorError::Http {
                status,
                body: "mock failure".into(),
            }),
            MockSpeech::NotConfigured => Err(CollaboratorError::NotConfigured("mock".into())),
        }
    }
}

/// Sleeper that records requested delays instead of sleeping.
#[derive(Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn durations(&self) -> Vec<Duration> {
        self.slept.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        if let Ok(mut slept) = self.slept.lock() {
            slept.push(duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::audio_store::AudioNaming;

    fn pipeline(
        synth: Arc<MockSynthesizer>,
        sleeper: Arc<RecordingSleeper>,
        dir: &std::path::Path,
    ) -> SpeechPipeline {
        SpeechPipeline::new(synth, AudioStore::new(dir.to_path_buf(), AudioNaming::Uuid))
            .with_policy(RetryPolicy::new(3, Duration::from_secs(2)))
            .with_sleeper(sleeper)
    }

    #[test]
    fn first_attempt_success_persists_audio() {
        let dir = tempfile::tempdir().unwrap();
        let synth = Arc::new(MockSynthesizer::always(MockSpeech::Audio(b"wav".to_vec())));
        let sleeper = Arc::new(RecordingSleeper::default());
        let audio = pipeline(synth.clone(), sleeper.clone(), dir.path())
            .synthesize("Walk thirty minutes a day.")
            .unwrap();

        assert_eq!(synth.calls(), 1);
        assert!(sleeper.durations().is_empty());
        assert!(audio.url.starts_with("/static/audio/"));
        assert!(dir.path().join(&audio.file_name).is_file());
    }

    #[test]
    fn always_timing_out_makes_exactly_max_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let synth = Arc::new(MockSynthesizer::always(MockSpeech::Timeout));
        let sleeper = Arc::new(RecordingSleeper::default());
        let result = pipeline(synth.clone(), sleeper.clone(), dir.path()).synthesize("text");

        assert!(result.is_none());
        assert_eq!(synth.calls(), 3);
        assert_eq!(sleeper.durations(), vec![Duration::from_secs(2); 2]);
    }

    #[test]
    fn explicit_attempt_budget_is_honoured() {
        let dir = tempfile::tempdir().unwrap();
        let synth = Arc::new(MockSynthesizer::always(MockSpeech::Timeout));
        let sleeper = Arc::new(RecordingSleeper::default());
        let p = pipeline(synth.clone(), sleeper.clone(), dir.path());

        assert!(p.synthesize_with("text", Duration::from_secs(5), 5).is_none());
        assert_eq!(synth.calls(), 5);
        assert_eq!(sleeper.durations().len(), 4);
    }

    #[test]
    fn recovers_after_transient_failures() {
        let dir = tempfile::tempdir().unwrap();
        let synth = Arc::new(MockSynthesizer::scripted(vec![
            MockSpeech::Timeout,
            MockSpeech::Fail(503),
            MockSpeech::Audio(b"ok".to_vec()),
        ]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let audio = pipeline(synth.clone(), sleeper.clone(), dir.path()).synthesize("text");

        assert!(audio.is_some());
        assert_eq!(synth.calls(), 3);
        assert_eq!(sleeper.durations().len(), 2);
    }

    #[test]
    fn empty_payload_counts_as_failed_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let synth = Arc::new(MockSynthesizer::scripted(vec![
            MockSpeech::Audio(Vec::new()),
            MockSpeech::Audio(b"ok".to_vec()),
        ]));
        let sleeper = Arc::new(RecordingSleeper::default());
        assert!(pipeline(synth.clone(), sleeper, dir.path()).synthesize("text").is_some());
        assert_eq!(synth.calls(), 2);
    }

    #[test]
    fn non_transient_error_stops_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let synth = Arc::new(MockSynthesizer::always(MockSpeech::Fail(401)));
        let sleeper = Arc::new(RecordingSleeper::default());
        assert!(pipeline(synth.clone(), sleeper.clone(), dir.path()).synthesize("text").is_none());
        assert_eq!(synth.calls(), 1);
        assert!(sleeper.durations().is_empty());
    }

    #[test]
    fn null_synthesizer_never_retries() {
        let dir = tempfile::tempdir().unwrap();
        let sleeper = Arc::new(RecordingSleeper::default());
        let p = SpeechPipeline::new(
            Arc::new(NullSynthesizer::new("no key")),
            AudioStore::new(dir.path().to_path_buf(), AudioNaming::Uuid),
        )
        .with_sleeper(sleeper.clone());

        assert!(!p.is_available());
        assert!(p.synthesize("text").is_none());
        assert!(sleeper.durations().is_empty());
    }

    #[test]
    fn empty_text_skips_collaborator() {
        let dir = tempfile::tempdir().unwrap();
        let synth = Arc::new(MockSynthesizer::always(MockSpeech::Audio(b"x".to_vec())));
        let sleeper = Arc::new(RecordingSleeper::default());
        assert!(pipeline(synth.clone(), sleeper, dir.path()).synthesize("  ").is_none());
        assert_eq!(synth.calls(), 0);
    }

    #[test]
    fn failed_attempts_leave_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let synth = Arc::new(MockSynthesizer::always(MockSpeech::Timeout));
        let sleeper = Arc::new(RecordingSleeper::default());
        pipeline(synth, sleeper, dir.path()).synthesize("text");
        let files = std::fs::read_dir(dir.path()).map(|d| d.count()).unwrap_or(0);
        assert_eq!(files, 0);
    }

    #[test]
    fn worst_case_latency_bound() {
        let policy = RetryPolicy::new(3, Duration::from_secs(2));
        assert_eq!(policy.worst_case(Duration::from_secs(30)), Duration::from_secs(94));
        assert_eq!(RetryPolicy::new(0, DEFAULT_BACKOFF).worst_case(Duration::from_secs(30)), Duration::ZERO);
    }

    #[test]
    fn worst_case_saturates_on_huge_timeouts() {
        let policy = RetryPolicy::new(u32::MAX, Duration::from_secs(u64::MAX));
        assert_eq!(policy.worst_case(Duration::from_secs(u64::MAX)), Duration::MAX);
    }

    #[test]
    fn budget_clamps_attempt_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let synth = Arc::new(MockSynthesizer::always(MockSpeech::Audio(b"wav".to_vec())));
        let sleeper = Arc::new(RecordingSleeper::default());
        let p = pipeline(synth.clone(), sleeper, dir.path()).with_timeout(Duration::from_secs(30));

        assert!(p.synthesize_within("text", Duration::from_secs(5)).is_some());
        let timeouts = synth.timeouts();
        assert_eq!(timeouts.len(), 1);
        assert!(timeouts[0] <= Duration::from_secs(5));
    }

    #[test]
    fn budget_stops_retries_before_backoff_overruns() {
        let dir = tempfile::tempdir().unwrap();
        let synth = Arc::new(
            MockSynthesizer::always(MockSpeech::Timeout).with_delay(Duration::from_millis(20)),
        );
        let sleeper = Arc::new(RecordingSleeper::default());
        // Backoff is 2 s; a 500 ms budget has room for one attempt only.
        let p = pipeline(synth.clone(), sleeper.clone(), dir.path());

        assert!(p.synthesize_within("text", Duration::from_millis(500)).is_none());
        assert_eq!(synth.calls(), 1);
        assert!(sleeper.durations().is_empty());
    }

    #[test]
    fn zero_budget_makes_no_calls() {
        let dir = tempfile::tempdir().unwrap();
        let synth = Arc::new(MockSynthesizer::always(MockSpeech::Audio(b"wav".to_vec())));
        let sleeper = Arc::new(RecordingSleeper::default());
        let p = pipeline(synth.clone(), sleeper, dir.path());

        assert!(p.synthesize_within("text", Duration::ZERO).is_none());
        assert_eq!(synth.calls(), 0);
    }

    #[test]
    fn ample_budget_keeps_full_retry_schedule() {
        let dir = tempfile::tempdir().unwrap();
        let synth = Arc::new(MockSynthesizer::always(MockSpeech::Timeout));
        let sleeper = Arc::new(RecordingSleeper::default());
        let p = pipeline(synth.clone(), sleeper.clone(), dir.path());

        assert!(p.synthesize_within("text", Duration::from_secs(3600)).is_none());
        assert_eq!(synth.calls(), 3);
        assert_eq!(sleeper.durations().len(), 2);
    }

    #[test]
    fn http_synthesizer_requires_key() {
        assert!(matches!(
            HttpSpeechSynthesizer::new("http://127.0.0.1:9/tts", ""),
            Err(CollaboratorError::NotConfigured(_))
        ));
    }

    #[test]
    fn envelope_with_base64_audio_decodes() {
        let synth = HttpSpeechSynthesizer::new("http://127.0.0.1:9/tts", "key").unwrap();
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"PCM");
        let body = format!(r#"{{"output":{{"audio":{{"data":"{encoded}"}}}}}}"#);
        let req = SpeechRequest {
            text: "t".into(),
            voice: DEFAULT_VOICE.into(),
            format: DEFAULT_FORMAT.into(),
            timeout: Duration::from_secs(1),
        };
        assert_eq!(synth.decode_envelope(body.as_bytes(), &req).unwrap(), b"PCM");

        let empty = br#"{"output":{"audio":{}}}"#;
        assert!(matches!(
            synth.decode_envelope(empty, &req),
            Err(CollaboratorError::EmptyResponse)
        ));
    }
}
