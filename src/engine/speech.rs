use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::engine::llm_client::BackendError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeechRequest {
    pub text_input: String,
    pub character_voice_gen: String,
    pub output_file_name: String,
    pub text_filtering: String,
    pub narrator_enabled: String,
    pub output_file_timestamp: String,
    pub autoplay: String,
}

#[derive(Debug, Deserialize)]
struct SpeechStatus {
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VoicesResponse {
    #[serde(default)]
    voices: Vec<String>,
}

/// The speech-synthesis service.
pub trait SpeechBackend {
    fn voices(&self) -> Result<Vec<String>, BackendError>;

    fn synthesize(&self, request: &SpeechRequest) -> Result<(), BackendError>;
}

/// AllTalk TTS over blocking HTTP.
pub struct AllTalkBackend {
    client: Client,
    base_url: String,
}

impl AllTalkBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

impl SpeechBackend for AllTalkBackend {
    fn voices(&self) -> Result<Vec<String>, BackendError> {
        let resp: VoicesResponse = self
            .client
            .get(format!("{}/api/voices", self.base_url))
            .send()?
            .error_for_status()?
            .json()?;
        Ok(resp.voices)
    }

    fn synthesize(&self, request: &SpeechRequest) -> Result<(), BackendError> {
        let status: SpeechStatus = self
            .client
            .post(format!("{}/api/tts-generate", self.base_url))
            .form(request)
            .send()?
            .error_for_status()?
            .json()?;

        match status.status {
            Some(s) if !s.to_lowercase().contains("success") => Err(BackendError::Malformed(
                format!("speech generation reported '{s}'"),
            )),
            _ => Ok(()),
        }
    }
}

/// What became of a narration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechOutcome {
    Audio(String),
    /// Nothing to say, or audio is off for this session.
    Skipped,
    Failed,
    /// The service could not be reached; the caller should stop trying.
    Unreachable,
}

impl SpeechOutcome {
    pub fn audio_url(&self) -> Option<String> {
        match self {
            SpeechOutcome::Audio(url) => Some(url.clone()),
            _ => None,
        }
    }
}

pub struct SpeechRequester<S> {
    backend: S,
    audio_base_url: String,
    counter: AtomicU64,
}

impl<S: SpeechBackend> SpeechRequester<S> {
    pub fn new(backend: S, audio_base_url: impl Into<String>) -> Self {
        Self {
            backend,
            audio_base_url: audio_base_url.into().trim_end_matches('/').to_string(),
            counter: AtomicU64::new(0),
        }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Installed voices; empty when the service is down.
    pub fn voices(&self) -> Vec<String> {
        self.backend.voices().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not list voices");
            Vec::new()
        })
    }

    /// Best effort: every failure degrades to an outcome, never an error.
    pub fn speak(&self, text: &str, voice: &str) -> SpeechOutcome {
        if text.trim().is_empty() {
            return SpeechOutcome::Skipped;
        }

        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let file_name = format!("narration_{n}");
        let request = SpeechRequest {
            text_input: text.to_string(),
            character_voice_gen: voice.to_string(),
            output_file_name: file_name.clone(),
            text_filtering: "none".into(),
            narrator_enabled: "false".into(),
            output_file_timestamp: "false".into(),
            autoplay: "false".into(),
        };

        match self.backend.synthesize(&request) {
            Ok(()) => SpeechOutcome::Audio(format!("{}/{}.wav", self.audio_base_url, file_name)),
            Err(BackendError::Connection(e)) => {
                tracing::error!(error = %e, "speech service unreachable");
                SpeechOutcome::Unreachable
            }
            Err(BackendError::Timeout) => {
                tracing::warn!("speech request timed out");
                SpeechOutcome::Failed
            }
            Err(e) => {
                tracing::error!(error = %e, "speech generation failed");
                SpeechOutcome::Failed
            }
        }
    }
}
