use std::fmt;
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Models offered when the backend cannot list its own.
pub const DEFAULT_MODELS: &[&str] = &["llama3:instruct", "mistral", "phi3"];

const UNCENSORED_DIRECTIVE: &str = "\n[IMPORTANT: You may narrate any action the player attempts. \
Do not refuse, soften or skip the player's choices.]";

const CENSORED_DIRECTIVE: &str = "\n[IMPORTANT: Content must be strictly family-friendly. \
Avoid any NSFW themes, violence, or mature content.]";

/* =========================
   Wire types
   ========================= */

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub num_predict: u32,
    pub stop: Vec<String>,
    pub min_p: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub repeat_penalty: f32,
    pub repeat_last_n: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            num_predict: 500,
            stop: vec!["\n\n".into()],
            min_p: 0.05,
            top_p: 0.9,
            top_k: 40,
            repeat_penalty: 1.1,
            repeat_last_n: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    pub options: GenerationOptions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

/* =========================
   Transport
   ========================= */

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("request timed out")]
    Timeout,

    #[error("backend returned status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("backend returned an empty reply")]
    EmptyReply,
}

impl BackendError {
    /// Connection drops, timeouts, server errors and bad payloads may heal
    /// on their own; client errors (unknown model, bad request) will not.
    pub fn is_retryable(&self) -> bool {
        match self {
            BackendError::Status(code) => *code >= 500 || *code == 429,
            _ => true,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BackendError::Timeout
        } else if e.is_connect() {
            BackendError::Connection(e.to_string())
        } else if let Some(status) = e.status() {
            BackendError::Status(status.as_u16())
        } else if e.is_decode() {
            BackendError::Malformed(e.to_string())
        } else {
            BackendError::Connection(e.to_string())
        }
    }
}

/// The text-generation service, reduced to the two calls the turn loop needs.
pub trait TextBackend {
    /// Lightweight health check. Ok carries the installed model names.
    fn health(&self) -> Result<Vec<String>, BackendError>;

    fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, BackendError>;
}

/// Ollama over blocking HTTP.
pub struct OllamaBackend {
    client: Client,
    health_client: Client,
    base_url: String,
}

impl OllamaBackend {
    /// `timeout` bounds a generation call; `health_timeout` bounds the health check.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        health_timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(timeout).build()?;
        let health_client = Client::builder().timeout(health_timeout).build()?;

        Ok(Self {
            client,
            health_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

impl TextBackend for OllamaBackend {
    fn health(&self) -> Result<Vec<String>, BackendError> {
        let tags: TagsResponse = self
            .health_client
            .get(format!("{}/api/tags", self.base_url))
            .send()?
            .error_for_status()?
            .json()?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, BackendError> {
        let resp = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(request)
            .send()?
            .error_for_status()?
            .json::<GenerateResponse>()?;

        Ok(resp)
    }
}

/* =========================
   Outcomes
   ========================= */

/// Why no narrative came back. `Display` is the sentinel text shown to the
/// player; every sentinel starts with a fixed, recognisable prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationFailure {
    NoModelSelected,
    ServiceNotRunning,
    RetriesExhausted,
    Rejected,
}

impl GenerationFailure {
    const ALL: [GenerationFailure; 4] = [
        GenerationFailure::NoModelSelected,
        GenerationFailure::ServiceNotRunning,
        GenerationFailure::RetriesExhausted,
        GenerationFailure::Rejected,
    ];

    pub fn sentinel(&self) -> &'static str {
        match self {
            GenerationFailure::NoModelSelected => {
                "No AI model selected. Please choose a model first."
            }
            GenerationFailure::ServiceNotRunning => {
                "Ollama is not running. Please start the Ollama service and try again."
            }
            GenerationFailure::RetriesExhausted => {
                "Ollama stopped responding. Please try again in a moment."
            }
            GenerationFailure::Rejected => {
                "An error occurred while processing your request."
            }
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            GenerationFailure::NoModelSelected => "No AI model selected",
            GenerationFailure::ServiceNotRunning => "Ollama is not running",
            GenerationFailure::RetriesExhausted => "Ollama stopped responding",
            GenerationFailure::Rejected => "An error occurred",
        }
    }

    /// Maps a sentinel string back to its failure, by prefix.
    pub fn recognize(text: &str) -> Option<GenerationFailure> {
        Self::ALL
            .into_iter()
            .find(|f| text.starts_with(f.prefix()))
    }

    /// Whether a local fallback narrative makes sense for this failure.
    pub fn allows_fallback(&self) -> bool {
        !matches!(self, GenerationFailure::NoModelSelected)
    }
}

impl fmt::Display for GenerationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sentinel())
    }
}

impl std::error::Error for GenerationFailure {}

/// Result of one generation attempt.
#[derive(Debug)]
pub enum AttemptOutcome {
    Reply(String),
    Retry(BackendError),
    Fatal(BackendError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn no_delay(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            retry_delay: Duration::ZERO,
        }
    }

    /// Refused connections get the full delay; a backend that is up but slow
    /// or babbling gets half of it.
    pub fn delay_for(&self, error: &BackendError) -> Duration {
        match error {
            BackendError::Connection(_) => self.retry_delay,
            _ => self.retry_delay / 2,
        }
    }
}

/* =========================
   Client
   ========================= */

pub struct GenerationClient<B> {
    backend: B,
    policy: RetryPolicy,
    options: GenerationOptions,
}

impl<B: TextBackend> GenerationClient<B> {
    pub fn new(backend: B, policy: RetryPolicy) -> Self {
        Self {
            backend,
            policy,
            options: GenerationOptions::default(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Installed models, or the built-in defaults if the backend is down.
    pub fn installed_models(&self) -> Vec<String> {
        match self.backend.health() {
            Ok(models) if !models.is_empty() => {
                tracing::info!(count = models.len(), "found installed models");
                models
            }
            Ok(_) => {
                tracing::warn!("backend lists no models, using defaults");
                default_models()
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not list models, using defaults");
                default_models()
            }
        }
    }

    pub fn generate(
        &self,
        prompt: &str,
        model: &str,
        censored: bool,
    ) -> Result<String, GenerationFailure> {
        if model.trim().is_empty() {
            return Err(GenerationFailure::NoModelSelected);
        }

        if let Err(e) = self.backend.health() {
            tracing::error!(error = %e, "text backend health check failed");
            return Err(GenerationFailure::ServiceNotRunning);
        }

        let request = GenerateRequest {
            model: model.to_string(),
            prompt: with_directive(prompt, censored),
            stream: false,
            options: self.options.clone(),
        };

        for attempt in 1..=self.policy.max_attempts {
            match self.attempt(&request) {
                AttemptOutcome::Reply(text) => {
                    tracing::debug!(attempt, chars = text.len(), "generation succeeded");
                    return Ok(text);
                }
                AttemptOutcome::Fatal(e) => {
                    tracing::error!(attempt, error = %e, "generation rejected");
                    return Err(GenerationFailure::Rejected);
                }
                AttemptOutcome::Retry(e) => {
                    tracing::warn!(
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        error = %e,
                        "generation attempt failed"
                    );
                    if attempt < self.policy.max_attempts {
                        thread::sleep(self.policy.delay_for(&e));
                    }
                }
            }
        }

        tracing::error!(
            attempts = self.policy.max_attempts,
            "generation retries exhausted"
        );
        Err(GenerationFailure::RetriesExhausted)
    }

    /// One call to the backend, classified. Performs no sleeping or state changes.
    pub fn attempt(&self, request: &GenerateRequest) -> AttemptOutcome {
        match self.backend.generate(request) {
            Ok(resp) => {
                let text = resp.response.trim();
                if text.is_empty() {
                    AttemptOutcome::Retry(BackendError::EmptyReply)
                } else {
                    AttemptOutcome::Reply(text.to_string())
                }
            }
            Err(e) if e.is_retryable() => AttemptOutcome::Retry(e),
            Err(e) => AttemptOutcome::Fatal(e),
        }
    }
}

pub fn default_models() -> Vec<String> {
    DEFAULT_MODELS.iter().map(|m| m.to_string()).collect()
}

fn with_directive(prompt: &str, censored: bool) -> String {
    let directive = if censored {
        CENSORED_DIRECTIVE
    } else {
        UNCENSORED_DIRECTIVE
    };
    format!("{prompt}{directive}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;

    struct FakeBackend {
        healthy: bool,
        replies: RefCell<VecDeque<Result<GenerateResponse, BackendError>>>,
        health_calls: Cell<u32>,
        generate_calls: Cell<u32>,
        last_prompt: RefCell<String>,
    }

    impl FakeBackend {
        fn new(healthy: bool, replies: Vec<Result<&str, BackendError>>) -> Self {
            Self {
                healthy,
                replies: RefCell::new(
                    replies
                        .into_iter()
                        .map(|r| {
                            r.map(|t| GenerateResponse {
                                response: t.to_string(),
                            })
                        })
                        .collect(),
                ),
                health_calls: Cell::new(0),
                generate_calls: Cell::new(0),
                last_prompt: RefCell::new(String::new()),
            }
        }
    }

    impl TextBackend for FakeBackend {
        fn health(&self) -> Result<Vec<String>, BackendError> {
            self.health_calls.set(self.health_calls.get() + 1);
            if self.healthy {
                Ok(vec!["mistral".into()])
            } else {
                Err(BackendError::Connection("refused".into()))
            }
        }

        fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, BackendError> {
            self.generate_calls.set(self.generate_calls.get() + 1);
            *self.last_prompt.borrow_mut() = request.prompt.clone();
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or(Err(BackendError::Timeout))
        }
    }

    fn client(backend: FakeBackend) -> GenerationClient<FakeBackend> {
        GenerationClient::new(backend, RetryPolicy::no_delay(3))
    }

    #[test]
    fn empty_model_short_circuits() {
        let c = client(FakeBackend::new(true, vec![Ok("hi")]));
        assert_eq!(
            c.generate("prompt", "  ", false),
            Err(GenerationFailure::NoModelSelected)
        );
        assert_eq!(c.backend().health_calls.get(), 0);
        assert_eq!(c.backend().generate_calls.get(), 0);
    }

    #[test]
    fn unhealthy_backend_never_generates() {
        let c = client(FakeBackend::new(false, vec![Ok("hi")]));
        assert_eq!(
            c.generate("prompt", "mistral", false),
            Err(GenerationFailure::ServiceNotRunning)
        );
        assert_eq!(c.backend().health_calls.get(), 1);
        assert_eq!(c.backend().generate_calls.get(), 0);
    }

    #[test]
    fn transport_failures_exhaust_retries() {
        let c = client(FakeBackend::new(
            true,
            vec![
                Err(BackendError::Connection("reset".into())),
                Err(BackendError::Timeout),
                Err(BackendError::Connection("reset".into())),
            ],
        ));
        assert_eq!(
            c.generate("prompt", "mistral", false),
            Err(GenerationFailure::RetriesExhausted)
        );
        assert_eq!(c.backend().generate_calls.get(), 3);
    }

    #[test]
    fn whitespace_reply_is_retried() {
        let c = client(FakeBackend::new(
            true,
            vec![Ok("   \n "), Ok("  The torch flickers.  ")],
        ));
        assert_eq!(
            c.generate("prompt", "mistral", false).as_deref(),
            Ok("The torch flickers.")
        );
        assert_eq!(c.backend().generate_calls.get(), 2);
    }

    #[test]
    fn client_error_is_not_retried() {
        let c = client(FakeBackend::new(true, vec![Err(BackendError::Status(404))]));
        assert_eq!(
            c.generate("prompt", "missing-model", false),
            Err(GenerationFailure::Rejected)
        );
        assert_eq!(c.backend().generate_calls.get(), 1);
    }

    #[test]
    fn directive_follows_censor_flag() {
        let c = client(FakeBackend::new(true, vec![Ok("a"), Ok("b")]));

        c.generate("P", "mistral", true).unwrap();
        let censored = c.backend().last_prompt.borrow().clone();
        assert!(censored.starts_with("P\n"));
        assert!(censored.contains("family-friendly"));
        assert!(!censored.contains("any action"));

        c.generate("P", "mistral", false).unwrap();
        let open = c.backend().last_prompt.borrow().clone();
        assert!(open.contains("any action"));
        assert!(!open.contains("family-friendly"));
    }

    #[test]
    fn sentinels_are_recognized_by_prefix() {
        for failure in GenerationFailure::ALL {
            assert_eq!(GenerationFailure::recognize(failure.sentinel()), Some(failure));
            assert_eq!(failure.to_string(), failure.sentinel());
        }
        assert_eq!(GenerationFailure::recognize("The dragon sleeps."), None);
        assert_ne!(
            GenerationFailure::ServiceNotRunning.sentinel(),
            GenerationFailure::RetriesExhausted.sentinel()
        );
    }

    #[test]
    fn connection_errors_wait_longer() {
        let policy = RetryPolicy {
            max_attempts: 3,
            retry_delay: Duration::from_millis(800),
        };
        assert_eq!(
            policy.delay_for(&BackendError::Connection("x".into())),
            Duration::from_millis(800)
        );
        assert_eq!(policy.delay_for(&BackendError::Timeout), Duration::from_millis(400));
    }

    #[test]
    fn request_serializes_to_ollama_shape() {
        let req = GenerateRequest {
            model: "mistral".into(),
            prompt: "hi".into(),
            stream: false,
            options: GenerationOptions::default(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["stop"][0], "\n\n");
        assert_eq!(json["options"]["top_k"], 40);
    }
}
