use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::engine::llm_client::RetryPolicy;

/// Runtime settings for the backends and local files.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub ollama_url: String,
    pub alltalk_url: String,
    pub alltalk_audio_url: String,
    pub default_voice: String,

    pub banwords_path: PathBuf,
    pub save_path: PathBuf,

    pub generation_timeout: Duration,
    pub health_timeout: Duration,
    pub speech_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".into(),
            alltalk_url: "http://localhost:7851".into(),
            alltalk_audio_url: "http://localhost:7851/audio".into(),
            default_voice: "FemaleBritishAccent_WhyLucyWhy_Voice_2.wav".into(),
            banwords_path: PathBuf::from("banwords.txt"),
            save_path: PathBuf::from("adventure.txt"),
            generation_timeout: Duration::from_secs(120),
            health_timeout: Duration::from_secs(5),
            speech_timeout: Duration::from_secs(5),
            retry: RetryPolicy::default(),
        }
    }
}

impl AppConfig {
    /// Reads overrides from the environment. Call `dotenvy::dotenv()` first
    /// if a `.env` file should be honoured.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            ollama_url: string_var("OLLAMA_URL", defaults.ollama_url),
            alltalk_url: string_var("ALLTALK_URL", defaults.alltalk_url),
            alltalk_audio_url: string_var("ALLTALK_AUDIO_URL", defaults.alltalk_audio_url),
            default_voice: string_var("ALLTALK_VOICE", defaults.default_voice),
            banwords_path: env::var("BANWORDS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.banwords_path),
            save_path: env::var("ADVENTURE_SAVE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.save_path),
            generation_timeout: Duration::from_secs(parsed_var(
                "GENERATION_TIMEOUT_SECS",
                defaults.generation_timeout.as_secs(),
            )),
            health_timeout: Duration::from_secs(parsed_var(
                "HEALTH_TIMEOUT_SECS",
                defaults.health_timeout.as_secs(),
            )),
            speech_timeout: Duration::from_secs(parsed_var(
                "SPEECH_TIMEOUT_SECS",
                defaults.speech_timeout.as_secs(),
            )),
            retry: RetryPolicy {
                max_attempts: parsed_var("GENERATION_MAX_ATTEMPTS", defaults.retry.max_attempts)
                    .max(1),
                retry_delay: Duration::from_millis(parsed_var(
                    "GENERATION_RETRY_DELAY_MS",
                    defaults.retry.retry_delay.as_millis() as u64,
                )),
            },
        }
    }
}

fn string_var(key: &str, default: String) -> String {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => v.trim().trim_end_matches('/').to_string(),
        _ => default,
    }
}

fn parsed_var<T: FromStr + Copy>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(key, value = %raw, "ignoring unparseable setting");
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_services() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.ollama_url, "http://localhost:11434");
        assert_eq!(cfg.retry.max_attempts, 3);
        assert_eq!(cfg.generation_timeout, Duration::from_secs(120));
        assert_eq!(cfg.health_timeout, Duration::from_secs(5));
    }

    #[test]
    fn health_timeout_is_read_from_env() {
        env::set_var("HEALTH_TIMEOUT_SECS", "9");
        let cfg = AppConfig::from_env();
        env::remove_var("HEALTH_TIMEOUT_SECS");

        assert_eq!(cfg.health_timeout, Duration::from_secs(9));
        assert_eq!(cfg.speech_timeout, Duration::from_secs(5));
    }

    #[test]
    fn unparseable_number_uses_default() {
        env::set_var("RPG_ADVENTURE_TEST_NUMBER", "lots");
        assert_eq!(parsed_var("RPG_ADVENTURE_TEST_NUMBER", 7u32), 7);
        env::set_var("RPG_ADVENTURE_TEST_NUMBER", " 12 ");
        assert_eq!(parsed_var("RPG_ADVENTURE_TEST_NUMBER", 7u32), 12);
        env::remove_var("RPG_ADVENTURE_TEST_NUMBER");
    }
}
