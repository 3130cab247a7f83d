use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    pub log_format: LogFormat,
    // Text-to-speech
    pub tts_provider: TtsProvider,
    pub aws_region: String,
    pub polly_engine: String,
    pub openai_api_key: Option<String>,
    pub openai_tts_model: String,
    pub default_voice: String,
    pub tts_timeout_seconds: u64,
    pub tts_max_retries: u32,
    pub tts_retry_backoff_ms: u64,
    pub tts_retry_backoff_max_ms: u64,
    // Storage
    pub audio_output_dir: PathBuf,
    pub object_key_prefix: String,
    pub primary_store: StoreConfig,
    pub mirror_store: StoreConfig,
    pub upload_max_retries: u32,
    // Worker pools
    pub check_concurrency: usize,
    pub generation_concurrency: usize,
    pub primary_upload_concurrency: usize,
    pub mirror_upload_concurrency: usize,
}

/// Connection settings of one S3-compatible bucket
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub bucket: String,
    pub endpoint_url: Option<String>,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum TtsProvider {
    Polly,
    OpenAi,
}

impl TtsProvider {
    pub fn default_voice(&self) -> &'static str {
        match self {
            TtsProvider::Polly => "Joanna",
            TtsProvider::OpenAi => "alloy",
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let tts_provider = match optional("TTS_PROVIDER")
            .unwrap_or_else(|| "polly".to_string())
            .to_lowercase()
            .as_str()
        {
            "polly" => TtsProvider::Polly,
            "openai" => TtsProvider::OpenAi,
            other => {
                return Err(ConfigError::Invalid {
                    key: "TTS_PROVIDER",
                    value: other.to_string(),
                })
            }
        };

        let openai_api_key = optional("OPENAI_API_KEY");
        if tts_provider == TtsProvider::OpenAi && openai_api_key.is_none() {
            return Err(ConfigError::Missing("OPENAI_API_KEY"));
        }

        let config = Config {
            host: optional("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or("PORT", 8080)?,
            environment: match optional("ENVIRONMENT").as_deref() {
                Some("production") => Environment::Production,
                _ => Environment::Development,
            },
            log_format: match optional("LOG_FORMAT").as_deref() {
                Some("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            tts_provider,
            aws_region: optional("AWS_REGION").unwrap_or_else(|| "eu-west-1".to_string()),
            polly_engine: optional("POLLY_ENGINE").unwrap_or_else(|| "neural".to_string()),
            openai_api_key,
            openai_tts_model: optional("OPENAI_TTS_MODEL").unwrap_or_else(|| "tts-1".to_string()),
            default_voice: optional("DEFAULT_VOICE")
                .unwrap_or_else(|| tts_provider.default_voice().to_string()),
            tts_timeout_seconds: parse_or("TTS_TIMEOUT_SECONDS", 30)?,
            tts_max_retries: parse_or("TTS_MAX_RETRIES", 2)?,
            tts_retry_backoff_ms: parse_or("TTS_RETRY_BACKOFF_MS", 500)?,
            tts_retry_backoff_max_ms: parse_or("TTS_RETRY_BACKOFF_MAX_MS", 4000)?,
            audio_output_dir: optional("AUDIO_OUTPUT_DIR")
                .unwrap_or_else(|| "audio/sentences".to_string())
                .into(),
            object_key_prefix: optional("OBJECT_KEY_PREFIX")
                .unwrap_or_else(|| "audio/sentences".to_string()),
            primary_store: StoreConfig::from_env("PRIMARY")?,
            mirror_store: StoreConfig::from_env("MIRROR")?,
            upload_max_retries: parse_or("UPLOAD_MAX_RETRIES", 0)?,
            check_concurrency: parse_or("CHECK_CONCURRENCY", 4)?,
            generation_concurrency: parse_or("GENERATION_CONCURRENCY", 3)?,
            primary_upload_concurrency: parse_or("PRIMARY_UPLOAD_CONCURRENCY", 2)?,
            mirror_upload_concurrency: parse_or("MIRROR_UPLOAD_CONCURRENCY", 3)?,
        };

        Ok(config)
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}

impl StoreConfig {
    /// Read `{prefix}_BUCKET`, `{prefix}_ENDPOINT_URL` and friends
    fn from_env(prefix: &'static str) -> Result<Self, ConfigError> {
        let key = |suffix: &str| format!("{}_{}", prefix, suffix);

        Ok(StoreConfig {
            bucket: optional(&key("BUCKET")).unwrap_or_default(),
            endpoint_url: optional(&key("ENDPOINT_URL")),
            access_key_id: optional(&key("ACCESS_KEY_ID")).unwrap_or_default(),
            secret_access_key: optional(&key("SECRET_ACCESS_KEY")).unwrap_or_default(),
            region: optional(&key("REGION")).unwrap_or_else(|| "auto".to_string()),
        })
    }
}

/// Unset and empty variables are both treated as absent
fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}
