use super::error::AudioServiceError;
use crate::domain::canonical::CanonicalIdentity;
use crate::infrastructure::repositories::{LocalAudioCache, TtsRepository, TtsRepositoryError};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    /// Upper bound for a single TTS call
    pub timeout: Duration,
    /// Additional attempts after the first one
    pub max_retries: u32,
    /// Delay before the first retry; doubles per retry
    pub backoff_initial: Duration,
    pub backoff_max: Duration,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 2,
            backoff_initial: Duration::from_millis(500),
            backoff_max: Duration::from_secs(4),
        }
    }
}

impl GeneratorSettings {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Delay after failed attempt number `attempt` (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.backoff_initial
            .saturating_mul(factor)
            .min(self.backoff_max)
    }
}

/// Turns a canonical identity into a cached MP3 file
pub struct AudioGenerator {
    tts: Arc<dyn TtsRepository>,
    cache: Arc<LocalAudioCache>,
    settings: GeneratorSettings,
}

impl AudioGenerator {
    pub fn new(
        tts: Arc<dyn TtsRepository>,
        cache: Arc<LocalAudioCache>,
        settings: GeneratorSettings,
    ) -> Self {
        Self {
            tts,
            cache,
            settings,
        }
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    pub fn provider(&self) -> &'static str {
        self.tts.provider()
    }

    /// Probe the TTS backend without synthesizing anything
    pub async fn check_available(&self) -> Result<(), AudioServiceError> {
        let probe = self.tts.check_available();
        match tokio::time::timeout(self.settings.timeout, probe).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(AudioServiceError::CapabilityUnavailable(format!(
                "{}: {}",
                self.tts.provider(),
                e
            ))),
            Err(_) => Err(AudioServiceError::CapabilityUnavailable(format!(
                "{}: availability probe timed out",
                self.tts.provider()
            ))),
        }
    }

    /// Synthesize `identity.tts_rendering` and store it under its hash.
    ///
    /// Callers must only invoke this when the local file is known to be
    /// absent; an existing file is never overwritten on purpose.
    pub async fn generate(
        &self,
        identity: &CanonicalIdentity,
        voice: &str,
    ) -> Result<PathBuf, AudioServiceError> {
        if identity.tts_rendering != identity.raw_text {
            tracing::debug!(
                raw = %identity.raw_text,
                rendering = %identity.tts_rendering,
                "Text formatted for TTS"
            );
        }

        let audio = self.synthesize_with_retry(identity, voice).await?;
        let path = self
            .cache
            .write_atomic(&identity.content_hash, &audio)
            .await?;

        tracing::info!(
            content_hash = %identity.content_hash,
            path = %path.display(),
            size_bytes = audio.len(),
            "Audio generated"
        );

        Ok(path)
    }

    async fn synthesize_with_retry(
        &self,
        identity: &CanonicalIdentity,
        voice: &str,
    ) -> Result<Vec<u8>, AudioServiceError> {
        let max_attempts = self.settings.max_attempts();
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match self.attempt(&identity.tts_rendering, voice).await {
                Ok(audio) => return Ok(audio),
                Err(AudioServiceError::TransientGeneration(reason)) => {
                    tracing::warn!(
                        content_hash = %identity.content_hash,
                        attempt,
                        max_attempts,
                        error = %reason,
                        "Audio generation attempt failed"
                    );
                    last_error = reason;
                }
                Err(terminal) => return Err(terminal),
            }

            if attempt < max_attempts {
                tokio::time::sleep(self.settings.backoff_for(attempt)).await;
            }
        }

        tracing::error!(
            content_hash = %identity.content_hash,
            attempts = max_attempts,
            error = %last_error,
            "Audio generation failed"
        );

        Err(AudioServiceError::GenerationFailed {
            attempts: max_attempts,
            reason: last_error,
        })
    }

    /// One bounded TTS call, classified for the retry loop
    async fn attempt(&self, text: &str, voice: &str) -> Result<Vec<u8>, AudioServiceError> {
        let call = self.tts.synthesize(text, voice);

        match tokio::time::timeout(self.settings.timeout, call).await {
            Err(_) => Err(AudioServiceError::TransientGeneration(format!(
                "timed out after {}s",
                self.settings.timeout.as_secs_f64()
            ))),
            Ok(Ok(audio)) if audio.is_empty() => Err(AudioServiceError::TransientGeneration(
                "TTS returned an empty audio stream".to_string(),
            )),
            Ok(Ok(audio)) => Ok(audio),
            Ok(Err(TtsRepositoryError::Transient(msg))) => {
                Err(AudioServiceError::TransientGeneration(msg))
            }
            Ok(Err(TtsRepositoryError::Unavailable(msg))) => {
                Err(AudioServiceError::CapabilityUnavailable(msg))
            }
            Ok(Err(TtsRepositoryError::Rejected(msg))) => {
                Err(AudioServiceError::GenerationFailed {
                    attempts: 1,
                    reason: msg,
                })
            }
        }
    }
}
