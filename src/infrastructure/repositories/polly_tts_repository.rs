use super::tts_repository::{TtsRepository, TtsRepositoryError};
use async_trait::async_trait;
use aws_sdk_polly::{
    config::{http::HttpResponse, retry::RetryConfig},
    error::SdkError,
    types::{Engine, OutputFormat, VoiceId},
    Client as PollyClient,
};
use std::sync::Arc;

/// AWS Polly implementation of TTS repository
pub struct PollyTtsRepository {
    polly_client: Arc<PollyClient>,
    engine: Engine,
}

impl PollyTtsRepository {
    pub fn new(polly_client: Arc<PollyClient>, engine: &str) -> Self {
        Self {
            polly_client,
            engine: Engine::from(engine),
        }
    }

    /// Client for `sdk_config` with SDK retries off; the generator owns the
    /// attempt budget
    pub fn client(sdk_config: &aws_config::SdkConfig) -> PollyClient {
        let config = aws_sdk_polly::config::Builder::from(sdk_config)
            .retry_config(RetryConfig::disabled())
            .build();
        PollyClient::from_conf(config)
    }

    /// Map an SDK failure onto the retry classes the generator understands
    fn classify<E>(err: &SdkError<E, HttpResponse>) -> TtsRepositoryError
    where
        E: std::error::Error + 'static,
    {
        match err {
            SdkError::DispatchFailure(_) => TtsRepositoryError::Unavailable(format!("{:?}", err)),
            SdkError::TimeoutError(_) | SdkError::ResponseError(_) => {
                TtsRepositoryError::Transient(format!("{:?}", err))
            }
            SdkError::ServiceError(context) => {
                let message = context.err().to_string();
                if is_retryable_status(Some(context.raw().status().as_u16())) {
                    TtsRepositoryError::Transient(message)
                } else {
                    TtsRepositoryError::Rejected(message)
                }
            }
            _ => TtsRepositoryError::Transient(format!("{:?}", err)),
        }
    }
}

fn is_retryable_status(status: Option<u16>) -> bool {
    match status {
        Some(code) => code == 429 || code >= 500,
        None => true,
    }
}

#[async_trait]
impl TtsRepository for PollyTtsRepository {
    fn provider(&self) -> &'static str {
        "polly"
    }

    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, TtsRepositoryError> {
        let start_time = std::time::Instant::now();
        let voice_id = VoiceId::from(voice);

        tracing::debug!(
            voice = voice,
            engine = ?self.engine,
            text_length = text.len(),
            "Calling AWS Polly synthesize_speech"
        );

        let result = self
            .polly_client
            .synthesize_speech()
            .text(text)
            .voice_id(voice_id)
            .output_format(OutputFormat::Mp3)
            .engine(self.engine.clone())
            .send()
            .await
            .map_err(|e| {
                let classified = Self::classify(&e);
                tracing::warn!(
                    error = %classified,
                    voice = voice,
                    text_length = text.len(),
                    "AWS Polly synthesize_speech failed"
                );
                classified
            })?;

        let audio_stream = result.audio_stream.collect().await.map_err(|e| {
            tracing::warn!(error = %e, "Failed to collect audio stream from Polly response");
            TtsRepositoryError::Transient(format!("Failed to read audio stream: {}", e))
        })?;

        let audio_bytes = audio_stream.into_bytes().to_vec();

        tracing::debug!(
            provider = "polly",
            latency_ms = start_time.elapsed().as_millis(),
            audio_size_bytes = audio_bytes.len(),
            "TTS synthesis completed"
        );

        Ok(audio_bytes)
    }

    async fn check_available(&self) -> Result<(), TtsRepositoryError> {
        self.polly_client
            .describe_voices()
            .send()
            .await
            .map(|_| ())
            .map_err(|e| match Self::classify(&e) {
                TtsRepositoryError::Transient(msg) | TtsRepositoryError::Rejected(msg) => {
                    TtsRepositoryError::Unavailable(msg)
                }
                unavailable => unavailable,
            })
    }
}
