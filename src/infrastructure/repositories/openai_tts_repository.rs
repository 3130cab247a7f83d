use super::tts_repository::{TtsRepository, TtsRepositoryError};
use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{CreateSpeechRequest, SpeechModel, Voice},
    Client,
};
use async_trait::async_trait;
use std::sync::Arc;

/// OpenAI TTS implementation of TTS repository
pub struct OpenAiTtsRepository {
    client: Arc<Client<OpenAIConfig>>,
    model: String,
}

impl OpenAiTtsRepository {
    pub fn new(client: Arc<Client<OpenAIConfig>>, model: String) -> Self {
        Self { client, model }
    }

    fn speech_model(&self) -> SpeechModel {
        match self.model.as_str() {
            "tts-1" => SpeechModel::Tts1,
            "tts-1-hd" => SpeechModel::Tts1Hd,
            other => SpeechModel::Other(other.to_string()),
        }
    }

    fn classify(err: &OpenAIError) -> TtsRepositoryError {
        match err {
            OpenAIError::Reqwest(e) if e.is_connect() => {
                TtsRepositoryError::Unavailable(e.to_string())
            }
            OpenAIError::Reqwest(e) => TtsRepositoryError::Transient(e.to_string()),
            OpenAIError::ApiError(api) if api.r#type.as_deref() == Some("invalid_request_error") => {
                TtsRepositoryError::Rejected(api.message.clone())
            }
            OpenAIError::ApiError(api) => TtsRepositoryError::Transient(api.message.clone()),
            other => TtsRepositoryError::Rejected(other.to_string()),
        }
    }
}

/// Parse a voice name; unknown names fall back to `alloy`
fn parse_voice(voice: &str) -> Voice {
    match voice.to_lowercase().as_str() {
        "echo" => Voice::Echo,
        "fable" => Voice::Fable,
        "onyx" => Voice::Onyx,
        "nova" => Voice::Nova,
        "shimmer" => Voice::Shimmer,
        _ => Voice::Alloy,
    }
}

#[async_trait]
impl TtsRepository for OpenAiTtsRepository {
    fn provider(&self) -> &'static str {
        "openai"
    }

    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, TtsRepositoryError> {
        let start_time = std::time::Instant::now();

        tracing::debug!(
            model = %self.model,
            voice = voice,
            text_length = text.len(),
            "Calling OpenAI TTS API"
        );

        let request = CreateSpeechRequest {
            model: self.speech_model(),
            input: text.to_string(),
            voice: parse_voice(voice),
            response_format: None, // Defaults to MP3
            speed: None,
        };

        let response = self.client.audio().speech(request).await.map_err(|e| {
            let classified = Self::classify(&e);
            tracing::warn!(
                error = %classified,
                model = %self.model,
                voice = voice,
                text_length = text.len(),
                "OpenAI TTS API call failed"
            );
            classified
        })?;

        let audio_bytes = response.bytes.to_vec();

        tracing::debug!(
            provider = "openai",
            latency_ms = start_time.elapsed().as_millis(),
            audio_size_bytes = audio_bytes.len(),
            "TTS synthesis completed"
        );

        Ok(audio_bytes)
    }

    async fn check_available(&self) -> Result<(), TtsRepositoryError> {
        self.client
            .models()
            .list()
            .await
            .map(|_| ())
            .map_err(|e| TtsRepositoryError::Unavailable(e.to_string()))
    }
}
