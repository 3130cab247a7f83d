use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    Json,
};
use std::sync::Arc;

use crate::{
    domain::audio::{
        CanonicalizeRequest, CanonicalizeResponse, PhraseAudioRequest, PhraseAudioResponse,
        PhraseAudioService, PhraseAudioServiceApi, SentenceAudioRequest, SentenceAudioResponse,
        AUDIO_CONTENT_TYPE,
    },
    error::{AppError, AppResult},
};

const MAX_TEXT_CHARS: usize = 2_000;
const MAX_SENTENCES: usize = 500;

pub struct PhraseAudioController {
    service: Arc<PhraseAudioService>,
}

impl PhraseAudioController {
    pub fn new(service: Arc<PhraseAudioService>) -> Self {
        Self { service }
    }

    /// POST /api/audio/phrase - ensure audio exists locally and on both stores
    pub async fn generate_phrase_audio(
        State(controller): State<Arc<PhraseAudioController>>,
        Json(request): Json<PhraseAudioRequest>,
    ) -> AppResult<Json<PhraseAudioResponse>> {
        guard_length(&request.text)?;

        let response = controller.service.generate_phrase_audio(request).await?;
        Ok(Json(response))
    }

    /// POST /api/sentence/generate-audio - the phrase flow for a batch of sentences
    pub async fn generate_sentence_audio(
        State(controller): State<Arc<PhraseAudioController>>,
        Json(request): Json<SentenceAudioRequest>,
    ) -> AppResult<Json<SentenceAudioResponse>> {
        if request.sentences.len() > MAX_SENTENCES {
            return Err(AppError::BadRequest(format!(
                "at most {} sentences per request",
                MAX_SENTENCES
            )));
        }
        for sentence in &request.sentences {
            guard_length(&sentence.text)?;
        }

        let response = controller.service.generate_sentence_audio(request).await?;
        Ok(Json(response))
    }

    /// POST /api/audio/canonicalize - identity of a phrase, no I/O
    pub async fn canonicalize(
        State(controller): State<Arc<PhraseAudioController>>,
        Json(request): Json<CanonicalizeRequest>,
    ) -> AppResult<Json<CanonicalizeResponse>> {
        guard_length(&request.text)?;

        Ok(Json(controller.service.canonicalize(&request.text)?))
    }

    /// GET /api/audio/:content_hash - stream the MP3
    pub async fn get_audio(
        State(controller): State<Arc<PhraseAudioController>>,
        Path(content_hash): Path<String>,
    ) -> AppResult<(StatusCode, HeaderMap, Body)> {
        let audio = controller
            .service
            .fetch_audio(&content_hash)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("no audio for {}", content_hash)))?;

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(AUDIO_CONTENT_TYPE));
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(audio.len()));

        Ok((StatusCode::OK, headers, Body::from(audio)))
    }
}

fn guard_length(text: &str) -> AppResult<()> {
    if text.chars().count() > MAX_TEXT_CHARS {
        return Err(AppError::BadRequest(format!(
            "text must be {} characters or less",
            MAX_TEXT_CHARS
        )));
    }
    Ok(())
}
