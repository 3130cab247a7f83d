use super::dto::{
    CanonicalizeResponse, PhraseAudioRequest, PhraseAudioResponse, ReadinessReport,
    SentenceAudioRequest, SentenceAudioResponse, SentenceAudioResult, SentenceAudioStatistics,
};
use super::error::AudioServiceError;
use super::model::StoreKind;
use crate::domain::canonical::{canonicalize, is_content_hash};
use crate::domain::dataset::TextUnit;
use crate::domain::pipeline::{ItemResult, ItemState, PipelineOrchestrator, RunOptions};
use crate::infrastructure::repositories::LocalAudioCache;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct PhraseAudioService {
    orchestrator: PipelineOrchestrator,
    cache: Arc<LocalAudioCache>,
    default_voice: String,
}

impl PhraseAudioService {
    pub fn new(
        orchestrator: PipelineOrchestrator,
        cache: Arc<LocalAudioCache>,
        default_voice: String,
    ) -> Self {
        Self {
            orchestrator,
            cache,
            default_voice,
        }
    }

    fn voice_or_default(&self, voice: Option<String>) -> String {
        voice
            .filter(|voice| !voice.trim().is_empty())
            .unwrap_or_else(|| self.default_voice.clone())
    }
}

#[async_trait]
pub trait PhraseAudioServiceApi: Send + Sync {
    /// Make sure audio for one phrase exists locally and on both stores.
    ///
    /// Runs the pipeline for a single item with no confirmation gate.
    /// Item-level failures (generation exhausted, uploads failed) come back
    /// inside the response; only invalid input and an unreachable TTS
    /// backend are returned as errors.
    async fn generate_phrase_audio(
        &self,
        request: PhraseAudioRequest,
    ) -> Result<PhraseAudioResponse, AudioServiceError>;

    /// Same as [`generate_phrase_audio`](Self::generate_phrase_audio) for a
    /// list of sentences, run as one pipelined batch. Repeated sentences are
    /// processed once and report the outcome of their first occurrence.
    async fn generate_sentence_audio(
        &self,
        request: SentenceAudioRequest,
    ) -> Result<SentenceAudioResponse, AudioServiceError>;

    /// Identity and object key of a phrase, without any I/O
    fn canonicalize(&self, text: &str) -> Result<CanonicalizeResponse, AudioServiceError>;

    /// MP3 bytes for a content hash: local cache first, then primary, then mirror
    async fn fetch_audio(&self, content_hash: &str)
        -> Result<Option<Vec<u8>>, AudioServiceError>;

    async fn readiness(&self) -> ReadinessReport;
}

#[async_trait]
impl PhraseAudioServiceApi for PhraseAudioService {
    async fn generate_phrase_audio(
        &self,
        request: PhraseAudioRequest,
    ) -> Result<PhraseAudioResponse, AudioServiceError> {
        validate_text(&request.text)?;

        let voice = self.voice_or_default(request.voice);

        tracing::info!(
            text_length = request.text.len(),
            voice = %voice,
            check_existing = request.check_existing,
            "Phrase audio request"
        );

        let options = RunOptions {
            voice,
            check_existing: request.check_existing,
            episode_range: None,
        };

        let outcome = self
            .orchestrator
            .run(
                vec![TextUnit::new(request.text.clone())],
                &options,
                None,
                &CancellationToken::new(),
            )
            .await;

        let item = outcome
            .items
            .into_iter()
            .next()
            .ok_or_else(|| AudioServiceError::Pipeline("no result for phrase".to_string()))?;

        if let Some(error) = item.error.as_ref().filter(|e| e.capability_unavailable) {
            return Err(AudioServiceError::CapabilityUnavailable(error.message.clone()));
        }

        Ok(to_response(request.text, &item))
    }

    async fn generate_sentence_audio(
        &self,
        request: SentenceAudioRequest,
    ) -> Result<SentenceAudioResponse, AudioServiceError> {
        if request.sentences.is_empty() {
            return Err(AudioServiceError::Validation(
                "sentences cannot be empty".to_string(),
            ));
        }
        for (index, sentence) in request.sentences.iter().enumerate() {
            validate_text(&sentence.text).map_err(|_| {
                AudioServiceError::Validation(format!("sentence {} has no text", index))
            })?;
        }

        let voice = self.voice_or_default(request.voice);
        tracing::info!(
            sentences = request.sentences.len(),
            voice = %voice,
            check_existing = request.check_existing,
            "Sentence audio request"
        );

        let options = RunOptions {
            voice,
            check_existing: request.check_existing,
            episode_range: None,
        };
        let outcome = self
            .orchestrator
            .run(request.sentences, &options, None, &CancellationToken::new())
            .await;

        if let Some(error) = outcome
            .items
            .iter()
            .filter_map(|item| item.error.as_ref())
            .find(|error| error.capability_unavailable)
        {
            return Err(AudioServiceError::CapabilityUnavailable(error.message.clone()));
        }

        let results: Vec<SentenceAudioResult> =
            outcome.items.iter().map(to_sentence_result).collect();

        let total_sentences = results.len();
        let audio_generated = results.iter().filter(|r| r.audio_generated).count();
        let statistics = SentenceAudioStatistics {
            total_sentences,
            audio_generated,
            audio_failed: total_sentences - audio_generated,
            audio_success_rate: audio_generated as f64 / total_sentences as f64,
            files_collected_for_upload: outcome
                .items
                .iter()
                .filter(|item| !item.uploads.is_empty())
                .count(),
            newly_generated: outcome.report.generated,
            already_existed: outcome.items.iter().filter(|item| item.local_existed).count(),
        };

        tracing::info!(
            total = total_sentences,
            available = audio_generated,
            generated = statistics.newly_generated,
            "Sentence audio finished"
        );

        Ok(SentenceAudioResponse {
            results,
            statistics,
            primary_upload_stats: outcome.report.primary,
            mirror_upload_stats: outcome.report.mirror,
        })
    }

    fn canonicalize(&self, text: &str) -> Result<CanonicalizeResponse, AudioServiceError> {
        validate_text(text)?;

        let identity = canonicalize(text);
        let object_key = self
            .orchestrator
            .oracle()
            .layout()
            .key_for(&identity.content_hash);

        Ok(CanonicalizeResponse {
            text: identity.raw_text,
            normalized_key: identity.normalized_key,
            content_hash: identity.content_hash,
            tts_rendering: identity.tts_rendering,
            object_key,
        })
    }

    async fn fetch_audio(
        &self,
        content_hash: &str,
    ) -> Result<Option<Vec<u8>>, AudioServiceError> {
        if !is_content_hash(content_hash) {
            return Err(AudioServiceError::Validation(format!(
                "'{}' is not a content hash",
                content_hash
            )));
        }

        if let Some(bytes) = self.cache.read(content_hash).await? {
            tracing::debug!(content_hash, source = "local", "Serving cached audio");
            return Ok(Some(bytes));
        }

        let key = self.orchestrator.oracle().layout().key_for(content_hash);
        Ok(self.orchestrator.uploader().fetch_remote(&key).await)
    }

    async fn readiness(&self) -> ReadinessReport {
        let generator = self.orchestrator.generator();
        let probe = generator.check_available().await;

        ReadinessReport {
            ready: probe.is_ok(),
            tts_provider: generator.provider().to_string(),
            tts_error: probe.err().map(|e| e.to_string()),
        }
    }
}

fn validate_text(text: &str) -> Result<(), AudioServiceError> {
    if text.trim().is_empty() {
        return Err(AudioServiceError::Validation(
            "text cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Object key of the item on `store`, when the audio is known to be there
fn object_key_on(item: &ItemResult, store: StoreKind) -> Option<String> {
    item.artifact
        .as_ref()
        .filter(|artifact| artifact.store_state(store).is_present())
        .map(|artifact| artifact.object_key.clone())
}

fn local_path_of(item: &ItemResult) -> Option<String> {
    item.artifact
        .as_ref()
        .filter(|artifact| artifact.exists_local)
        .and_then(|artifact| artifact.local_path.as_ref())
        .map(|path| path.display().to_string())
}

fn to_sentence_result(item: &ItemResult) -> SentenceAudioResult {
    let audio_available = matches!(
        item.state,
        ItemState::Skipped
            | ItemState::UploadComplete
            | ItemState::UploadPartial
            | ItemState::UploadFailed
    );

    SentenceAudioResult {
        sentence_hash: item.identity.content_hash.clone(),
        en: item.unit.text.clone(),
        audio_generated: audio_available,
        uploaded_primary: item.uploaded_to(StoreKind::Primary),
        uploaded_mirror: item.uploaded_to(StoreKind::Mirror),
        primary_object_key: object_key_on(item, StoreKind::Primary),
        mirror_object_key: object_key_on(item, StoreKind::Mirror),
        local_file_path: local_path_of(item),
        error: item.error.as_ref().map(|error| error.message.clone()),
    }
}

fn to_response(text: String, item: &ItemResult) -> PhraseAudioResponse {

    PhraseAudioResponse {
        text,
        content_hash: item.identity.content_hash.clone(),
        tts_rendering: item.identity.tts_rendering.clone(),
        audio_generated: item.generated,
        audio_existed: item.local_existed,
        uploaded_primary: item.uploaded_to(StoreKind::Primary),
        uploaded_mirror: item.uploaded_to(StoreKind::Mirror),
        primary_existed: item.existed_on(StoreKind::Primary),
        mirror_existed: item.existed_on(StoreKind::Mirror),
        primary_object_key: object_key_on(item, StoreKind::Primary),
        mirror_object_key: object_key_on(item, StoreKind::Mirror),
        local_path: local_path_of(item),
        error: item.error.as_ref().map(|error| error.message.clone()),
    }
}
