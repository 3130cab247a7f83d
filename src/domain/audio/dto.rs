use crate::domain::dataset::TextUnit;
use crate::domain::pipeline::StoreBreakdown;
use serde::{Deserialize, Serialize};

fn default_check_existing() -> bool {
    true
}

/// Request for POST /api/audio/phrase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhraseAudioRequest {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(default = "default_check_existing")]
    pub check_existing: bool,
}

/// Response for POST /api/audio/phrase. `error: null` means full success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseAudioResponse {
    pub text: String,
    pub content_hash: String,
    pub tts_rendering: String,
    pub audio_generated: bool,
    pub audio_existed: bool,
    pub uploaded_primary: bool,
    pub uploaded_mirror: bool,
    pub primary_existed: bool,
    pub mirror_existed: bool,
    pub primary_object_key: Option<String>,
    pub mirror_object_key: Option<String>,
    pub local_path: Option<String>,
    pub error: Option<String>,
}

/// Request for POST /api/audio/canonicalize
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalizeRequest {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalizeResponse {
    pub text: String,
    pub normalized_key: String,
    pub content_hash: String,
    pub tts_rendering: String,
    pub object_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessReport {
    pub ready: bool,
    pub tts_provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tts_error: Option<String>,
}

/// Request for POST /api/sentence/generate-audio
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentenceAudioRequest {
    /// Each entry needs `en`; episode fields are carried through untouched
    pub sentences: Vec<TextUnit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(default = "default_check_existing")]
    pub check_existing: bool,
}

/// Outcome of one sentence, in request order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceAudioResult {
    pub sentence_hash: String,
    pub en: String,
    /// Audio is available locally, whether generated now or found
    pub audio_generated: bool,
    pub uploaded_primary: bool,
    pub uploaded_mirror: bool,
    pub primary_object_key: Option<String>,
    pub mirror_object_key: Option<String>,
    pub local_file_path: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceAudioStatistics {
    pub total_sentences: usize,
    pub audio_generated: usize,
    pub audio_failed: usize,
    pub audio_success_rate: f64,
    /// Sentences that went on to at least one upload
    pub files_collected_for_upload: usize,
    pub newly_generated: usize,
    pub already_existed: usize,
}

/// Response for POST /api/sentence/generate-audio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceAudioResponse {
    pub results: Vec<SentenceAudioResult>,
    pub statistics: SentenceAudioStatistics,
    pub primary_upload_stats: StoreBreakdown,
    pub mirror_upload_stats: StoreBreakdown,
}
