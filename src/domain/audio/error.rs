use super::model::StoreKind;
use crate::error::AppError;
use serde::{Deserialize, Serialize};

/// Pipeline stage an error is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validation,
    Check,
    Generation,
    Upload,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum AudioServiceError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("TTS capability unavailable: {0}")]
    CapabilityUnavailable(String),
    #[error("transient generation error: {0}")]
    TransientGeneration(String),
    #[error("audio generation failed after {attempts} attempt(s): {reason}")]
    GenerationFailed { attempts: u32, reason: String },
    #[error("{store} existence check inconclusive: {reason}")]
    StoreProbeUnknown { store: StoreKind, reason: String },
    #[error("local audio file could not be checked: {0}")]
    LocalCheckFailed(String),
    #[error("{store} upload failed: {reason}")]
    Upload { store: StoreKind, reason: String },
    #[error("local audio cache error: {0}")]
    LocalCache(String),
    #[error("pipeline error: {0}")]
    Pipeline(String),
}

impl AudioServiceError {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Validation(_) => Stage::Validation,
            Self::StoreProbeUnknown { .. } | Self::LocalCheckFailed(_) | Self::Pipeline(_) => {
                Stage::Check
            }
            Self::CapabilityUnavailable(_)
            | Self::TransientGeneration(_)
            | Self::GenerationFailed { .. }
            | Self::LocalCache(_) => Stage::Generation,
            Self::Upload { .. } => Stage::Upload,
        }
    }
}

impl From<std::io::Error> for AudioServiceError {
    fn from(err: std::io::Error) -> Self {
        AudioServiceError::LocalCache(err.to_string())
    }
}

impl From<AudioServiceError> for AppError {
    fn from(err: AudioServiceError) -> Self {
        match err {
            AudioServiceError::Validation(msg) => AppError::BadRequest(msg),
            AudioServiceError::CapabilityUnavailable(msg) => AppError::ServiceUnavailable(format!(
                "text-to-speech capability is unreachable: {}",
                msg
            )),
            AudioServiceError::LocalCache(msg)
            | AudioServiceError::LocalCheckFailed(msg)
            | AudioServiceError::Pipeline(msg) => {
                AppError::Internal(msg)
            }
            other => AppError::ExternalService(other.to_string()),
        }
    }
}
