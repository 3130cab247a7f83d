use crate::domain::dataset::DatasetError;

/// Errors that abort a batch run before or after item processing.
///
/// Item-level failures never surface here; they end up in the run report.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error("TTS capability unavailable: {0}")]
    CapabilityUnavailable(String),
    #[error("failed to write run output: {0}")]
    Output(#[from] std::io::Error),
    #[error("failed to serialize run output: {0}")]
    Serialize(#[from] serde_json::Error),
}
