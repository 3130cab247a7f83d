use async_trait::async_trait;

/// Failure modes a TTS provider can report.
///
/// The generator decides retry behaviour from the variant: `Transient` is
/// retried, `Unavailable` and `Rejected` are not.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TtsRepositoryError {
    #[error("TTS backend unreachable: {0}")]
    Unavailable(String),
    #[error("transient TTS failure: {0}")]
    Transient(String),
    #[error("TTS request rejected: {0}")]
    Rejected(String),
}

/// Repository for TTS synthesis operations.
/// Abstracts the underlying TTS provider (AWS Polly, OpenAI, ...)
#[async_trait]
pub trait TtsRepository: Send + Sync {
    /// Short provider name used in logs and health output
    fn provider(&self) -> &'static str;

    /// Synthesize already formatted text with the given voice
    ///
    /// Returns MP3 audio bytes
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, TtsRepositoryError>;

    /// Cheap reachability probe used at startup and by the readiness check
    async fn check_available(&self) -> Result<(), TtsRepositoryError>;
}
