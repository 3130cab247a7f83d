pub mod dto;
pub mod error;
pub mod generator;
pub mod model;
pub mod oracle;
pub mod service;
pub mod uploader;

pub use dto::{
    CanonicalizeRequest, CanonicalizeResponse, PhraseAudioRequest, PhraseAudioResponse,
    ReadinessReport, SentenceAudioRequest, SentenceAudioResponse, SentenceAudioResult,
    SentenceAudioStatistics,
};
pub use error::{AudioServiceError, Stage};
pub use generator::{AudioGenerator, GeneratorSettings};
pub use model::{AudioArtifact, ObjectKeyLayout, StoreKind, StoreState, AUDIO_CONTENT_TYPE};
pub use oracle::ExistenceOracle;
pub use service::{PhraseAudioService, PhraseAudioServiceApi};
pub use uploader::AudioUploader;
