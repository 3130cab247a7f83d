pub mod local_audio_cache;
pub mod object_store;
pub mod openai_tts_repository;
pub mod polly_tts_repository;
pub mod s3_object_store;
#[cfg(test)]
mod status_responder;
pub mod text_unit_repository;
pub mod tts_repository;

pub use local_audio_cache::LocalAudioCache;
pub use object_store::{ObjectStore, ObjectStoreError};
pub use openai_tts_repository::OpenAiTtsRepository;
pub use polly_tts_repository::PollyTtsRepository;
pub use s3_object_store::S3ObjectStore;
pub use text_unit_repository::JsonTextUnitRepository;
pub use tts_repository::{TtsRepository, TtsRepositoryError};
