use super::error::AudioServiceError;
use super::model::{AudioArtifact, StoreKind, AUDIO_CONTENT_TYPE};
use crate::infrastructure::repositories::{LocalAudioCache, ObjectStore};
use std::sync::Arc;

/// Pushes cached audio to one remote store at a time.
///
/// Primary and mirror uploads are independent: one failing never blocks or
/// rolls back the other.
pub struct AudioUploader {
    cache: Arc<LocalAudioCache>,
    primary: Arc<dyn ObjectStore>,
    mirror: Arc<dyn ObjectStore>,
    max_retries: u32,
}

impl AudioUploader {
    pub fn new(
        cache: Arc<LocalAudioCache>,
        primary: Arc<dyn ObjectStore>,
        mirror: Arc<dyn ObjectStore>,
        max_retries: u32,
    ) -> Self {
        Self {
            cache,
            primary,
            mirror,
            max_retries,
        }
    }

    fn store(&self, store: StoreKind) -> &Arc<dyn ObjectStore> {
        match store {
            StoreKind::Primary => &self.primary,
            StoreKind::Mirror => &self.mirror,
        }
    }

    /// Upload the artifact's local file to `store` under its object key
    pub async fn upload(
        &self,
        store: StoreKind,
        artifact: &AudioArtifact,
    ) -> Result<(), AudioServiceError> {
        let bytes = self
            .cache
            .read(&artifact.content_hash)
            .await
            .map_err(|e| AudioServiceError::Upload {
                store,
                reason: format!("cannot read local file: {}", e),
            })?
            .ok_or_else(|| AudioServiceError::Upload {
                store,
                reason: "local file not found".to_string(),
            })?;

        let client = self.store(store);
        let max_attempts = self.max_retries + 1;
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match client
                .put(&artifact.object_key, bytes.clone(), AUDIO_CONTENT_TYPE)
                .await
            {
                Ok(()) => {
                    tracing::info!(
                        store = %store,
                        backend = client.name(),
                        key = %artifact.object_key,
                        size_bytes = bytes.len(),
                        "Audio uploaded"
                    );
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(
                        store = %store,
                        backend = client.name(),
                        key = %artifact.object_key,
                        attempt,
                        max_attempts,
                        error = %e,
                        "Audio upload failed"
                    );
                    last_error = e.to_string();
                }
            }
        }

        Err(AudioServiceError::Upload {
            store,
            reason: last_error,
        })
    }

    /// Fetch a stored object, trying the primary store before the mirror
    pub async fn fetch_remote(&self, object_key: &str) -> Option<Vec<u8>> {
        for store in StoreKind::ALL {
            match self.store(store).get(object_key).await {
                Ok(Some(bytes)) => return Some(bytes),
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(store = %store, key = object_key, error = %e, "Remote fetch failed");
                }
            }
        }
        None
    }
}
