use super::model::{AudioArtifact, ObjectKeyLayout, StoreKind, StoreState};
use crate::domain::canonical::CanonicalIdentity;
use crate::infrastructure::repositories::{LocalAudioCache, ObjectStore};
use std::sync::Arc;

/// Answers where the audio for an identity already exists.
///
/// Never writes. The local, primary and mirror probes of one identity run
/// concurrently; bounding across identities is the caller's job.
pub struct ExistenceOracle {
    cache: Arc<LocalAudioCache>,
    primary: Arc<dyn ObjectStore>,
    mirror: Arc<dyn ObjectStore>,
    layout: ObjectKeyLayout,
}

impl ExistenceOracle {
    pub fn new(
        cache: Arc<LocalAudioCache>,
        primary: Arc<dyn ObjectStore>,
        mirror: Arc<dyn ObjectStore>,
        layout: ObjectKeyLayout,
    ) -> Self {
        Self {
            cache,
            primary,
            mirror,
            layout,
        }
    }

    pub fn layout(&self) -> &ObjectKeyLayout {
        &self.layout
    }

    /// Probe local disk and both stores
    pub async fn check(&self, identity: &CanonicalIdentity) -> AudioArtifact {
        let object_key = self.layout.key_for(&identity.content_hash);

        let (local, exists_primary, exists_mirror) = tokio::join!(
            self.probe_local(&identity.content_hash),
            self.probe_remote(StoreKind::Primary, &object_key),
            self.probe_remote(StoreKind::Mirror, &object_key),
        );

        self.artifact(identity, object_key, local, exists_primary, exists_mirror)
    }

    /// Probe local disk only; both stores are reported as unknown
    pub async fn check_local_only(&self, identity: &CanonicalIdentity) -> AudioArtifact {
        let object_key = self.layout.key_for(&identity.content_hash);
        let local = self.probe_local(&identity.content_hash).await;
        let skipped = || StoreState::Unknown("remote probe skipped".to_string());

        self.artifact(identity, object_key, local, skipped(), skipped())
    }

    /// Look again right before writing.
    ///
    /// The local file is always looked at again. Stores already confirmed present
    /// keep their state; the others are asked again only when `remote` is set.
    pub async fn recheck(&self, artifact: &AudioArtifact, remote: bool) -> AudioArtifact {
        let (local, exists_primary, exists_mirror) = tokio::join!(
            self.probe_local(&artifact.content_hash),
            self.reprobe(StoreKind::Primary, artifact, remote),
            self.reprobe(StoreKind::Mirror, artifact, remote),
        );

        let mut fresh = artifact.clone();
        fresh.exists_primary = exists_primary;
        fresh.exists_mirror = exists_mirror;
        self.apply_local(&mut fresh, local);
        fresh
    }

    async fn reprobe(&self, store: StoreKind, artifact: &AudioArtifact, remote: bool) -> StoreState {
        let current = artifact.store_state(store);
        if !remote || current.is_present() {
            return current.clone();
        }
        self.probe_remote(store, &artifact.object_key).await
    }

    fn artifact(
        &self,
        identity: &CanonicalIdentity,
        object_key: String,
        local: Result<bool, String>,
        exists_primary: StoreState,
        exists_mirror: StoreState,
    ) -> AudioArtifact {
        let mut artifact = AudioArtifact {
            content_hash: identity.content_hash.clone(),
            object_key,
            local_path: None,
            exists_local: false,
            exists_primary,
            exists_mirror,
            local_error: None,
        };
        self.apply_local(&mut artifact, local);
        artifact
    }

    fn apply_local(&self, artifact: &mut AudioArtifact, local: Result<bool, String>) {
        match local {
            Ok(true) => {
                artifact.exists_local = true;
                artifact.local_path = Some(self.cache.path_for(&artifact.content_hash));
                artifact.local_error = None;
            }
            Ok(false) => {
                artifact.exists_local = false;
                artifact.local_path = None;
                artifact.local_error = None;
            }
            Err(reason) => {
                artifact.exists_local = false;
                artifact.local_path = None;
                artifact.local_error = Some(reason);
            }
        }
    }

    async fn probe_local(&self, content_hash: &str) -> Result<bool, String> {
        self.cache.exists(content_hash).await.map_err(|e| {
            tracing::warn!(content_hash, error = %e, "Local audio check failed");
            e.to_string()
        })
    }

    async fn probe_remote(&self, store: StoreKind, key: &str) -> StoreState {
        let client = match store {
            StoreKind::Primary => &self.primary,
            StoreKind::Mirror => &self.mirror,
        };

        match client.exists(key).await {
            Ok(true) => StoreState::Present,
            Ok(false) => StoreState::Absent,
            Err(e) => {
                tracing::warn!(
                    store = %store,
                    backend = client.name(),
                    key,
                    error = %e,
                    "Remote existence probe inconclusive"
                );
                StoreState::Unknown(e.to_string())
            }
        }
    }
}
