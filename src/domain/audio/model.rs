use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";

/// Which remote store an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Primary,
    Mirror,
}

impl StoreKind {
    pub const ALL: [StoreKind; 2] = [StoreKind::Primary, StoreKind::Mirror];

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Primary => "primary",
            StoreKind::Mirror => "mirror",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of probing one remote store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum StoreState {
    Present,
    Absent,
    /// The probe did not complete; never to be read as present
    Unknown(String),
}

impl StoreState {
    pub fn is_present(&self) -> bool {
        matches!(self, StoreState::Present)
    }

    /// Absent and unknown both require an upload
    pub fn needs_upload(&self) -> bool {
        !self.is_present()
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, StoreState::Unknown(_))
    }
}

/// Object keys shared by both stores: `{prefix}/{content_hash}.mp3`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectKeyLayout {
    prefix: String,
}

impl ObjectKeyLayout {
    pub fn new(prefix: impl AsRef<str>) -> Self {
        Self {
            prefix: prefix.as_ref().trim_matches('/').to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn key_for(&self, content_hash: &str) -> String {
        if self.prefix.is_empty() {
            format!("{}.mp3", content_hash)
        } else {
            format!("{}/{}.mp3", self.prefix, content_hash)
        }
    }
}

/// Where the audio for one content hash lives across the three tiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioArtifact {
    pub content_hash: String,
    pub object_key: String,
    pub local_path: Option<PathBuf>,
    pub exists_local: bool,
    pub exists_primary: StoreState,
    pub exists_mirror: StoreState,
    /// Set when the local file could not be probed; nothing may write the
    /// path until it can
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_error: Option<String>,
}

impl AudioArtifact {
    pub fn store_state(&self, store: StoreKind) -> &StoreState {
        match store {
            StoreKind::Primary => &self.exists_primary,
            StoreKind::Mirror => &self.exists_mirror,
        }
    }

    pub fn set_store_state(&mut self, store: StoreKind, state: StoreState) {
        match store {
            StoreKind::Primary => self.exists_primary = state,
            StoreKind::Mirror => self.exists_mirror = state,
        }
    }

    /// Present on local disk and confirmed on both stores
    pub fn is_complete(&self) -> bool {
        self.exists_local && self.exists_primary.is_present() && self.exists_mirror.is_present()
    }

    /// Stores still needing an upload, in a stable order
    pub fn missing_stores(&self) -> Vec<StoreKind> {
        StoreKind::ALL
            .into_iter()
            .filter(|store| self.store_state(*store).needs_upload())
            .collect()
    }

    pub fn mark_generated(&mut self, local_path: PathBuf) {
        self.local_path = Some(local_path);
        self.exists_local = true;
        self.local_error = None;
    }
}
