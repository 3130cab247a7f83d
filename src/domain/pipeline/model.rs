use crate::domain::audio::{AudioArtifact, Stage, StoreKind, StoreState};
use crate::domain::canonical::CanonicalIdentity;
use crate::domain::dataset::TextUnit;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Lifecycle of one item through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    Pending,
    Checked,
    NeedsGeneration,
    Generated,
    Skipped,
    GenerationFailed,
    UploadComplete,
    UploadPartial,
    UploadFailed,
    /// Never started a stage because the run was cancelled or declined
    Cancelled,
}

impl ItemState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ItemState::Skipped
                | ItemState::GenerationFailed
                | ItemState::UploadComplete
                | ItemState::UploadPartial
                | ItemState::UploadFailed
                | ItemState::Cancelled
        )
    }
}

/// Time spent in one stage, as millisecond offsets from the run start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSpan {
    pub start_ms: u64,
    pub end_ms: u64,
}

impl StageSpan {
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }
}

/// Measures stage spans against a shared run origin
#[derive(Debug, Clone, Copy)]
pub struct RunClock {
    origin: Instant,
}

impl RunClock {
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    pub fn span_since(&self, start_ms: u64) -> StageSpan {
        StageSpan {
            start_ms,
            end_ms: self.now_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTimings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check: Option<StageSpan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<StageSpan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_primary: Option<StageSpan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_mirror: Option<StageSpan>,
}

impl ItemTimings {
    pub fn set_upload(&mut self, store: StoreKind, span: StageSpan) {
        match store {
            StoreKind::Primary => self.upload_primary = Some(span),
            StoreKind::Mirror => self.upload_mirror = Some(span),
        }
    }
}

/// Outcome of one upload sub-task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreUpload {
    pub store: StoreKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StoreUpload {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemError {
    pub stage: Stage,
    pub message: String,
    /// Set when the TTS backend itself was unreachable
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub capability_unavailable: bool,
}

/// An item after the existence check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckedItem {
    pub index: usize,
    pub unit: TextUnit,
    pub identity: CanonicalIdentity,
    /// `None` for duplicates and for items never checked
    pub artifact: Option<AudioArtifact>,
    pub duplicate: bool,
    pub check_span: Option<StageSpan>,
}

impl CheckedItem {
    pub fn needs_work(&self) -> bool {
        self.artifact
            .as_ref()
            .map(|artifact| !artifact.is_complete())
            .unwrap_or(false)
    }

    pub fn state(&self) -> ItemState {
        match &self.artifact {
            _ if self.duplicate => ItemState::Skipped,
            None => ItemState::Pending,
            Some(artifact) if artifact.is_complete() => ItemState::Skipped,
            Some(_) => ItemState::NeedsGeneration,
        }
    }
}

/// Final record of one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemResult {
    pub index: usize,
    pub unit: TextUnit,
    pub identity: CanonicalIdentity,
    pub state: ItemState,
    /// Latest view of the artifact, including generation and uploads
    pub artifact: Option<AudioArtifact>,
    pub local_existed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_at_check: Option<StoreState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mirror_at_check: Option<StoreState>,
    pub generated: bool,
    pub duplicate: bool,
    pub uploads: Vec<StoreUpload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ItemError>,
    pub timings: ItemTimings,
}

impl ItemResult {
    /// Start a result from the check phase output
    pub fn from_checked(checked: CheckedItem) -> Self {
        let state = checked.state();
        let local_existed = checked
            .artifact
            .as_ref()
            .map(|a| a.exists_local)
            .unwrap_or(false);
        let primary_at_check = checked.artifact.as_ref().map(|a| a.exists_primary.clone());
        let mirror_at_check = checked.artifact.as_ref().map(|a| a.exists_mirror.clone());

        Self {
            index: checked.index,
            unit: checked.unit,
            identity: checked.identity,
            state,
            artifact: checked.artifact,
            local_existed,
            primary_at_check,
            mirror_at_check,
            generated: false,
            duplicate: checked.duplicate,
            uploads: Vec::new(),
            error: None,
            timings: ItemTimings {
                check: checked.check_span,
                ..ItemTimings::default()
            },
        }
    }

    pub fn upload_for(&self, store: StoreKind) -> Option<&StoreUpload> {
        self.uploads.iter().find(|upload| upload.store == store)
    }

    pub fn uploaded_to(&self, store: StoreKind) -> bool {
        self.upload_for(store).map(StoreUpload::succeeded).unwrap_or(false)
    }

    pub fn existed_on(&self, store: StoreKind) -> bool {
        let at_check = match store {
            StoreKind::Primary => &self.primary_at_check,
            StoreKind::Mirror => &self.mirror_at_check,
        };
        at_check.as_ref().map(StoreState::is_present).unwrap_or(false)
    }

    /// Local file was present, so generation was skipped
    pub fn reused_local(&self) -> bool {
        self.local_existed
            && !self.generated
            && matches!(
                self.state,
                ItemState::UploadComplete | ItemState::UploadPartial | ItemState::UploadFailed
            )
    }
}
