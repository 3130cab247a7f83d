use super::model::{CheckedItem, ItemResult, ItemState, StageSpan};
use crate::domain::audio::{AudioServiceError, Stage, StoreKind, StoreState};
use crate::domain::dataset::{EpisodeRange, TextUnit};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Outcome of the check phase, handed to the confirmation gate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckSummary {
    pub total: usize,
    pub duplicates: usize,
    pub complete: usize,
    pub needs_work: usize,
    pub local_missing: usize,
    pub primary_missing: usize,
    pub mirror_missing: usize,
    pub both_missing: usize,
    pub primary_unknown: usize,
    pub mirror_unknown: usize,
    pub missing_by_episode: BTreeMap<i64, usize>,
}

impl CheckSummary {
    pub fn from_checked(items: &[CheckedItem]) -> Self {
        let mut summary = CheckSummary {
            total: items.len(),
            ..CheckSummary::default()
        };

        for item in items {
            if item.duplicate {
                summary.duplicates += 1;
                continue;
            }
            let Some(artifact) = &item.artifact else {
                continue;
            };
            if artifact.is_complete() {
                summary.complete += 1;
                continue;
            }

            summary.needs_work += 1;
            if !artifact.exists_local {
                summary.local_missing += 1;
            }
            let primary_missing = artifact.exists_primary.needs_upload();
            let mirror_missing = artifact.exists_mirror.needs_upload();
            summary.primary_missing += primary_missing as usize;
            summary.mirror_missing += mirror_missing as usize;
            summary.both_missing += (primary_missing && mirror_missing) as usize;
            summary.primary_unknown += artifact.exists_primary.is_unknown() as usize;
            summary.mirror_unknown += artifact.exists_mirror.is_unknown() as usize;

            if let Some(episode_id) = item.unit.episode_id {
                *summary.missing_by_episode.entry(episode_id).or_default() += 1;
            }
        }

        summary
    }
}

/// Per-store outcome breakdown
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreBreakdown {
    pub existed: usize,
    pub absent: usize,
    pub unknown: usize,
    pub uploaded: usize,
    pub upload_failed: usize,
}

/// Aggregated time spent in one stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTiming {
    pub operations: usize,
    /// Sum of individual operation durations
    pub busy_ms: u64,
    /// From the first operation start to the last operation end
    pub wall_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_start_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_end_ms: Option<u64>,
}

impl StageTiming {
    fn record(&mut self, span: Option<StageSpan>) {
        let Some(span) = span else {
            return;
        };
        self.operations += 1;
        self.busy_ms += span.duration_ms();
        self.first_start_ms = Some(
            self.first_start_ms
                .map_or(span.start_ms, |start| start.min(span.start_ms)),
        );
        self.last_end_ms = Some(self.last_end_ms.map_or(span.end_ms, |end| end.max(span.end_ms)));
        self.wall_ms = self
            .last_end_ms
            .unwrap_or_default()
            .saturating_sub(self.first_start_ms.unwrap_or_default());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTimings {
    pub check: StageTiming,
    pub generation: StageTiming,
    pub upload_primary: StageTiming,
    pub upload_mirror: StageTiming,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedItem {
    pub content_hash: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode_id: Option<i64>,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureLists {
    /// Items whose existence check was inconclusive on some store
    pub check: Vec<FailedItem>,
    pub generation: Vec<FailedItem>,
    pub upload_primary: Vec<FailedItem>,
    pub upload_mirror: Vec<FailedItem>,
}

impl FailureLists {
    fn sort(&mut self) {
        for list in [
            &mut self.check,
            &mut self.generation,
            &mut self.upload_primary,
            &mut self.upload_mirror,
        ] {
            list.sort_by(|a, b| a.content_hash.cmp(&b.content_hash));
        }
    }
}

/// Aggregate outcome of one pipeline run.
///
/// Accumulation is commutative: recording the same items in any order
/// yields the same report once finalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode_range: Option<EpisodeRange>,
    pub total: usize,
    pub skipped: usize,
    pub duplicates: usize,
    pub generated: usize,
    pub local_reused: usize,
    pub generation_failed: usize,
    pub capability_unavailable: usize,
    pub upload_complete: usize,
    pub upload_partial: usize,
    pub upload_failed: usize,
    pub cancelled: usize,
    pub primary: StoreBreakdown,
    pub mirror: StoreBreakdown,
    pub timings: StageTimings,
    pub failures: FailureLists,
}

impl RunReport {
    pub fn start() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            episode_range: None,
            total: 0,
            skipped: 0,
            duplicates: 0,
            generated: 0,
            local_reused: 0,
            generation_failed: 0,
            capability_unavailable: 0,
            upload_complete: 0,
            upload_partial: 0,
            upload_failed: 0,
            cancelled: 0,
            primary: StoreBreakdown::default(),
            mirror: StoreBreakdown::default(),
            timings: StageTimings::default(),
            failures: FailureLists::default(),
        }
    }

    /// Finalized report over the terminal results of a run
    pub fn from_items(
        started_at: DateTime<Utc>,
        episode_range: Option<EpisodeRange>,
        items: &[ItemResult],
    ) -> Self {
        let mut report = Self::start();
        report.started_at = started_at;
        report.episode_range = episode_range;
        for item in items {
            report.record(item);
        }
        report.finalize();
        report
    }

    pub fn record(&mut self, item: &ItemResult) {
        self.total += 1;

        match item.state {
            ItemState::Skipped => self.skipped += 1,
            ItemState::GenerationFailed => self.generation_failed += 1,
            ItemState::UploadComplete => self.upload_complete += 1,
            ItemState::UploadPartial => self.upload_partial += 1,
            ItemState::UploadFailed => self.upload_failed += 1,
            ItemState::Cancelled => self.cancelled += 1,
            other => {
                tracing::warn!(state = ?other, content_hash = %item.identity.content_hash, "Recorded non-terminal item");
            }
        }

        if item.duplicate {
            self.duplicates += 1;
        }
        if item.generated {
            self.generated += 1;
        }
        if item.reused_local() {
            self.local_reused += 1;
        }

        if let Some(error) = &item.error {
            match error.stage {
                Stage::Generation => {
                    self.failures.generation.push(failed_item(item, &error.message));
                    if error.capability_unavailable {
                        self.capability_unavailable += 1;
                    }
                }
                Stage::Check => self.failures.check.push(failed_item(item, &error.message)),
                Stage::Validation | Stage::Upload => {}
            }
        }

        let unknown_reasons: Vec<String> = [
            (StoreKind::Primary, &item.primary_at_check),
            (StoreKind::Mirror, &item.mirror_at_check),
        ]
        .into_iter()
        .filter_map(|(store, state)| match state {
            Some(StoreState::Unknown(reason)) => Some(
                AudioServiceError::StoreProbeUnknown {
                    store,
                    reason: reason.clone(),
                }
                .to_string(),
            ),
            _ => None,
        })
        .collect();
        if !unknown_reasons.is_empty() {
            self.failures
                .check
                .push(failed_item(item, &unknown_reasons.join("; ")));
        }

        for store in StoreKind::ALL {
            self.record_store(store, item);
        }

        self.timings.check.record(item.timings.check);
        self.timings.generation.record(item.timings.generation);
        self.timings.upload_primary.record(item.timings.upload_primary);
        self.timings.upload_mirror.record(item.timings.upload_mirror);
    }

    fn record_store(&mut self, store: StoreKind, item: &ItemResult) {
        let at_check = match store {
            StoreKind::Primary => &item.primary_at_check,
            StoreKind::Mirror => &item.mirror_at_check,
        };

        let breakdown = match store {
            StoreKind::Primary => &mut self.primary,
            StoreKind::Mirror => &mut self.mirror,
        };

        match at_check {
            Some(StoreState::Present) => breakdown.existed += 1,
            Some(StoreState::Absent) => breakdown.absent += 1,
            Some(StoreState::Unknown(_)) => breakdown.unknown += 1,
            None => {}
        }

        let Some(upload) = item.upload_for(store) else {
            return;
        };
        match &upload.error {
            None => breakdown.uploaded += 1,
            Some(error) => {
                breakdown.upload_failed += 1;
                let failed = failed_item(item, error);
                match store {
                    StoreKind::Primary => self.failures.upload_primary.push(failed),
                    StoreKind::Mirror => self.failures.upload_mirror.push(failed),
                }
            }
        }
    }

    pub fn finalize(&mut self) {
        self.failures.sort();
        self.finished_at = Some(Utc::now());
    }

    /// Sum of terminal-state counters; equals `total` for a finished run
    pub fn terminal_count(&self) -> usize {
        self.skipped
            + self.generation_failed
            + self.upload_complete
            + self.upload_partial
            + self.upload_failed
            + self.cancelled
    }
}

fn failed_item(item: &ItemResult, error: &str) -> FailedItem {
    FailedItem {
        content_hash: item.identity.content_hash.clone(),
        text: item.unit.text.clone(),
        episode_id: item.unit.episode_id,
        error: error.to_string(),
    }
}

/// Entry of the missing-items output: the input record plus its check state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingItem {
    #[serde(flatten)]
    pub unit: TextUnit,
    pub content_hash: String,
    pub object_key: String,
    pub local_exists: bool,
    pub primary: StoreState,
    pub mirror: StoreState,
}

impl MissingItem {
    /// Items missing from at least one store after the check phase
    pub fn collect(items: &[CheckedItem]) -> Vec<MissingItem> {
        items
            .iter()
            .filter(|item| !item.duplicate)
            .filter_map(|item| {
                let artifact = item.artifact.as_ref()?;
                if artifact.missing_stores().is_empty() {
                    return None;
                }
                Some(MissingItem {
                    unit: item.unit.clone(),
                    content_hash: artifact.content_hash.clone(),
                    object_key: artifact.object_key.clone(),
                    local_exists: artifact.exists_local,
                    primary: artifact.exists_primary.clone(),
                    mirror: artifact.exists_mirror.clone(),
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceCheck {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentence_id: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode_sequence: Option<i64>,
    pub en: String,
    pub content_hash: String,
    pub primary_exists: bool,
    pub mirror_exists: bool,
    pub audio_exists: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeCheck {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode_id: Option<i64>,
    pub total_sentences: usize,
    pub audio_exists_count: usize,
    pub audio_missing_count: usize,
    pub primary_exists_count: usize,
    pub mirror_exists_count: usize,
    pub sentences: Vec<SentenceCheck>,
}

/// Every checked item grouped by episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResults {
    pub total_sentences: usize,
    pub total_episodes: usize,
    pub episodes: BTreeMap<String, EpisodeCheck>,
}

impl CheckResults {
    pub fn from_checked(items: &[CheckedItem]) -> Self {
        let mut grouped: BTreeMap<Option<i64>, Vec<SentenceCheck>> = BTreeMap::new();
        let mut total_sentences = 0;

        for item in items {
            let Some(artifact) = &item.artifact else {
                continue;
            };
            total_sentences += 1;
            let primary_exists = artifact.exists_primary.is_present();
            let mirror_exists = artifact.exists_mirror.is_present();
            grouped
                .entry(item.unit.episode_id)
                .or_default()
                .push(SentenceCheck {
                    sentence_id: item.unit.sentence_id.clone(),
                    episode_sequence: item.unit.episode_sequence,
                    en: item.unit.text.clone(),
                    content_hash: artifact.content_hash.clone(),
                    primary_exists,
                    mirror_exists,
                    audio_exists: primary_exists && mirror_exists,
                });
        }

        let episodes: BTreeMap<String, EpisodeCheck> = grouped
            .into_iter()
            .map(|(episode_id, mut sentences)| {
                sentences.sort_by_key(|s| s.episode_sequence.unwrap_or(0));
                let audio_exists_count = sentences.iter().filter(|s| s.audio_exists).count();
                let check = EpisodeCheck {
                    episode_id,
                    total_sentences: sentences.len(),
                    audio_exists_count,
                    audio_missing_count: sentences.len() - audio_exists_count,
                    primary_exists_count: sentences.iter().filter(|s| s.primary_exists).count(),
                    mirror_exists_count: sentences.iter().filter(|s| s.mirror_exists).count(),
                    sentences,
                };
                let key = episode_id
                    .map(|id| format!("EP{}", id))
                    .unwrap_or_else(|| "unassigned".to_string());
                (key, check)
            })
            .collect();

        Self {
            total_sentences,
            total_episodes: episodes.len(),
            episodes,
        }
    }
}
