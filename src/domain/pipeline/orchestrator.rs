use super::gate::ConfirmationGate;
use super::in_flight::InFlightHashes;
use super::model::{
    CheckedItem, ItemError, ItemResult, ItemState, RunClock, StageSpan, StoreUpload,
};
use super::pool::StagePools;
use super::report::{CheckSummary, RunReport};
use crate::domain::audio::{
    AudioArtifact, AudioGenerator, AudioServiceError, AudioUploader, ExistenceOracle, StoreKind,
    StoreState,
};
use crate::domain::canonical::{canonicalize, CanonicalIdentity};
use crate::domain::dataset::{EpisodeRange, TextUnit};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub voice: String,
    /// When false the remote probes are skipped and both stores are uploaded
    pub check_existing: bool,
    pub episode_range: Option<EpisodeRange>,
}

impl RunOptions {
    pub fn new(voice: impl Into<String>) -> Self {
        Self {
            voice: voice.into(),
            check_existing: true,
            episode_range: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: RunReport,
    /// Check phase output, in input order
    pub checked: Vec<CheckedItem>,
    /// Terminal result of every input item, in input order
    pub items: Vec<ItemResult>,
}

enum UploadStep {
    NotNeeded,
    Cancelled(StoreKind),
    Finished(StoreUpload, StageSpan),
}

/// Drives items through check, generation and upload on bounded pools
#[derive(Clone)]
pub struct PipelineOrchestrator {
    oracle: Arc<ExistenceOracle>,
    generator: Arc<AudioGenerator>,
    uploader: Arc<AudioUploader>,
    pools: StagePools,
    in_flight: InFlightHashes,
}

impl PipelineOrchestrator {
    pub fn new(
        oracle: Arc<ExistenceOracle>,
        generator: Arc<AudioGenerator>,
        uploader: Arc<AudioUploader>,
        pools: StagePools,
    ) -> Self {
        Self {
            oracle,
            generator,
            uploader,
            pools,
            in_flight: InFlightHashes::new(),
        }
    }

    pub fn pools(&self) -> &StagePools {
        &self.pools
    }

    pub fn oracle(&self) -> &ExistenceOracle {
        &self.oracle
    }

    pub fn uploader(&self) -> &AudioUploader {
        &self.uploader
    }

    pub fn generator(&self) -> &AudioGenerator {
        &self.generator
    }

    /// Process `units` to terminal states.
    ///
    /// With a gate every item is checked first and the gate sees the check
    /// summary before any generation starts. Without one, stages are
    /// pipelined per item.
    pub async fn run(
        &self,
        units: Vec<TextUnit>,
        options: &RunOptions,
        gate: Option<&dyn ConfirmationGate>,
        cancel: &CancellationToken,
    ) -> RunOutcome {
        let started_at = Utc::now();
        let clock = RunClock::start();

        tracing::info!(
            items = units.len(),
            check = self.pools.check.capacity(),
            generation = self.pools.generation.capacity(),
            upload_primary = self.pools.upload_primary.capacity(),
            upload_mirror = self.pools.upload_mirror.capacity(),
            gated = gate.is_some(),
            "Pipeline run started"
        );

        let (checked, items) = match gate {
            Some(gate) => {
                let checked = self.check_all_with(units, options, cancel, clock).await;
                let summary = CheckSummary::from_checked(&checked);
                tracing::info!(
                    total = summary.total,
                    complete = summary.complete,
                    needs_work = summary.needs_work,
                    duplicates = summary.duplicates,
                    "Check phase finished"
                );
                gate.checked(&checked, &summary).await;

                let items = if summary.needs_work == 0 {
                    self.execute_with(checked.clone(), options, cancel, clock).await
                } else if cancel.is_cancelled() || !gate.confirm(&summary).await {
                    let mut declined: Vec<ItemResult> =
                        checked.iter().cloned().map(decline).collect();
                    settle_duplicates(&mut declined);
                    declined
                } else {
                    self.execute_with(checked.clone(), options, cancel, clock).await
                };
                (checked, items)
            }
            None => self.pipeline_all(units, options, cancel, clock).await,
        };

        let report = RunReport::from_items(started_at, options.episode_range, &items);

        tracing::info!(
            run_id = %report.run_id,
            total = report.total,
            skipped = report.skipped,
            generated = report.generated,
            generation_failed = report.generation_failed,
            upload_complete = report.upload_complete,
            upload_partial = report.upload_partial,
            upload_failed = report.upload_failed,
            cancelled = report.cancelled,
            "Pipeline run finished"
        );

        RunOutcome {
            report,
            checked,
            items,
        }
    }

    /// Check phase only: canonicalize, dedupe and probe every unit
    pub async fn check_all(
        &self,
        units: Vec<TextUnit>,
        options: &RunOptions,
        cancel: &CancellationToken,
    ) -> Vec<CheckedItem> {
        self.check_all_with(units, options, cancel, RunClock::start())
            .await
    }

    /// Generate and upload whatever the check phase found missing
    pub async fn execute(
        &self,
        checked: Vec<CheckedItem>,
        options: &RunOptions,
        cancel: &CancellationToken,
    ) -> Vec<ItemResult> {
        self.execute_with(checked, options, cancel, RunClock::start())
            .await
    }

    async fn check_all_with(
        &self,
        units: Vec<TextUnit>,
        options: &RunOptions,
        cancel: &CancellationToken,
        clock: RunClock,
    ) -> Vec<CheckedItem> {
        let mut tasks = JoinSet::new();
        let mut fallback = Vec::new();

        for (index, unit, identity, duplicate) in prepare(units) {
            fallback.push(unchecked(index, unit.clone(), identity.clone(), duplicate));
            let this = self.clone();
            let cancel = cancel.clone();
            let check_existing = options.check_existing;
            tasks.spawn(async move {
                this.check_one(index, unit, identity, duplicate, check_existing, &cancel, clock)
                    .await
            });
        }

        let mut checked = collect(tasks, fallback.len()).await;
        fill_missing(&mut checked, fallback, |item| item);
        checked.into_iter().flatten().collect()
    }

    async fn execute_with(
        &self,
        checked: Vec<CheckedItem>,
        options: &RunOptions,
        cancel: &CancellationToken,
        clock: RunClock,
    ) -> Vec<ItemResult> {
        let mut tasks = JoinSet::new();
        let total = checked.len();
        let fallback = checked.clone();

        for item in checked {
            let this = self.clone();
            let cancel = cancel.clone();
            let options = options.clone();
            tasks.spawn(async move { this.process_checked(item, &options, &cancel, clock).await });
        }

        let mut slots = collect(tasks, total).await;
        fill_missing(&mut slots, fallback, aborted);
        let mut items: Vec<ItemResult> = slots.into_iter().flatten().collect();
        settle_duplicates(&mut items);
        items
    }

    async fn pipeline_all(
        &self,
        units: Vec<TextUnit>,
        options: &RunOptions,
        cancel: &CancellationToken,
        clock: RunClock,
    ) -> (Vec<CheckedItem>, Vec<ItemResult>) {
        let mut tasks = JoinSet::new();
        let mut fallback = Vec::new();

        for (index, unit, identity, duplicate) in prepare(units) {
            fallback.push(unchecked(index, unit.clone(), identity.clone(), duplicate));
            let this = self.clone();
            let cancel = cancel.clone();
            let options = options.clone();
            tasks.spawn(async move {
                let checked = this
                    .check_one(
                        index,
                        unit,
                        identity,
                        duplicate,
                        options.check_existing,
                        &cancel,
                        clock,
                    )
                    .await;
                let result = this
                    .process_checked(checked.clone(), &options, &cancel, clock)
                    .await;
                (checked, result)
            });
        }

        let total = fallback.len();
        let mut pairs = collect(tasks, total).await;
        fill_missing(&mut pairs, fallback, |item| (item.clone(), aborted(item)));
        let (checked, mut items): (Vec<CheckedItem>, Vec<ItemResult>) =
            pairs.into_iter().flatten().unzip();
        settle_duplicates(&mut items);
        (checked, items)
    }

    #[allow(clippy::too_many_arguments)]
    async fn check_one(
        &self,
        index: usize,
        unit: TextUnit,
        identity: CanonicalIdentity,
        duplicate: bool,
        check_existing: bool,
        cancel: &CancellationToken,
        clock: RunClock,
    ) -> CheckedItem {
        if duplicate {
            tracing::debug!(content_hash = %identity.content_hash, index, "Duplicate item skipped");
            return unchecked(index, unit, identity, true);
        }

        let probed = self
            .pools
            .check
            .run(cancel, async {
                let start = clock.now_ms();
                let artifact = if check_existing {
                    self.oracle.check(&identity).await
                } else {
                    self.oracle.check_local_only(&identity).await
                };
                (artifact, clock.span_since(start))
            })
            .await;

        let (artifact, check_span) = match probed {
            Some((artifact, span)) => (Some(artifact), Some(span)),
            None => (None, None),
        };

        CheckedItem {
            index,
            unit,
            identity,
            artifact,
            duplicate: false,
            check_span,
        }
    }

    async fn process_checked(
        &self,
        checked: CheckedItem,
        options: &RunOptions,
        cancel: &CancellationToken,
        clock: RunClock,
    ) -> ItemResult {
        let mut result = ItemResult::from_checked(checked);

        let artifact = match (result.state, result.artifact.clone()) {
            (ItemState::NeedsGeneration, Some(artifact)) => artifact,
            (ItemState::Skipped, _) => return result,
            _ => {
                result.state = ItemState::Cancelled;
                return result;
            }
        };
        if let Some(reason) = &artifact.local_error {
            return local_check_failed(result, reason);
        }

        // One writer per content hash, across every run sharing this orchestrator
        let guard = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                result.state = ItemState::Cancelled;
                return result;
            }
            guard = self.in_flight.acquire(&result.identity.content_hash) => guard,
        };

        // Another run may have written or uploaded since the check phase
        let rechecked = self
            .pools
            .check
            .run(cancel, self.oracle.recheck(&artifact, options.check_existing))
            .await;
        let Some(mut artifact) = rechecked else {
            result.state = ItemState::Cancelled;
            return result;
        };
        if let Some(reason) = artifact.local_error.clone() {
            return local_check_failed(result, &reason);
        }
        if artifact.is_complete() {
            tracing::debug!(
                content_hash = %result.identity.content_hash,
                waited = guard.waited,
                "Completed by a concurrent run"
            );
            result.state = ItemState::Skipped;
            result.artifact = Some(artifact);
            return result;
        }

        if !artifact.exists_local {
            let generated = self
                .pools
                .generation
                .run(cancel, async {
                    let start = clock.now_ms();
                    let outcome = self.generator.generate(&result.identity, &options.voice).await;
                    (outcome, clock.span_since(start))
                })
                .await;

            match generated {
                None => {
                    result.state = ItemState::Cancelled;
                    return result;
                }
                Some((outcome, span)) => {
                    result.timings.generation = Some(span);
                    match outcome {
                        Ok(path) => {
                            artifact.mark_generated(path);
                            result.generated = true;
                            result.state = ItemState::Generated;
                        }
                        Err(e) => {
                            result.state = ItemState::GenerationFailed;
                            result.error = Some(item_error(&e));
                            return result;
                        }
                    }
                }
            }
        }

        let (primary, mirror) = tokio::join!(
            self.upload_if_missing(StoreKind::Primary, &artifact, cancel, clock),
            self.upload_if_missing(StoreKind::Mirror, &artifact, cancel, clock),
        );

        let mut needed = 0;
        let mut started = 0;
        for step in [primary, mirror] {
            match step {
                UploadStep::NotNeeded => {}
                UploadStep::Cancelled(store) => {
                    needed += 1;
                    result.uploads.push(StoreUpload {
                        store,
                        error: Some("cancelled before upload started".to_string()),
                    });
                }
                UploadStep::Finished(upload, span) => {
                    needed += 1;
                    started += 1;
                    result.timings.set_upload(upload.store, span);
                    if upload.succeeded() {
                        artifact.set_store_state(upload.store, StoreState::Present);
                    }
                    result.uploads.push(upload);
                }
            }
        }

        let succeeded = result.uploads.iter().filter(|u| u.succeeded()).count();
        result.state = if needed > 0 && started == 0 {
            ItemState::Cancelled
        } else if succeeded == needed {
            ItemState::UploadComplete
        } else if succeeded == 0 {
            ItemState::UploadFailed
        } else {
            ItemState::UploadPartial
        };

        if result.state == ItemState::UploadFailed || result.state == ItemState::UploadPartial {
            let reasons: Vec<String> = result
                .uploads
                .iter()
                .filter_map(|u| u.error.as_ref().map(|e| format!("{}: {}", u.store, e)))
                .collect();
            result.error = Some(ItemError {
                stage: crate::domain::audio::Stage::Upload,
                message: reasons.join("; "),
                capability_unavailable: false,
            });
        }

        result.artifact = Some(artifact);
        drop(guard);
        result
    }

    async fn upload_if_missing(
        &self,
        store: StoreKind,
        artifact: &AudioArtifact,
        cancel: &CancellationToken,
        clock: RunClock,
    ) -> UploadStep {
        if !artifact.store_state(store).needs_upload() {
            return UploadStep::NotNeeded;
        }

        let uploaded = self
            .pools
            .upload(store)
            .run(cancel, async {
                let start = clock.now_ms();
                let outcome = self.uploader.upload(store, artifact).await;
                (outcome, clock.span_since(start))
            })
            .await;

        match uploaded {
            None => UploadStep::Cancelled(store),
            Some((outcome, span)) => UploadStep::Finished(
                StoreUpload {
                    store,
                    error: outcome.err().map(|e| match e {
                        AudioServiceError::Upload { reason, .. } => reason,
                        other => other.to_string(),
                    }),
                },
                span,
            ),
        }
    }
}

/// Canonicalize every unit and flag later occurrences of a content hash
fn prepare(units: Vec<TextUnit>) -> Vec<(usize, TextUnit, CanonicalIdentity, bool)> {
    let mut seen = HashSet::new();
    units
        .into_iter()
        .enumerate()
        .map(|(index, unit)| {
            let identity = canonicalize(&unit.text);
            let duplicate = !seen.insert(identity.content_hash.clone());
            (index, unit, identity, duplicate)
        })
        .collect()
}

fn unchecked(
    index: usize,
    unit: TextUnit,
    identity: CanonicalIdentity,
    duplicate: bool,
) -> CheckedItem {
    CheckedItem {
        index,
        unit,
        identity,
        artifact: None,
        duplicate,
        check_span: None,
    }
}

/// Result for an item whose run was declined at the gate
fn decline(checked: CheckedItem) -> ItemResult {
    let mut result = ItemResult::from_checked(checked);
    if !result.state.is_terminal() {
        result.state = ItemState::Cancelled;
    }
    result
}

/// Later occurrences of a content hash end the way the first one did
fn settle_duplicates(items: &mut [ItemResult]) {
    let firsts: HashMap<String, (ItemState, Option<ItemError>, Option<AudioArtifact>)> = items
        .iter()
        .filter(|item| !item.duplicate)
        .map(|item| {
            (
                item.identity.content_hash.clone(),
                (item.state, item.error.clone(), item.artifact.clone()),
            )
        })
        .collect();

    for item in items.iter_mut().filter(|item| item.duplicate) {
        if let Some((state, error, artifact)) = firsts.get(&item.identity.content_hash) {
            item.state = *state;
            item.error = error.clone();
            item.artifact = artifact.clone();
        }
    }
}

fn local_check_failed(mut result: ItemResult, reason: &str) -> ItemResult {
    result.state = ItemState::GenerationFailed;
    result.error = Some(item_error(&AudioServiceError::LocalCheckFailed(
        reason.to_string(),
    )));
    result
}

fn aborted(checked: CheckedItem) -> ItemResult {
    let mut result = ItemResult::from_checked(checked);
    result.state = ItemState::Cancelled;
    result.error = Some(ItemError {
        stage: crate::domain::audio::Stage::Generation,
        message: "worker task aborted".to_string(),
        capability_unavailable: false,
    });
    result
}

fn item_error(err: &AudioServiceError) -> ItemError {
    ItemError {
        stage: err.stage(),
        message: err.to_string(),
        capability_unavailable: matches!(err, AudioServiceError::CapabilityUnavailable(_)),
    }
}

trait Indexed {
    fn index(&self) -> usize;
}

impl Indexed for CheckedItem {
    fn index(&self) -> usize {
        self.index
    }
}

impl Indexed for ItemResult {
    fn index(&self) -> usize {
        self.index
    }
}

impl Indexed for (CheckedItem, ItemResult) {
    fn index(&self) -> usize {
        self.0.index
    }
}

/// Drain `tasks` into index order
async fn collect<T>(mut tasks: JoinSet<T>, total: usize) -> Vec<Option<T>>
where
    T: Indexed + Send + 'static,
{
    let mut slots: Vec<Option<T>> = (0..total).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(value) => {
                let index = value.index();
                if let Some(slot) = slots.get_mut(index) {
                    *slot = Some(value);
                }
            }
            Err(e) => tracing::error!(error = %e, "Pipeline worker task failed"),
        }
    }
    slots
}

/// Replace slots lost to a failed task so no item goes unreported
fn fill_missing<T>(
    slots: &mut [Option<T>],
    fallback: Vec<CheckedItem>,
    make: impl Fn(CheckedItem) -> T,
) {
    for item in fallback {
        let index = item.index;
        if let Some(slot @ None) = slots.get_mut(index) {
            *slot = Some(make(item));
        }
    }
}
