use crate::helpers::fakes::FakeTts;
use crate::helpers::{PipelineHarness, DEFAULT_VOICE};
use async_trait::async_trait;
use parking_lot::Mutex;
use phrase_audio_backend::domain::canonical::canonicalize;
use phrase_audio_backend::domain::dataset::EpisodeRange;
use phrase_audio_backend::domain::pipeline::{
    CheckSummary, CheckedItem, ConfirmationGate, RunOptions, RunReport, StagePools,
};
use std::sync::Arc;
use phrase_audio_backend::infrastructure::output::RunOutputWriter;
use phrase_audio_backend::infrastructure::repositories::JsonTextUnitRepository;
use pretty_assertions::assert_eq;
use serde_json::Value;
use std::path::Path;
use tokio_util::sync::CancellationToken;

const DATASET: &str = r#"[
    {"en": "break the ice", "episode_id": 1, "episode_sequence": 1, "sentence_id": 101},
    {"en": "S.P.F.", "episode_id": 1, "episode_sequence": 2, "sentence_id": 102},
    {"en": "Break the ice!", "episode_id": 2, "episode_sequence": 1, "sentence_id": 201},
    {"en": "on the same page", "episode_id": 2, "episode_sequence": 2, "sentence_id": 202},
    {"en": "not selected", "episode_id": 9, "episode_sequence": 1, "sentence_id": 901}
]"#;

fn read_json(path: &Path) -> Value {
    serde_json::from_slice(&std::fs::read(path).expect("output file missing"))
        .expect("output is not JSON")
}

#[tokio::test]
async fn it_should_write_check_missing_and_stats_files_for_a_batch() {
    let harness = PipelineHarness::new();
    let out = tempfile::tempdir().unwrap();
    let data = out.path().join("sentences.json");
    std::fs::write(&data, DATASET).unwrap();

    // "on the same page" is already everywhere
    let done = canonicalize("on the same page");
    harness.seed_everywhere(&done.content_hash, b"mp3").await;

    let range = EpisodeRange::new(1, 2).unwrap();
    let units = JsonTextUnitRepository::new(&data)
        .load_range(range)
        .await
        .unwrap();
    assert_eq!(units.len(), 4);

    let orchestrator = harness.orchestrator(StagePools::new(4, 3, 2, 3));
    let options = RunOptions {
        episode_range: Some(range),
        ..RunOptions::new(DEFAULT_VOICE)
    };
    let cancel = CancellationToken::new();
    let writer = RunOutputWriter::new(out.path().join("runs"), range);

    let checked = orchestrator.check_all(units, &options, &cancel).await;
    let summary = CheckSummary::from_checked(&checked);
    assert_eq!(summary.total, 4);
    assert_eq!(summary.duplicates, 1);
    assert_eq!(summary.complete, 1);
    assert_eq!(summary.needs_work, 2);
    assert_eq!(summary.missing_by_episode.get(&1), Some(&2));

    let check_path = writer.write_check_results(&checked).await.unwrap();
    let missing_path = writer.write_missing(&checked).await.unwrap().unwrap();

    let items = orchestrator.execute(checked, &options, &cancel).await;
    let report = RunReport::from_items(chrono::Utc::now(), Some(range), &items);
    let stats_path = writer.write_report(&report).await.unwrap();

    let check = read_json(&check_path);
    assert_eq!(check["total_sentences"], 3);
    assert_eq!(check["total_episodes"], 2);
    assert_eq!(check["episodes"]["EP1"]["audio_missing_count"], 2);
    assert_eq!(check["episodes"]["EP2"]["audio_exists_count"], 1);
    assert_eq!(check["episodes"]["EP1"]["sentences"][1]["en"], "S.P.F.");

    let missing = read_json(&missing_path);
    let missing = missing.as_array().unwrap();
    assert_eq!(missing.len(), 2);
    assert!(missing.iter().all(|item| item["episode_id"] == 1));
    assert!(missing.iter().all(|item| item["local_exists"] == false));

    let stats = read_json(&stats_path);
    assert_eq!(stats["total"], 4);
    // The repeated "Break the ice!" ends the way its first occurrence did
    assert_eq!(stats["skipped"], 1);
    assert_eq!(stats["duplicates"], 1);
    assert_eq!(stats["generated"], 2);
    assert_eq!(stats["upload_complete"], 3);
    assert_eq!(stats["primary"]["uploaded"], 2);
    assert_eq!(stats["episode_range"]["start"], 1);
    assert!(stats["finished_at"].is_string());

    for path in [&check_path, &missing_path, &stats_path] {
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.contains("_ep1-2_"), "unexpected file name {}", name);
    }
}

#[tokio::test]
async fn it_should_skip_the_missing_file_when_everything_exists() {
    let harness = PipelineHarness::new();
    let out = tempfile::tempdir().unwrap();
    let identity = canonicalize("break the ice");
    harness.seed_everywhere(&identity.content_hash, b"mp3").await;

    let range = EpisodeRange::new(1, 1).unwrap();
    let units = vec![phrase_audio_backend::domain::dataset::TextUnit::new("break the ice")
        .with_episode(1, 1)];

    let checked = harness
        .orchestrator(StagePools::sequential())
        .check_all(units, &RunOptions::new(DEFAULT_VOICE), &CancellationToken::new())
        .await;

    let writer = RunOutputWriter::new(out.path(), range);
    assert_eq!(writer.write_missing(&checked).await.unwrap(), None);
    assert!(!writer.missing_path().exists());
}

/// Writes the check files from inside a gated run, like the sync binary does
struct WritingGate {
    writer: RunOutputWriter,
    tts: Arc<FakeTts>,
    tts_calls_at_check: Mutex<Option<usize>>,
}

#[async_trait]
impl ConfirmationGate for WritingGate {
    async fn checked(&self, checked: &[CheckedItem], _summary: &CheckSummary) {
        *self.tts_calls_at_check.lock() = Some(self.tts.calls());
        self.writer.write_check_results(checked).await.unwrap();
        self.writer.write_missing(checked).await.unwrap();
    }

    async fn confirm(&self, _summary: &CheckSummary) -> bool {
        true
    }
}

#[tokio::test]
async fn it_should_write_check_files_before_generation_in_a_gated_run() {
    let harness = PipelineHarness::new();
    let out = tempfile::tempdir().unwrap();
    let range = EpisodeRange::new(1, 1).unwrap();
    let units = vec![
        phrase_audio_backend::domain::dataset::TextUnit::new("break the ice").with_episode(1, 1),
        phrase_audio_backend::domain::dataset::TextUnit::new("S.P.F.").with_episode(1, 2),
    ];
    let gate = WritingGate {
        writer: RunOutputWriter::new(out.path(), range),
        tts: harness.tts.clone(),
        tts_calls_at_check: Mutex::new(None),
    };
    let options = RunOptions {
        episode_range: Some(range),
        ..RunOptions::new(DEFAULT_VOICE)
    };

    let outcome = harness
        .orchestrator(StagePools::new(4, 3, 2, 3))
        .run(units, &options, Some(&gate), &CancellationToken::new())
        .await;

    assert_eq!(*gate.tts_calls_at_check.lock(), Some(0));
    assert_eq!(harness.tts.calls(), 2);
    assert_eq!(outcome.report.upload_complete, 2);

    let missing = read_json(&gate.writer.missing_path());
    assert_eq!(missing.as_array().unwrap().len(), 2);
    assert!(gate.writer.check_results_path().exists());
}
