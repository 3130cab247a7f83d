//! Batch audio sync
//!
//! Checks every sentence of an episode range against the local cache and
//! both object stores, then generates and uploads whatever is missing.
//!
//! ```bash
//! audio-sync -s 1 -e 10 [--checks 4] [--audio-workers 3] [--yes]
//! ```

use anyhow::Context;
use async_trait::async_trait;
use clap::Parser;
use parking_lot::Mutex;
use phrase_audio_backend::domain::audio::AudioGenerator;
use phrase_audio_backend::domain::dataset::EpisodeRange;
use phrase_audio_backend::domain::pipeline::{
    CheckSummary, CheckedItem, ConfirmationGate, DelayedConfirmation, PipelineError, RunOptions,
    RunReport, StagePools,
};
use phrase_audio_backend::infrastructure::bootstrap::AudioComponents;
use phrase_audio_backend::infrastructure::config::Config;
use phrase_audio_backend::infrastructure::logging::init_logging;
use phrase_audio_backend::infrastructure::output::RunOutputWriter;
use phrase_audio_backend::infrastructure::repositories::JsonTextUnitRepository;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[clap(name = "audio-sync")]
#[clap(about = "Generate missing sentence audio and sync it to the primary and mirror stores")]
struct Args {
    /// First episode (inclusive, >= 1)
    #[clap(short = 's', long)]
    start: i64,

    /// Last episode (inclusive)
    #[clap(short = 'e', long)]
    end: i64,

    /// Concurrent existence checks
    #[clap(long)]
    checks: Option<usize>,

    /// Concurrent TTS generations
    #[clap(long)]
    audio_workers: Option<usize>,

    /// Concurrent uploads to the primary store
    #[clap(long)]
    primary_workers: Option<usize>,

    /// Concurrent uploads to the mirror store
    #[clap(long)]
    mirror_workers: Option<usize>,

    /// Sentence dataset (JSON array of records)
    #[clap(long, value_name = "FILE", default_value = "data/sentences.json")]
    data_file: PathBuf,

    /// Directory for the run output files
    #[clap(long, value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Voice passed to the TTS backend; defaults to DEFAULT_VOICE
    #[clap(long)]
    voice: Option<String>,

    /// Seconds to wait before generation starts, interruptible with Ctrl-C
    #[clap(long, default_value = "10")]
    confirm_delay: u64,

    /// Start generation right after the check phase
    #[clap(long)]
    yes: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::from_env()?;
    init_logging(&config);

    // Startup checks: nothing is processed when any of these fail
    let range = EpisodeRange::new(args.start, args.end)?;
    let units = JsonTextUnitRepository::new(&args.data_file)
        .load_range(range)
        .await
        .with_context(|| format!("loading {}", args.data_file.display()))?;

    let pools = StagePools::new(
        args.checks.unwrap_or(config.check_concurrency),
        args.audio_workers.unwrap_or(config.generation_concurrency),
        args.primary_workers
            .unwrap_or(config.primary_upload_concurrency),
        args.mirror_workers.unwrap_or(config.mirror_upload_concurrency),
    );

    let components = AudioComponents::from_config(&config).await?;
    tokio::fs::create_dir_all(components.cache.base_dir()).await?;
    let orchestrator = components.orchestrator(&config, pools);

    let options = RunOptions {
        voice: args.voice.unwrap_or_else(|| config.default_voice.clone()),
        check_existing: true,
        episode_range: Some(range),
    };
    let writer = RunOutputWriter::new(&args.output_dir, range);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, no new work will start");
            on_interrupt.cancel();
        }
    });

    tracing::info!(
        episodes = %range.label(),
        sentences = units.len(),
        check = orchestrator.pools().check.capacity(),
        generation = orchestrator.pools().generation.capacity(),
        upload_primary = orchestrator.pools().upload_primary.capacity(),
        upload_mirror = orchestrator.pools().upload_mirror.capacity(),
        "Audio sync starting"
    );

    // Check, then the gate, then generation and upload, all in one run
    let gate = SyncGate {
        writer: &writer,
        generator: orchestrator.generator(),
        delay: DelayedConfirmation::new(Duration::from_secs(args.confirm_delay), cancel.clone()),
        skip_delay: args.yes,
        failure: Mutex::new(None),
    };
    let outcome = orchestrator.run(units, &options, Some(&gate), &cancel).await;

    if let Some(e) = gate.failure.lock().take() {
        return Err(e.into());
    }

    let stats_path = writer.write_report(&outcome.report).await?;
    log_report(&outcome.report);
    tracing::info!(path = %stats_path.display(), "Audio sync finished");

    Ok(())
}

/// Writes the check phase files and holds generation until the operator
/// had a chance to interrupt
struct SyncGate<'a> {
    writer: &'a RunOutputWriter,
    generator: &'a AudioGenerator,
    delay: DelayedConfirmation,
    skip_delay: bool,
    /// First error that must fail the run once it returns
    failure: Mutex<Option<PipelineError>>,
}

impl SyncGate<'_> {
    fn fail(&self, error: PipelineError) {
        tracing::error!(error = %error, "Audio sync stopped before generation");
        self.failure.lock().get_or_insert(error);
    }
}

#[async_trait]
impl ConfirmationGate for SyncGate<'_> {
    async fn checked(&self, checked: &[CheckedItem], summary: &CheckSummary) {
        log_summary(summary);

        if let Err(e) = self.writer.write_check_results(checked).await {
            self.fail(e);
            return;
        }
        if let Err(e) = self.writer.write_missing(checked).await {
            self.fail(e);
        }
    }

    async fn confirm(&self, summary: &CheckSummary) -> bool {
        if self.failure.lock().is_some() {
            return false;
        }

        if summary.local_missing > 0 {
            if let Err(e) = self.generator.check_available().await {
                self.fail(PipelineError::CapabilityUnavailable(e.to_string()));
                return false;
            }
        }

        self.skip_delay || self.delay.confirm(summary).await
    }
}

fn log_summary(summary: &CheckSummary) {
    tracing::info!(
        total = summary.total,
        complete = summary.complete,
        needs_work = summary.needs_work,
        duplicates = summary.duplicates,
        local_missing = summary.local_missing,
        primary_missing = summary.primary_missing,
        mirror_missing = summary.mirror_missing,
        both_missing = summary.both_missing,
        primary_unknown = summary.primary_unknown,
        mirror_unknown = summary.mirror_unknown,
        "Existence check finished"
    );

    for (episode, missing) in &summary.missing_by_episode {
        tracing::info!(episode, missing, "Episode needs work");
    }
}

fn log_report(report: &RunReport) {
    tracing::info!(
        total = report.total,
        skipped = report.skipped,
        duplicates = report.duplicates,
        generated = report.generated,
        local_reused = report.local_reused,
        generation_failed = report.generation_failed,
        upload_complete = report.upload_complete,
        upload_partial = report.upload_partial,
        upload_failed = report.upload_failed,
        cancelled = report.cancelled,
        "Run report"
    );

    for (store, breakdown) in [("primary", &report.primary), ("mirror", &report.mirror)] {
        tracing::info!(
            store,
            existed = breakdown.existed,
            uploaded = breakdown.uploaded,
            upload_failed = breakdown.upload_failed,
            unknown = breakdown.unknown,
            "Store outcome"
        );
    }

    if report.cancelled > 0 {
        tracing::warn!(cancelled = report.cancelled, "Run ended before every item was processed");
    }
}
