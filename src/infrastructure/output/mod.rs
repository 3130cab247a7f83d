use crate::domain::dataset::EpisodeRange;
use crate::domain::pipeline::{CheckResults, CheckedItem, MissingItem, PipelineError, RunReport};
use chrono::Local;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Writes the JSON artifacts of one batch run.
///
/// File names share the episode range label and a timestamp taken when the
/// writer is created, so the files of one run sort together.
pub struct RunOutputWriter {
    dir: PathBuf,
    suffix: String,
}

impl RunOutputWriter {
    pub fn new(dir: impl Into<PathBuf>, range: EpisodeRange) -> Self {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        Self {
            dir: dir.into(),
            suffix: format!("{}_{}", range.label(), timestamp),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn missing_path(&self) -> PathBuf {
        self.dir.join(format!("missing_audio_{}.json", self.suffix))
    }

    pub fn check_results_path(&self) -> PathBuf {
        self.dir
            .join(format!("audio_check_results_{}.json", self.suffix))
    }

    pub fn stats_path(&self) -> PathBuf {
        self.dir.join(format!("audio_stats_{}.json", self.suffix))
    }

    /// Items missing from at least one store; no file when nothing is missing
    pub async fn write_missing(
        &self,
        checked: &[CheckedItem],
    ) -> Result<Option<PathBuf>, PipelineError> {
        let missing = MissingItem::collect(checked);
        if missing.is_empty() {
            tracing::info!("No missing audio, skipping missing-items file");
            return Ok(None);
        }

        let path = self.missing_path();
        self.write_json(&path, &missing).await?;
        Ok(Some(path))
    }

    pub async fn write_check_results(
        &self,
        checked: &[CheckedItem],
    ) -> Result<PathBuf, PipelineError> {
        let path = self.check_results_path();
        self.write_json(&path, &CheckResults::from_checked(checked))
            .await?;
        Ok(path)
    }

    pub async fn write_report(&self, report: &RunReport) -> Result<PathBuf, PipelineError> {
        let path = self.stats_path();
        self.write_json(&path, report).await?;
        Ok(path)
    }

    async fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), PipelineError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let body = serde_json::to_vec_pretty(value)?;
        tokio::fs::write(path, body).await?;
        tracing::info!(path = %path.display(), "Run output written");
        Ok(())
    }
}
