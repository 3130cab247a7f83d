use crate::domain::dataset::{DatasetError, EpisodeRange, TextUnit};
use std::path::{Path, PathBuf};

/// Loads text units from a JSON dataset file (an array of sentence records)
pub struct JsonTextUnitRepository {
    path: PathBuf,
}

impl JsonTextUnitRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load_all(&self) -> Result<Vec<TextUnit>, DatasetError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DatasetError::SourceNotFound(self.path.display().to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let units: Vec<TextUnit> = serde_json::from_slice(&raw)?;
        tracing::info!(path = %self.path.display(), total = units.len(), "Dataset loaded");
        Ok(units)
    }

    /// Units whose episode falls in `range`, with blank texts dropped and
    /// surrounding whitespace trimmed
    pub async fn load_range(&self, range: EpisodeRange) -> Result<Vec<TextUnit>, DatasetError> {
        let all = self.load_all().await?;
        let total = all.len();

        let selected: Vec<TextUnit> = all
            .into_iter()
            .filter(|unit| unit.episode_id.map(|id| range.contains(id)).unwrap_or(false))
            .filter_map(|mut unit| {
                let trimmed = unit.text.trim();
                if trimmed.is_empty() {
                    return None;
                }
                unit.text = trimmed.to_string();
                Some(unit)
            })
            .collect();

        tracing::info!(
            start = range.start,
            end = range.end,
            total,
            selected = selected.len(),
            "Dataset filtered by episode range"
        );

        Ok(selected)
    }
}
