use serde::{Deserialize, Serialize};

/// One raw text to voice, with the grouping metadata carried by the dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextUnit {
    #[serde(rename = "en", alias = "text")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentence_id: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_sequence: Option<i64>,
}

impl TextUnit {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            episode_id: None,
            sentence_id: None,
            episode_sequence: None,
        }
    }

    pub fn with_episode(mut self, episode_id: i64, episode_sequence: i64) -> Self {
        self.episode_id = Some(episode_id);
        self.episode_sequence = Some(episode_sequence);
        self
    }
}

/// Inclusive episode range selecting part of a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeRange {
    pub start: i64,
    pub end: i64,
}

impl EpisodeRange {
    pub fn new(start: i64, end: i64) -> Result<Self, super::DatasetError> {
        if start < 1 {
            return Err(super::DatasetError::InvalidRange(format!(
                "start episode must be >= 1, got {}",
                start
            )));
        }
        if end < start {
            return Err(super::DatasetError::InvalidRange(format!(
                "end episode ({}) cannot be lower than start episode ({})",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, episode_id: i64) -> bool {
        (self.start..=self.end).contains(&episode_id)
    }

    pub fn episode_count(&self) -> i64 {
        self.end - self.start + 1
    }

    /// `ep{start}-{end}`, used in output file names
    pub fn label(&self) -> String {
        format!("ep{}-{}", self.start, self.end)
    }
}
