pub mod model;

pub use model::{EpisodeRange, TextUnit};

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("input source not found: {0}")]
    SourceNotFound(String),
    #[error("invalid episode range: {0}")]
    InvalidRange(String),
    #[error("failed to parse input source: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read input source: {0}")]
    Io(#[from] std::io::Error),
}
