use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Local on-disk audio cache keyed by content hash.
///
/// Files live at `{base_dir}/{content_hash}.mp3`. Writes go to a hidden
/// temporary file in the same directory and are renamed into place, so a
/// reader never observes a partially written file.
#[derive(Debug, Clone)]
pub struct LocalAudioCache {
    base_dir: PathBuf,
}

impl LocalAudioCache {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn path_for(&self, content_hash: &str) -> PathBuf {
        self.base_dir.join(format!("{}.mp3", content_hash))
    }

    /// A cached file counts only when it is non-empty
    pub async fn exists(&self, content_hash: &str) -> io::Result<bool> {
        match tokio::fs::metadata(self.path_for(content_hash)).await {
            Ok(metadata) => Ok(metadata.is_file() && metadata.len() > 0),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn read(&self, content_hash: &str) -> io::Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path_for(content_hash)).await {
            Ok(bytes) if !bytes.is_empty() => Ok(Some(bytes)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Write `bytes` for `content_hash` atomically and return the final path
    pub async fn write_atomic(&self, content_hash: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.base_dir).await?;

        let final_path = self.path_for(content_hash);
        let temp_path = self
            .base_dir
            .join(format!(".{}.{}.tmp", content_hash, Uuid::new_v4()));

        if let Err(e) = tokio::fs::write(&temp_path, bytes).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e);
        }

        if let Err(e) = tokio::fs::rename(&temp_path, &final_path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e);
        }

        Ok(final_path)
    }
}
