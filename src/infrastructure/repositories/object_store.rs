use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ObjectStoreError {
    #[error("object store request failed: {0}")]
    Request(String),
    #[error("object store not configured: {0}")]
    NotConfigured(String),
}

/// Minimal remote object store primitives.
///
/// `exists` must distinguish a confirmed absence (`Ok(false)`) from a probe
/// that could not complete (`Err`). `put` overwrites: repeating it with the
/// same key and bytes is harmless.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Human readable store name (bucket or provider) for logs
    fn name(&self) -> &str;

    async fn exists(&self, key: &str) -> Result<bool, ObjectStoreError>;

    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<(), ObjectStoreError>;

    /// Fetch an object; `Ok(None)` when it does not exist
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ObjectStoreError>;
}
