use super::object_store::{ObjectStore, ObjectStoreError};
use crate::infrastructure::config::StoreConfig;
use async_trait::async_trait;
use aws_sdk_s3::{
    config::{retry::RetryConfig, BehaviorVersion, Credentials, Region},
    primitives::ByteStream,
    Client as S3Client,
};

/// S3-compatible bucket (Cloudflare R2, Tencent COS, AWS S3, MinIO)
pub struct S3ObjectStore {
    client: S3Client,
    bucket: String,
    label: String,
}

impl S3ObjectStore {
    pub fn new(client: S3Client, bucket: String, label: String) -> Self {
        Self {
            client,
            bucket,
            label,
        }
    }

    /// Build a client with static credentials and an optional custom endpoint.
    ///
    /// SDK-level retries are off: the uploader owns the retry budget.
    pub fn from_config(label: &str, config: &StoreConfig) -> Result<Self, ObjectStoreError> {
        if config.bucket.is_empty() {
            return Err(ObjectStoreError::NotConfigured(format!(
                "{} bucket name is empty",
                label
            )));
        }

        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
            None,
            "phrase-audio-static",
        );

        let mut builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .retry_config(RetryConfig::disabled())
            .force_path_style(true);

        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }

        let client = S3Client::from_conf(builder.build());

        tracing::info!(
            store = label,
            bucket = %config.bucket,
            region = %config.region,
            endpoint = ?config.endpoint_url,
            "S3-compatible object store configured"
        );

        Ok(Self::new(client, config.bucket.clone(), label.to_string()))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn name(&self) -> &str {
        &self.label
    }

    async fn exists(&self, key: &str) -> Result<bool, ObjectStoreError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => {
                if err
                    .as_service_error()
                    .map(|e| e.is_not_found())
                    .unwrap_or(false)
                {
                    return Ok(false);
                }
                if err.raw_response().map(|r| r.status().as_u16()) == Some(404) {
                    return Ok(false);
                }
                tracing::debug!(store = %self.label, key = key, error = ?err, "HEAD object failed");
                Err(ObjectStoreError::Request(format!("{:?}", err)))
            }
        }
    }

    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        let size = bytes.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| ObjectStoreError::Request(format!("{:?}", e)))?;

        tracing::debug!(store = %self.label, key = key, size_bytes = size, "Object uploaded");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ObjectStoreError> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) => {
                if err
                    .as_service_error()
                    .map(|e| e.is_no_such_key())
                    .unwrap_or(false)
                {
                    return Ok(None);
                }
                return Err(ObjectStoreError::Request(format!("{:?}", err)));
            }
        };

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| ObjectStoreError::Request(e.to_string()))?;

        Ok(Some(data.into_bytes().to_vec()))
    }
}
