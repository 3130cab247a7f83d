//! Dependency wiring shared by the HTTP server and the batch CLI

use crate::domain::audio::{
    AudioGenerator, AudioUploader, ExistenceOracle, GeneratorSettings, ObjectKeyLayout,
};
use crate::domain::pipeline::{PipelineOrchestrator, StagePools};
use crate::infrastructure::config::{Config, TtsProvider};
use crate::infrastructure::repositories::{
    LocalAudioCache, ObjectStore, OpenAiTtsRepository, PollyTtsRepository, S3ObjectStore,
    TtsRepository,
};
use anyhow::Context;
use async_openai::config::OpenAIConfig;
use std::sync::Arc;
use std::time::Duration;

/// Collaborators a pipeline is assembled from
pub struct AudioComponents {
    pub tts: Arc<dyn TtsRepository>,
    pub primary: Arc<dyn ObjectStore>,
    pub mirror: Arc<dyn ObjectStore>,
    pub cache: Arc<LocalAudioCache>,
}

impl AudioComponents {
    /// Real adapters as selected by `config`
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let tts = build_tts_repository(config).await?;

        let primary = S3ObjectStore::from_config("primary", &config.primary_store)
            .context("primary store")?;
        let mirror =
            S3ObjectStore::from_config("mirror", &config.mirror_store).context("mirror store")?;

        Ok(Self {
            tts,
            primary: Arc::new(primary),
            mirror: Arc::new(mirror),
            cache: Arc::new(LocalAudioCache::new(config.audio_output_dir.clone())),
        })
    }

    pub fn orchestrator(&self, config: &Config, pools: StagePools) -> PipelineOrchestrator {
        let layout = ObjectKeyLayout::new(&config.object_key_prefix);

        let oracle = ExistenceOracle::new(
            self.cache.clone(),
            self.primary.clone(),
            self.mirror.clone(),
            layout,
        );
        let generator = AudioGenerator::new(
            self.tts.clone(),
            self.cache.clone(),
            generator_settings(config),
        );
        let uploader = AudioUploader::new(
            self.cache.clone(),
            self.primary.clone(),
            self.mirror.clone(),
            config.upload_max_retries,
        );

        PipelineOrchestrator::new(
            Arc::new(oracle),
            Arc::new(generator),
            Arc::new(uploader),
            pools,
        )
    }
}

pub fn generator_settings(config: &Config) -> GeneratorSettings {
    GeneratorSettings {
        timeout: Duration::from_secs(config.tts_timeout_seconds),
        max_retries: config.tts_max_retries,
        backoff_initial: Duration::from_millis(config.tts_retry_backoff_ms),
        backoff_max: Duration::from_millis(config.tts_retry_backoff_max_ms),
    }
}

pub fn stage_pools(config: &Config) -> StagePools {
    StagePools::new(
        config.check_concurrency,
        config.generation_concurrency,
        config.primary_upload_concurrency,
        config.mirror_upload_concurrency,
    )
}

async fn build_tts_repository(config: &Config) -> anyhow::Result<Arc<dyn TtsRepository>> {
    match config.tts_provider {
        TtsProvider::Polly => {
            tracing::info!(region = %config.aws_region, engine = %config.polly_engine, "Initializing AWS Polly client");

            let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
                .region(aws_config::Region::new(config.aws_region.clone()))
                .retry_config(aws_config::retry::RetryConfig::disabled())
                .load()
                .await;
            let client = Arc::new(PollyTtsRepository::client(&aws_config));

            Ok(Arc::new(PollyTtsRepository::new(client, &config.polly_engine)))
        }
        TtsProvider::OpenAi => {
            let api_key = config
                .openai_api_key
                .clone()
                .context("OPENAI_API_KEY is required for the openai provider")?;
            tracing::info!(model = %config.openai_tts_model, "Initializing OpenAI speech client");

            let client = Arc::new(async_openai::Client::with_config(
                OpenAIConfig::new().with_api_key(api_key),
            ));

            Ok(Arc::new(OpenAiTtsRepository::new(
                client,
                config.openai_tts_model.clone(),
            )))
        }
    }
}
