use phrase_audio_backend::controllers::phrase_audio::PhraseAudioController;
use phrase_audio_backend::domain::audio::{
    AudioGenerator, AudioUploader, ExistenceOracle, GeneratorSettings, ObjectKeyLayout,
    PhraseAudioService,
};
use phrase_audio_backend::domain::pipeline::{PipelineOrchestrator, StagePools};
use phrase_audio_backend::infrastructure::http::build_router;
use phrase_audio_backend::infrastructure::repositories::LocalAudioCache;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use test_context::AsyncTestContext;
use tokio::net::TcpListener;

pub mod api_client;

use api_client::TestClient;
use fakes::{FakeTts, InMemoryObjectStore};

pub const KEY_PREFIX: &str = "audio/sentences";
pub const DEFAULT_VOICE: &str = "alloy";

/// Orchestrator over in-memory stores, a fake TTS and a temporary cache dir
pub struct PipelineHarness {
    pub tts: Arc<FakeTts>,
    pub primary: Arc<InMemoryObjectStore>,
    pub mirror: Arc<InMemoryObjectStore>,
    pub cache: Arc<LocalAudioCache>,
    pub layout: ObjectKeyLayout,
    settings: GeneratorSettings,
    upload_retries: u32,
    _dir: TempDir,
}

impl PipelineHarness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        Self {
            tts: Arc::new(FakeTts::new()),
            primary: Arc::new(InMemoryObjectStore::new("primary-test")),
            mirror: Arc::new(InMemoryObjectStore::new("mirror-test")),
            cache: Arc::new(LocalAudioCache::new(dir.path())),
            layout: ObjectKeyLayout::new(KEY_PREFIX),
            settings: GeneratorSettings {
                timeout: Duration::from_secs(5),
                max_retries: 2,
                backoff_initial: Duration::ZERO,
                backoff_max: Duration::ZERO,
            },
            upload_retries: 0,
            _dir: dir,
        }
    }

    /// Point the local cache somewhere else, e.g. a path that cannot be read
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache = Arc::new(LocalAudioCache::new(dir));
        self
    }

    pub fn with_generator_settings(mut self, settings: GeneratorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn orchestrator(&self, pools: StagePools) -> PipelineOrchestrator {
        let oracle = ExistenceOracle::new(
            self.cache.clone(),
            self.primary.clone(),
            self.mirror.clone(),
            self.layout.clone(),
        );
        let generator = AudioGenerator::new(self.tts.clone(), self.cache.clone(), self.settings.clone());
        let uploader = AudioUploader::new(
            self.cache.clone(),
            self.primary.clone(),
            self.mirror.clone(),
            self.upload_retries,
        );

        PipelineOrchestrator::new(
            Arc::new(oracle),
            Arc::new(generator),
            Arc::new(uploader),
            pools,
        )
    }

    pub fn key_for(&self, content_hash: &str) -> String {
        self.layout.key_for(content_hash)
    }

    pub fn local_path(&self, content_hash: &str) -> PathBuf {
        self.cache.path_for(content_hash)
    }

    /// Put audio for `content_hash` on local disk and both stores
    pub async fn seed_everywhere(&self, content_hash: &str, bytes: &[u8]) {
        self.seed_local(content_hash, bytes).await;
        let key = self.key_for(content_hash);
        self.primary.insert(&key, bytes);
        self.mirror.insert(&key, bytes);
    }

    pub async fn seed_local(&self, content_hash: &str, bytes: &[u8]) {
        self.cache
            .write_atomic(content_hash, bytes)
            .await
            .expect("Failed to seed local audio");
    }
}

/// The HTTP app served on an ephemeral port, backed by a [`PipelineHarness`]
pub struct TestContext {
    pub client: TestClient,
    pub harness: PipelineHarness,
}

impl AsyncTestContext for TestContext {
    fn setup() -> impl std::future::Future<Output = Self> + Send {
        async {
            let harness = PipelineHarness::new();
            let orchestrator = harness.orchestrator(StagePools::new(4, 3, 2, 3));

            let service = Arc::new(PhraseAudioService::new(
                orchestrator,
                harness.cache.clone(),
                DEFAULT_VOICE.to_string(),
            ));
            let controller = Arc::new(PhraseAudioController::new(service.clone()));
            let app = build_router(service, controller);

            let listener = TcpListener::bind("127.0.0.1:0")
                .await
                .expect("Failed to bind listener");
            let addr = listener.local_addr().expect("Failed to get local addr");
            let base_url = format!("http://{}", addr);

            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });

            // Wait for server to be ready
            tokio::time::sleep(Duration::from_millis(50)).await;

            Self {
                client: TestClient::new(&base_url),
                harness,
            }
        }
    }

    fn teardown(self) -> impl std::future::Future<Output = ()> + Send {
        async {
            // Temp dir is removed when the harness drops
        }
    }
}
