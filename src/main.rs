use phrase_audio_backend::controllers::phrase_audio::PhraseAudioController;
use phrase_audio_backend::domain::audio::PhraseAudioService;
use phrase_audio_backend::infrastructure::bootstrap::{stage_pools, AudioComponents};
use phrase_audio_backend::infrastructure::config::Config;
use phrase_audio_backend::infrastructure::http::{build_router, start_http_server};
use phrase_audio_backend::infrastructure::logging::init_logging;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_logging(&config);

    tracing::info!(
        "Starting Phrase Audio Backend on {}:{}",
        config.host,
        config.port
    );

    // Repositories and external clients
    let components = AudioComponents::from_config(&config).await?;
    tokio::fs::create_dir_all(components.cache.base_dir()).await?;
    tracing::info!(
        provider = components.tts.provider(),
        audio_dir = %components.cache.base_dir().display(),
        "Audio components ready"
    );

    // Services
    let orchestrator = components.orchestrator(&config, stage_pools(&config));
    let service = Arc::new(PhraseAudioService::new(
        orchestrator,
        components.cache.clone(),
        config.default_voice.clone(),
    ));

    // Controllers
    let controller = Arc::new(PhraseAudioController::new(service.clone()));

    let app = build_router(service, controller);
    start_http_server(Arc::new(config), app).await?;

    Ok(())
}
