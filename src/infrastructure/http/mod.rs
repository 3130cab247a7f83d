pub mod request_id;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::controllers::{health, phrase_audio::PhraseAudioController};
use crate::domain::audio::PhraseAudioService;
use crate::infrastructure::config::Config;

pub use request_id::{request_id_middleware, RequestId, X_REQUEST_ID};

/// All routes with request id and tracing layers applied
pub fn build_router(
    phrase_audio_service: Arc<PhraseAudioService>,
    phrase_audio_controller: Arc<PhraseAudioController>,
) -> Router {
    let audio_routes = Router::new()
        .route(
            "/api/audio/phrase",
            post(PhraseAudioController::generate_phrase_audio),
        )
        .route(
            "/api/sentence/generate-audio",
            post(PhraseAudioController::generate_sentence_audio),
        )
        .route(
            "/api/audio/canonicalize",
            post(PhraseAudioController::canonicalize),
        )
        .route(
            "/api/audio/:content_hash",
            get(PhraseAudioController::get_audio),
        )
        .with_state(phrase_audio_controller);

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::health_ready))
        .with_state(phrase_audio_service)
        .merge(audio_routes)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
}

pub async fn start_http_server(config: Arc<Config>, app: Router) -> anyhow::Result<()> {
    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;

    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
