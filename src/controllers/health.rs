use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;

use crate::domain::audio::{PhraseAudioService, PhraseAudioServiceApi};

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /health/ready - probes the TTS backend
pub async fn health_ready(State(service): State<Arc<PhraseAudioService>>) -> impl IntoResponse {
    let readiness = service.readiness().await;

    if readiness.ready {
        (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "tts": "available",
                "tts_provider": readiness.tts_provider,
            })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "not_ready",
                "tts": "unavailable",
                "tts_provider": readiness.tts_provider,
                "error": readiness.tts_error,
            })),
        )
    }
}
