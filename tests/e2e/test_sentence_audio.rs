use crate::helpers::{TestContext, KEY_PREFIX};
use hyper::StatusCode;
use phrase_audio_backend::domain::audio::{PhraseAudioResponse, SentenceAudioResponse};
use phrase_audio_backend::domain::canonical::canonicalize;
use phrase_audio_backend::infrastructure::repositories::TtsRepositoryError;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use test_context::test_context;

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_generate_a_batch_of_sentences(ctx: &TestContext) {
    let existing = canonicalize("on the same page");
    ctx.harness
        .seed_everywhere(&existing.content_hash, b"existing")
        .await;

    let response = ctx
        .client
        .post(
            "/api/sentence/generate-audio",
            &json!({
                "sentences": [
                    { "en": "break the ice", "episode_id": 1, "sentence_id": 101 },
                    { "en": "on the same page" },
                    { "en": "Break the ice!" }
                ]
            }),
        )
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    let body: SentenceAudioResponse = response.json().unwrap();
    let identity = canonicalize("break the ice");
    let key = format!("{}/{}.mp3", KEY_PREFIX, identity.content_hash);

    assert_eq!(body.results.len(), 3);
    let first = &body.results[0];
    assert_eq!(first.sentence_hash, identity.content_hash);
    assert_eq!(first.en, "break the ice");
    assert!(first.audio_generated);
    assert!(first.uploaded_primary);
    assert!(first.uploaded_mirror);
    assert_eq!(first.primary_object_key.as_deref(), Some(key.as_str()));
    assert!(first.local_file_path.is_some());
    assert_eq!(first.error, None);

    let skipped = &body.results[1];
    assert!(skipped.audio_generated);
    assert!(!skipped.uploaded_primary);
    assert!(skipped.primary_object_key.is_some());

    // Same hash as the first sentence; shares its outcome without a second upload
    let repeated = &body.results[2];
    assert_eq!(repeated.sentence_hash, identity.content_hash);
    assert!(repeated.audio_generated);
    assert_eq!(repeated.primary_object_key.as_deref(), Some(key.as_str()));
    assert!(!repeated.uploaded_primary);

    assert_eq!(body.statistics.total_sentences, 3);
    assert_eq!(body.statistics.audio_generated, 3);
    assert_eq!(body.statistics.audio_failed, 0);
    assert_eq!(body.statistics.audio_success_rate, 1.0);
    assert_eq!(body.statistics.files_collected_for_upload, 1);
    assert_eq!(body.statistics.newly_generated, 1);
    assert_eq!(body.statistics.already_existed, 1);

    assert_eq!(body.primary_upload_stats.uploaded, 1);
    assert_eq!(body.primary_upload_stats.existed, 1);
    assert_eq!(body.mirror_upload_stats.uploaded, 1);
    assert_eq!(ctx.harness.tts.calls(), 1);
    assert_eq!(ctx.harness.primary.puts(), 1);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_report_failed_sentences_in_the_batch(ctx: &TestContext) {
    ctx.harness
        .tts
        .push_outcome(Err(TtsRepositoryError::Rejected("text too long".into())));

    let response = ctx
        .client
        .post(
            "/api/sentence/generate-audio",
            &json!({ "sentences": [{ "en": "break the ice" }] }),
        )
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    let body: SentenceAudioResponse = response.json().unwrap();

    assert!(!body.results[0].audio_generated);
    assert!(body.results[0].error.as_ref().unwrap().contains("text too long"));
    assert_eq!(body.statistics.audio_failed, 1);
    assert_eq!(body.statistics.audio_success_rate, 0.0);
    assert_eq!(body.statistics.files_collected_for_upload, 0);
    assert_eq!(ctx.harness.primary.puts(), 0);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_an_empty_batch(ctx: &TestContext) {
    let response = ctx
        .client
        .post("/api/sentence/generate-audio", &json!({ "sentences": [] }))
        .await
        .unwrap();

    response
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_error_message("sentences cannot be empty");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_a_blank_sentence(ctx: &TestContext) {
    let response = ctx
        .client
        .post(
            "/api/sentence/generate-audio",
            &json!({ "sentences": [{ "en": "break the ice" }, { "en": "  " }] }),
        )
        .await
        .unwrap();

    response
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_error_message("sentence 1 has no text");
    assert_eq!(ctx.harness.tts.calls(), 0);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_return_503_for_a_batch_when_tts_is_unreachable(ctx: &TestContext) {
    ctx.harness.tts.set_unavailable(true);

    let response = ctx
        .client
        .post(
            "/api/sentence/generate-audio",
            &json!({ "sentences": [{ "en": "break the ice" }] }),
        )
        .await
        .unwrap();

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_write_a_phrase_once_for_concurrent_requests(ctx: &TestContext) {
    ctx.harness.tts.set_delay(Duration::from_millis(50));
    let phrase = json!({ "text": "break the ice" });
    let batch = json!({ "sentences": [{ "en": "break the ice" }] });

    let (first, second) = tokio::join!(
        ctx.client.post("/api/audio/phrase", &phrase),
        ctx.client.post("/api/sentence/generate-audio", &batch),
    );

    first.unwrap().assert_status(StatusCode::OK);
    second.unwrap().assert_status(StatusCode::OK);
    assert_eq!(ctx.harness.tts.calls(), 1);
    assert_eq!(ctx.harness.primary.puts(), 1);
    assert_eq!(ctx.harness.mirror.puts(), 1);

    let again = ctx.client.post("/api/audio/phrase", &phrase).await.unwrap();
    let again: PhraseAudioResponse = again.json().unwrap();
    assert!(again.primary_existed);
}
