use crate::fixtures::test_app::{TestApp, TestEngines, file_part};
use reqwest::multipart::Form;
use serde_json::Value;
use subforge_transcription::testing::ScriptedDiarizer;

async fn diarize(app: &TestApp) -> String {
    let form = Form::new().part("file", file_part("panel.wav", b"audio"));
    let resp = app.post_form("/api/diarize", form).await;
    assert_eq!(resp.status().as_u16(), 200);

    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["num_speakers"], 2);
    assert_eq!(json["speakers"], serde_json::json!(["SPEAKER_00", "SPEAKER_01"]));
    json["session_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn diarized_transcription_uses_display_names() {
    let app = TestApp::spawn().await;
    let session_id = diarize(&app).await;
    assert_eq!(app.state.sessions.len(), 1);

    let form = Form::new()
        .text("session_id", session_id)
        .text("model_name", "base")
        .text("speaker_names", r#"{"SPEAKER_01": "Bob"}"#);
    let resp = app.post_form("/api/transcribe-diarized", form).await;

    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(
        resp.text().await.unwrap(),
        "1\n00:00:00,000 --> 00:00:01,500\n[SPEAKER_00]: Hello there.\n\n\
         2\n00:00:01,500 --> 00:00:03,000\n[Bob]: General Kenobi.\n"
    );
    assert!(app.state.sessions.is_empty());
}

#[tokio::test]
async fn session_cannot_be_used_twice() {
    let app = TestApp::spawn().await;
    let session_id = diarize(&app).await;

    let first = app
        .post_form(
            "/api/transcribe-diarized",
            Form::new().text("session_id", session_id.clone()),
        )
        .await;
    assert_eq!(first.status().as_u16(), 200);

    let second = app
        .post_form(
            "/api/transcribe-diarized",
            Form::new().text("session_id", session_id),
        )
        .await;
    assert_eq!(second.status().as_u16(), 404);
    let json: Value = second.json().await.unwrap();
    assert_eq!(json["error"], "not_found");
}

#[tokio::test]
async fn unknown_session_id_is_not_found() {
    let app = TestApp::spawn().await;

    for id in [uuid::Uuid::new_v4().to_string(), "not-a-session".to_string()] {
        let resp = app
            .post_form("/api/transcribe-diarized", Form::new().text("session_id", id))
            .await;
        assert_eq!(resp.status().as_u16(), 404);
    }
}

#[tokio::test]
async fn malformed_speaker_names_are_rejected() {
    let app = TestApp::spawn().await;
    let session_id = diarize(&app).await;

    let form = Form::new()
        .text("session_id", session_id)
        .text("speaker_names", "{not json");
    let resp = app.post_form("/api/transcribe-diarized", form).await;

    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn diarization_without_token_is_a_configuration_error() {
    let app = TestApp::spawn_with(TestEngines {
        diarizer: ScriptedDiarizer::unconfigured(),
        ..TestEngines::default()
    })
    .await;

    let form = Form::new().part("file", file_part("panel.wav", b"audio"));
    let resp = app.post_form("/api/diarize", form).await;

    assert_eq!(resp.status().as_u16(), 500);
    assert!(app.state.sessions.is_empty());
}
