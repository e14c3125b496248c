use crate::fixtures::test_app::{TestApp, TestEngines, file_part};
use reqwest::multipart::Form;
use serde_json::Value;
use subforge_transcription::testing::{FakeConverter, ScriptedModelLoader};

const EXPECTED_SRT: &str = "1\n00:00:00,000 --> 00:00:01,500\nHello there.\n\n\
                            2\n00:00:01,500 --> 00:00:03,000\nGeneral Kenobi.\n";

#[tokio::test]
async fn single_file_returns_subtitles() {
    let app = TestApp::spawn().await;

    let form = Form::new()
        .part("file", file_part("talk.mp3", b"audio"))
        .text("model_name", "small")
        .text("audio_lang", "en")
        .text("target_lang", "en");
    let resp = app.post_form("/api/transcribe", form).await;

    assert_eq!(resp.status().as_u16(), 200);
    assert!(
        resp.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/plain")
    );
    assert_eq!(resp.text().await.unwrap(), EXPECTED_SRT);
    assert!(app.state.models.is_loaded("small"));
}

#[tokio::test]
async fn missing_file_field_is_rejected() {
    let app = TestApp::spawn().await;

    let form = Form::new().text("model_name", "small");
    let resp = app.post_form("/api/transcribe", form).await;
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn unknown_model_is_rejected_before_loading() {
    let app = TestApp::spawn().await;

    let form = Form::new()
        .part("file", file_part("talk.mp3", b"audio"))
        .text("model_name", "../../weights/evil");
    let resp = app.post_form("/api/transcribe", form).await;

    assert_eq!(resp.status().as_u16(), 400);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["message"], "Unknown model: ../../weights/evil");
    assert!(app.state.models.loaded_models().is_empty());
}

#[tokio::test]
async fn missing_ffmpeg_is_a_server_error() {
    let app = TestApp::spawn_with(TestEngines {
        converter: FakeConverter::missing(),
        ..TestEngines::default()
    })
    .await;

    let form = Form::new().part("file", file_part("talk.mp3", b"audio"));
    let resp = app.post_form("/api/transcribe", form).await;

    assert_eq!(resp.status().as_u16(), 500);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["message"], "FFmpeg not found in PATH");
}

#[tokio::test]
async fn batch_keeps_going_after_a_failed_item() {
    let app = TestApp::spawn_with(TestEngines {
        loader: ScriptedModelLoader::default().failing_media("broken"),
        ..TestEngines::default()
    })
    .await;

    let form = Form::new()
        .part("files", file_part("one.mp3", b"1"))
        .part("files", file_part("broken.wav", b"2"))
        .part("files", file_part("three.MP4", b"3"));
    let resp = app.post_form("/api/transcribe-batch", form).await;

    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    let outputs = json.as_object().unwrap();
    assert_eq!(outputs.len(), 2);
    assert_eq!(outputs["one.srt"], EXPECTED_SRT);
    assert_eq!(outputs["three.srt"], EXPECTED_SRT);
}

#[tokio::test]
async fn batch_without_media_files_is_a_bad_request() {
    let app = TestApp::spawn().await;

    let form = Form::new()
        .part("files", file_part("notes.txt", b"hello"))
        .part("files", file_part("slides.pdf", b"%PDF"));
    let resp = app.post_form("/api/transcribe-batch", form).await;

    assert_eq!(resp.status().as_u16(), 400);
}
