use std::sync::Arc;

use crate::fixtures::test_app::{TestApp, TestEngines, file_part};
use reqwest::multipart::Form;
use subforge_transcription::testing::UnreachableTranslator;

const SRT: &str = "1\n00:00:00,000 --> 00:00:01,000\nGood morning\n\n\
                   2\n00:00:01,000 --> 00:00:02,500\nSee you\nsoon\n";

#[tokio::test]
async fn subtitles_are_translated_block_by_block() {
    let app = TestApp::spawn().await;

    let form = Form::new()
        .part("file", file_part("talk.srt", SRT.as_bytes()))
        .text("source_lang", "en")
        .text("target_lang", "fr");
    let resp = app.post_form("/api/ollama/translate-srt", form).await;

    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(
        resp.text().await.unwrap(),
        "1\n00:00:00,000 --> 00:00:01,000\n[fr] Good morning\n\n\
         2\n00:00:01,000 --> 00:00:02,500\n[fr] See you soon\n"
    );
}

#[tokio::test]
async fn unreachable_translator_returns_text_unchanged() {
    let app = TestApp::spawn_with(TestEngines {
        translator: Arc::new(UnreachableTranslator),
        ..TestEngines::default()
    })
    .await;

    let form = Form::new().part("file", file_part("notes.txt", b"Bonjour tout le monde"));
    let resp = app.post_form("/api/ollama/translate-text", form).await;

    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.text().await.unwrap(), "Bonjour tout le monde");
}

#[tokio::test]
async fn binary_upload_is_rejected() {
    let app = TestApp::spawn().await;

    let form = Form::new().part("file", file_part("talk.srt", &[0xff, 0xfe, 0x00]));
    let resp = app.post_form("/api/ollama/translate-srt", form).await;

    assert_eq!(resp.status().as_u16(), 400);
}
