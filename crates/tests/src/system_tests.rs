use crate::fixtures::test_app::TestApp;
use serde_json::Value;

#[tokio::test]
async fn config_lists_models_languages_and_extensions() {
    let app = TestApp::spawn().await;

    let resp = app.get("/api/config").await;
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();

    let models: Vec<&str> = json["models"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m.as_str().unwrap())
        .collect();
    assert!(models.contains(&"medium"));
    assert_eq!(json["languages"]["Francais"], "fr");
    assert_eq!(json["languages"]["Anglais"], "en");
    assert!(json["extensions"].as_array().unwrap().iter().any(|e| e == ".mp3"));
}

#[tokio::test]
async fn health_reports_tool_availability() {
    let app = TestApp::spawn().await;

    let json: Value = app.get("/api/health").await.json().await.unwrap();
    assert_eq!(json["ffmpeg"], true);
    assert_eq!(json["pyannote"], true);
    assert!(json["ollama"].is_boolean());
}

#[tokio::test]
async fn liveness_endpoint_reports_version() {
    let app = TestApp::spawn().await;

    let json: Value = app.get("/health").await.json().await.unwrap();
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn benchmark_describes_host() {
    let app = TestApp::spawn().await;

    let json: Value = app.get("/api/benchmark").await.json().await.unwrap();
    assert!(json["hardware"]["ram_gb"].as_f64().unwrap() > 0.0);
    assert!(json["hardware"]["cpu_cores"].as_u64().unwrap() >= 1);
    assert_eq!(json["hardware"]["backend"], "scripted");
    assert_eq!(json["recommendations"]["whisper_base"], "Good");
}
