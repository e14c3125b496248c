use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use subforge_api::{
    build_router,
    state::{AppState, Engines},
};
use subforge_config::Settings;
use subforge_transcription::testing::{
    EchoTranslator, FakeConverter, ScriptedDiarizer, ScriptedModelLoader,
};
use subforge_transcription::translate::Translator;
use tokio::net::TcpListener;

/// Scripted stand-ins for the recognition, diarization, conversion and
/// translation engines.
pub struct TestEngines {
    pub loader: ScriptedModelLoader,
    pub diarizer: ScriptedDiarizer,
    pub converter: FakeConverter,
    pub translator: Arc<dyn Translator>,
}

impl Default for TestEngines {
    fn default() -> Self {
        Self {
            loader: ScriptedModelLoader::default(),
            diarizer: ScriptedDiarizer::default(),
            converter: FakeConverter::working(),
            translator: Arc::new(EchoTranslator::new("fr")),
        }
    }
}

/// A running test application on an ephemeral port.
pub struct TestApp {
    pub addr: SocketAddr,
    pub base_url: String,
    pub state: AppState,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(TestEngines::default()).await
    }

    /// Spawn a test server wired to the given engines.
    pub async fn spawn_with(engines: TestEngines) -> Self {
        let mut settings = Settings::load().unwrap_or_else(|_| test_settings());
        settings.app.static_dir = None;
        settings.transcription.progress_poll_ms = 10;

        let engines = Engines {
            loader: Arc::new(engines.loader),
            diarizer: Arc::new(engines.diarizer),
            converter: Arc::new(engines.converter),
            translator: engines.translator,
        };
        let state = AppState::with_engines(settings, engines);
        let app = build_router(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let base_url = format!("http://{}", addr);
        let client = reqwest::Client::builder()
            .build()
            .expect("Failed to build HTTP client");

        Self {
            addr,
            base_url,
            state,
            client,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    pub async fn post_form(&self, path: &str, form: Form) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .multipart(form)
            .send()
            .await
            .unwrap()
    }

    /// Waits until `count` log observers are attached to the hub.
    pub async fn wait_for_observers(&self, count: usize) {
        for _ in 0..200 {
            if self.state.hub.subscriber_count() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("observer never subscribed");
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.state.shutdown();
    }
}

/// Multipart part for an uploaded file.
pub fn file_part(filename: &str, data: &[u8]) -> Part {
    Part::bytes(data.to_vec()).file_name(filename.to_string())
}

fn test_settings() -> Settings {
    Settings {
        app: subforge_config::AppSettings {
            host: "127.0.0.1".to_string(),
            port: 0,
            static_dir: None,
            cors_origins: vec![],
        },
        transcription: subforge_config::TranscriptionSettings {
            backend: "remote".to_string(),
            models: ["tiny", "base", "small", "medium", "large", "large-v2"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            default_model: "medium".to_string(),
            whisper_model_dir: "models".to_string(),
            remote_url: "http://127.0.0.1:9".to_string(),
            remote_api_key: None,
            beam_size: 1,
            vad_min_silence_ms: 500,
            supported_extensions: [".mp4", ".mp3", ".wav", ".m4a", ".flac", ".ogg", ".webm"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
            progress_poll_ms: 10,
            ffmpeg_path: None,
        },
        diarization: subforge_config::DiarizationSettings {
            endpoint: "http://127.0.0.1:9".to_string(),
            hf_token: None,
            pipeline: "pyannote/speaker-diarization-3.1".to_string(),
            session_ttl_secs: 3600,
        },
        translation: subforge_config::TranslationSettings {
            ollama_url: "http://127.0.0.1:9/api/generate".to_string(),
            ollama_model: "mistral".to_string(),
            timeout_secs: 5,
        },
    }
}
