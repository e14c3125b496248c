use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub app: AppSettings,
    pub transcription: TranscriptionSettings,
    pub diarization: DiarizationSettings,
    pub translation: TranslationSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub host: String,
    pub port: u16,
    pub static_dir: Option<String>,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TranscriptionSettings {
    /// Recognition backend: "remote" or "local_whisper".
    pub backend: String,
    pub models: Vec<String>,
    pub default_model: String,
    /// Directory holding `ggml-<model>.bin` files (local_whisper backend).
    pub whisper_model_dir: String,
    /// Base URL of an OpenAI-compatible speech API (remote backend).
    pub remote_url: String,
    pub remote_api_key: Option<String>,
    pub beam_size: u32,
    pub vad_min_silence_ms: u32,
    pub supported_extensions: Vec<String>,
    pub progress_poll_ms: u64,
    /// Explicit ffmpeg binary. Falls back to a PATH lookup when unset.
    pub ffmpeg_path: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DiarizationSettings {
    pub endpoint: String,
    pub hf_token: Option<String>,
    pub pipeline: String,
    pub session_ttl_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TranslationSettings {
    pub ollama_url: String,
    pub ollama_model: String,
    pub timeout_secs: u64,
}

impl TranslationSettings {
    /// `http://host:port` part of the generate URL, used for health probes.
    pub fn ollama_base(&self) -> &str {
        match self.ollama_url.find("/api/") {
            Some(idx) => &self.ollama_url[..idx],
            None => self.ollama_url.trim_end_matches('/'),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::default()
                    .separator("__")
                    .prefix("SUBFORGE")
                    .list_separator(",")
                    .with_list_parse_key("transcription.models")
                    .with_list_parse_key("transcription.supported_extensions")
                    .with_list_parse_key("app.cors_origins")
                    .try_parsing(true),
            )
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 8000)?
            .set_default("app.static_dir", None::<String>)?
            .set_default("app.cors_origins", Vec::<String>::new())?
            .set_default("transcription.backend", "remote")?
            .set_default(
                "transcription.models",
                vec!["tiny", "base", "small", "medium", "large", "large-v2"],
            )?
            .set_default("transcription.default_model", "medium")?
            .set_default("transcription.whisper_model_dir", "models")?
            .set_default("transcription.remote_url", "http://localhost:8080")?
            .set_default("transcription.remote_api_key", None::<String>)?
            .set_default("transcription.beam_size", 1)?
            .set_default("transcription.vad_min_silence_ms", 500)?
            .set_default(
                "transcription.supported_extensions",
                vec![".mp4", ".mp3", ".wav", ".m4a", ".flac", ".ogg", ".webm"],
            )?
            .set_default("transcription.progress_poll_ms", 300)?
            .set_default("transcription.ffmpeg_path", None::<String>)?
            .set_default("diarization.endpoint", "http://localhost:8090")?
            .set_default("diarization.hf_token", None::<String>)?
            .set_default("diarization.pipeline", "pyannote/speaker-diarization-3.1")?
            .set_default("diarization.session_ttl_secs", 3600)?
            .set_default("translation.ollama_url", "http://localhost:11434/api/generate")?
            .set_default("translation.ollama_model", "mistral")?
            .set_default("translation.timeout_secs", 120)?
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_without_sources() {
        let settings = Settings::load().unwrap();
        assert_eq!(settings.transcription.default_model, "medium");
        assert_eq!(settings.transcription.progress_poll_ms, 300);
        assert_eq!(settings.diarization.session_ttl_secs, 3600);
        assert!(
            settings
                .transcription
                .supported_extensions
                .iter()
                .any(|e| e == ".m4a")
        );
    }

    #[test]
    fn ollama_base_strips_api_path() {
        let t = TranslationSettings {
            ollama_url: "http://localhost:11434/api/generate".to_string(),
            ollama_model: "mistral".to_string(),
            timeout_secs: 120,
        };
        assert_eq!(t.ollama_base(), "http://localhost:11434");
    }
}
