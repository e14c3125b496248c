use std::sync::Arc;
use std::time::Duration;

use subforge_config::Settings;
use subforge_transcription::{
    BroadcastHub, DiarizationEngine, JobOrchestrator, ModelCache, ModelLoader, PipelineConfig,
    SessionStore,
    asr::remote::RemoteModelLoader,
    convert::{AudioConverter, FfmpegConverter},
    diarization::remote::RemoteDiarization,
    translate::{OllamaTranslator, Translator},
};
use tracing::info;

/// Engine implementations behind the pipeline seams.
pub struct Engines {
    pub loader: Arc<dyn ModelLoader>,
    pub diarizer: Arc<dyn DiarizationEngine>,
    pub converter: Arc<dyn AudioConverter>,
    pub translator: Arc<dyn Translator>,
}

impl Engines {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let ffmpeg = FfmpegConverter::new(settings.transcription.ffmpeg_path.as_deref());
        let loader = recognition_backend(settings, &ffmpeg)?;

        let diarizer = Arc::new(RemoteDiarization::new(
            &settings.diarization.endpoint,
            settings.diarization.hf_token.clone(),
            &settings.diarization.pipeline,
        ));
        let translator = Arc::new(OllamaTranslator::new(
            &settings.translation.ollama_url,
            &settings.translation.ollama_model,
            Duration::from_secs(settings.translation.timeout_secs),
        )?);

        Ok(Self {
            loader,
            diarizer,
            converter: Arc::new(ffmpeg),
            translator,
        })
    }
}

fn recognition_backend(settings: &Settings, ffmpeg: &FfmpegConverter) -> anyhow::Result<Arc<dyn ModelLoader>> {
    let transcription = &settings.transcription;
    match transcription.backend.as_str() {
        "remote" => Ok(Arc::new(RemoteModelLoader::new(
            &transcription.remote_url,
            transcription.remote_api_key.clone(),
        ))),
        #[cfg(feature = "local-whisper")]
        "local_whisper" => {
            let binary = ffmpeg
                .binary()
                .ok_or_else(|| anyhow::anyhow!("local_whisper backend needs ffmpeg to decode media"))?;
            Ok(Arc::new(subforge_transcription::asr::local_whisper::WhisperModelLoader::new(
                &transcription.whisper_model_dir,
                binary,
            )))
        }
        other => {
            let _ = ffmpeg;
            anyhow::bail!("Unsupported transcription backend: {other}")
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub hub: Arc<BroadcastHub>,
    pub sessions: Arc<SessionStore>,
    pub models: Arc<ModelCache>,
    pub converter: Arc<dyn AudioConverter>,
    pub diarizer: Arc<dyn DiarizationEngine>,
    pub translator: Arc<dyn Translator>,
    pub orchestrator: Arc<JobOrchestrator>,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        let engines = Engines::from_settings(&settings)?;
        Ok(Self::with_engines(settings, engines))
    }

    pub fn with_engines(settings: Settings, engines: Engines) -> Self {
        let config = pipeline_config(&settings);
        let hub = Arc::new(BroadcastHub::new());
        let sessions = Arc::new(SessionStore::new(config.session_ttl));
        let models = Arc::new(ModelCache::new(engines.loader));
        info!(backend = models.backend(), "Recognition backend ready");

        let orchestrator = Arc::new(JobOrchestrator::new(
            config,
            Arc::clone(&models),
            Arc::clone(&sessions),
            Arc::clone(&hub),
            Arc::clone(&engines.diarizer),
            Arc::clone(&engines.converter),
        ));

        Self {
            settings,
            hub,
            sessions,
            models,
            converter: engines.converter,
            diarizer: engines.diarizer,
            translator: engines.translator,
            orchestrator,
            http: reqwest::Client::new(),
        }
    }

    /// Releases cached sessions (and their scratch directories) and
    /// disconnects observers.
    pub fn shutdown(&self) {
        let released = self.sessions.clear();
        self.hub.clear();
        info!(released, "Services shut down");
    }
}

fn pipeline_config(settings: &Settings) -> PipelineConfig {
    PipelineConfig {
        beam_size: settings.transcription.beam_size,
        vad_min_silence_ms: settings.transcription.vad_min_silence_ms,
        supported_extensions: settings.transcription.supported_extensions.clone(),
        progress_poll: Duration::from_millis(settings.transcription.progress_poll_ms),
        session_ttl: Duration::from_secs(settings.diarization.session_ttl_secs),
    }
}
