//! Scripted engines for exercising the pipeline without models, network
//! services or ffmpeg.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::asr::{ModelLoader, RecognitionModel, RecognitionRequest, Transcript};
use crate::convert::{AudioConverter, ConversionError};
use crate::diarization::{DiarizationEngine, DiarizationError};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::translate::{TranslationError, Translator};
use crate::{SpeakerTurn, TimedSegment};

/// Progress sink that keeps every delivered event.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().clone()
    }
}

impl ProgressSink for RecordingSink {
    fn deliver(&self, event: &ProgressEvent) {
        self.events.lock().push(event.clone());
    }
}

#[derive(Clone)]
struct Script {
    segments: Vec<TimedSegment>,
    duration: f64,
    failing_media: Vec<String>,
}

/// Loader producing models that return a fixed transcript.
pub struct ScriptedModelLoader {
    script: Script,
    load_delay: Duration,
    failing_models: HashSet<String>,
    loads: AtomicUsize,
}

impl Default for ScriptedModelLoader {
    fn default() -> Self {
        Self {
            script: Script {
                segments: vec![
                    TimedSegment::new(0.0, 1.5, "Hello there."),
                    TimedSegment::new(1.5, 3.0, "General Kenobi."),
                ],
                duration: 3.0,
                failing_media: Vec::new(),
            },
            load_delay: Duration::ZERO,
            failing_models: HashSet::new(),
            loads: AtomicUsize::new(0),
        }
    }
}

impl ScriptedModelLoader {
    pub fn with_segments(mut self, segments: Vec<TimedSegment>) -> Self {
        self.script.segments = segments;
        self
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.script.duration = duration;
        self
    }

    pub fn with_load_delay_ms(mut self, millis: u64) -> Self {
        self.load_delay = Duration::from_millis(millis);
        self
    }

    /// Loading `model_name` always fails.
    pub fn failing_model(mut self, model_name: &str) -> Self {
        self.failing_models.insert(model_name.to_string());
        self
    }

    /// Transcribing any media whose file name contains `fragment` fails.
    pub fn failing_media(mut self, fragment: &str) -> Self {
        self.script.failing_media.push(fragment.to_string());
        self
    }

    /// Number of load attempts so far, failed ones included.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl ModelLoader for ScriptedModelLoader {
    fn load(&self, model_name: &str) -> anyhow::Result<Arc<dyn RecognitionModel>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if !self.load_delay.is_zero() {
            std::thread::sleep(self.load_delay);
        }
        if self.failing_models.contains(model_name) {
            anyhow::bail!("model {model_name} unavailable");
        }
        Ok(Arc::new(ScriptedModel {
            name: model_name.to_string(),
            script: self.script.clone(),
        }))
    }

    fn backend(&self) -> &str {
        "scripted"
    }
}

pub struct ScriptedModel {
    name: String,
    script: Script,
}

impl RecognitionModel for ScriptedModel {
    fn transcribe(
        &self,
        media: &Path,
        _request: &RecognitionRequest,
        on_segment: &mut dyn FnMut(&TimedSegment, f64),
    ) -> anyhow::Result<Transcript> {
        let file_name = media
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Some(fragment) = self.script.failing_media.iter().find(|f| file_name.contains(f.as_str())) {
            anyhow::bail!("cannot decode media matching {fragment}");
        }

        for segment in &self.script.segments {
            on_segment(segment, self.script.duration);
        }
        Ok(Transcript {
            segments: self.script.segments.clone(),
            duration: self.script.duration,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Diarizer returning fixed turns and remembering the paths it was given.
pub struct ScriptedDiarizer {
    turns: Vec<SpeakerTurn>,
    configured: bool,
    inputs: Mutex<Vec<PathBuf>>,
}

impl ScriptedDiarizer {
    pub fn new(turns: Vec<SpeakerTurn>) -> Self {
        Self {
            turns,
            configured: true,
            inputs: Mutex::new(Vec::new()),
        }
    }

    /// A diarizer without its access credential.
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new(Vec::new())
        }
    }

    pub fn inputs(&self) -> Vec<PathBuf> {
        self.inputs.lock().clone()
    }
}

impl Default for ScriptedDiarizer {
    fn default() -> Self {
        Self::new(vec![
            SpeakerTurn::new(0.0, 1.6, "SPEAKER_00"),
            SpeakerTurn::new(1.6, 3.0, "SPEAKER_01"),
        ])
    }
}

impl DiarizationEngine for ScriptedDiarizer {
    fn diarize(&self, media: &Path) -> Result<Vec<SpeakerTurn>, DiarizationError> {
        if !self.configured {
            return Err(DiarizationError::Configuration("HF_TOKEN not configured".into()));
        }
        self.inputs.lock().push(media.to_path_buf());
        Ok(self.turns.clone())
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}

/// Converter that pretends to re-encode by copying, or fails on request.
pub struct FakeConverter {
    available: bool,
    succeeds: bool,
}

impl FakeConverter {
    pub fn working() -> Self {
        Self { available: true, succeeds: true }
    }

    /// Present on the PATH, but every conversion fails.
    pub fn broken() -> Self {
        Self { available: true, succeeds: false }
    }

    pub fn missing() -> Self {
        Self { available: false, succeeds: false }
    }
}

#[async_trait]
impl AudioConverter for FakeConverter {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn to_mono_16k(&self, input: &Path, output: &Path) -> Result<(), ConversionError> {
        if !self.available {
            return Err(ConversionError::Unavailable);
        }
        if !self.succeeds {
            return Err(ConversionError::Spawn(std::io::Error::other("scripted conversion failure")));
        }
        tokio::fs::copy(input, output).await?;
        Ok(())
    }
}

/// Translator that tags text with the target language, e.g. `[fr] Hello`.
pub struct EchoTranslator {
    tag: String,
}

impl EchoTranslator {
    pub fn new(tag: &str) -> Self {
        Self { tag: tag.to_string() }
    }
}

#[async_trait]
impl Translator for EchoTranslator {
    async fn translate(&self, text: &str, _source: &str, _target: &str) -> Result<String, TranslationError> {
        Ok(format!("[{}] {}", self.tag, text))
    }
}

/// Translator whose service never answers.
pub struct UnreachableTranslator;

#[async_trait]
impl Translator for UnreachableTranslator {
    async fn translate(&self, _text: &str, _source: &str, _target: &str) -> Result<String, TranslationError> {
        Err(TranslationError::Unavailable("connection refused".into()))
    }
}
