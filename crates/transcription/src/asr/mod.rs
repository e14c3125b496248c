mod cache;
#[cfg(feature = "local-whisper")]
pub mod local_whisper;
pub mod remote;

pub use cache::ModelCache;

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::TimedSegment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    Transcribe,
    Translate,
}

impl Task {
    /// Translate whenever the requested output language differs from the
    /// spoken one.
    pub fn for_languages(source: &str, target: &str) -> Self {
        if source != target {
            Task::Translate
        } else {
            Task::Transcribe
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Task::Transcribe => "transcribe",
            Task::Translate => "translate",
        }
    }
}

/// Parameters for one recognition run over a media file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionRequest {
    pub task: Task,
    /// Spoken language (ISO 639-1).
    pub language: String,
    pub beam_size: u32,
    /// Voice-activity filter: minimum silence that splits speech.
    pub vad_min_silence_ms: u32,
}

/// Result of a recognition run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    pub segments: Vec<TimedSegment>,
    /// Media duration in seconds, 0 when the engine cannot tell.
    pub duration: f64,
}

/// A loaded speech-recognition model.
///
/// `transcribe` blocks; callers run it on the blocking pool. `on_segment` is
/// invoked as each segment becomes available, together with the media
/// duration, so callers can stream progress.
pub trait RecognitionModel: Send + Sync + 'static {
    fn transcribe(
        &self,
        media: &Path,
        request: &RecognitionRequest,
        on_segment: &mut dyn FnMut(&TimedSegment, f64),
    ) -> anyhow::Result<Transcript>;

    /// Human-readable model name.
    fn name(&self) -> &str;
}

/// Loads recognition models by name. Blocking.
pub trait ModelLoader: Send + Sync + 'static {
    fn load(&self, model_name: &str) -> anyhow::Result<Arc<dyn RecognitionModel>>;

    /// Backend identifier, e.g. "remote" or "local_whisper".
    fn backend(&self) -> &str;
}
