pub mod asr;
pub mod attribution;
pub mod config;
pub mod convert;
pub mod diarization;
pub mod hub;
pub mod job;
pub mod languages;
pub mod orchestrator;
pub mod progress;
pub mod session;
pub mod subtitle;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod translate;
pub mod worker;

pub use asr::{ModelCache, ModelLoader, RecognitionModel, RecognitionRequest, Task, Transcript};
pub use config::PipelineConfig;
pub use diarization::{DiarizationEngine, DiarizationError};
pub use hub::{BroadcastHub, HubEvent, LogColor};
pub use job::{BatchResult, DiarizationSummary, JobError, JobState, MediaUpload, TranscriptionOptions};
pub use orchestrator::JobOrchestrator;
pub use session::{DiarizationSession, SessionStore};

use serde::{Deserialize, Serialize};

/// A span of recognised text, in seconds from the start of the media.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl TimedSegment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

/// An interval the diarization engine attributes to one speaker label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerTurn {
    pub start: f64,
    pub end: f64,
    pub speaker: String,
}

impl SpeakerTurn {
    pub fn new(start: f64, end: f64, speaker: impl Into<String>) -> Self {
        Self {
            start,
            end,
            speaker: speaker.into(),
        }
    }
}
