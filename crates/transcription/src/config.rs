use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tuning for the transcription/diarization pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Beam width passed to the recognition engine.
    pub beam_size: u32,
    /// Minimum silence the engine's voice-activity filter splits on.
    pub vad_min_silence_ms: u32,
    /// Lower-case extensions (with leading dot) accepted for batch jobs.
    pub supported_extensions: Vec<String>,
    /// How often queued progress events are drained to observers.
    pub progress_poll: Duration,
    /// Age after which an unconsumed diarization session is swept.
    pub session_ttl: Duration,
}

impl PipelineConfig {
    pub fn is_supported(&self, filename: &str) -> bool {
        let lower = filename.to_lowercase();
        self.supported_extensions
            .iter()
            .any(|ext| lower.ends_with(&ext.to_lowercase()))
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            beam_size: 1,
            vad_min_silence_ms: 500,
            supported_extensions: [".mp4", ".mp3", ".wav", ".m4a", ".flac", ".ogg", ".webm"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
            progress_poll: Duration::from_millis(300),
            session_ttl: Duration::from_secs(3600),
        }
    }
}
