use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use super::{ModelLoader, RecognitionModel, RecognitionRequest, Task, Transcript};
use crate::TimedSegment;

const SAMPLE_RATE: usize = 16_000;

/// Loads GGML Whisper models (`ggml-<name>.bin`) from a directory.
pub struct WhisperModelLoader {
    model_dir: PathBuf,
    ffmpeg: PathBuf,
}

impl WhisperModelLoader {
    pub fn new(model_dir: impl Into<PathBuf>, ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            ffmpeg: ffmpeg.into(),
        }
    }
}

impl ModelLoader for WhisperModelLoader {
    fn load(&self, model_name: &str) -> anyhow::Result<Arc<dyn RecognitionModel>> {
        if model_name.is_empty() || model_name.contains(['/', '\\']) || model_name.contains("..") {
            anyhow::bail!("Invalid model name: {model_name:?}");
        }
        let path = self.model_dir.join(format!("ggml-{model_name}.bin"));
        let path_str = path
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("Non UTF-8 model path: {}", path.display()))?;
        info!(model_path = %path_str, "Loading Whisper model");
        let ctx = WhisperContext::new_with_params(path_str, WhisperContextParameters::default())
            .map_err(|e| anyhow::anyhow!("Failed to load Whisper model '{}': {}", path_str, e))?;
        info!(model = %model_name, "Whisper model loaded");
        Ok(Arc::new(WhisperRecognition {
            ctx,
            name: model_name.to_string(),
            ffmpeg: self.ffmpeg.clone(),
        }))
    }

    fn backend(&self) -> &str {
        "local_whisper"
    }
}

/// Local Whisper recognition using whisper.cpp via whisper-rs.
pub struct WhisperRecognition {
    ctx: WhisperContext,
    name: String,
    ffmpeg: PathBuf,
}

impl WhisperRecognition {
    /// Decodes any ffmpeg-readable media into 16kHz mono f32 PCM.
    fn decode(&self, media: &Path) -> anyhow::Result<Vec<f32>> {
        let output = Command::new(&self.ffmpeg)
            .arg("-nostdin")
            .arg("-i")
            .arg(media)
            .args(["-f", "f32le", "-ac", "1", "-ar", "16000", "-"])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .with_context(|| format!("Failed to run {}", self.ffmpeg.display()))?;
        if !output.status.success() {
            anyhow::bail!("ffmpeg could not decode {} ({})", media.display(), output.status);
        }

        Ok(output
            .stdout
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }
}

impl RecognitionModel for WhisperRecognition {
    fn transcribe(
        &self,
        media: &Path,
        request: &RecognitionRequest,
        on_segment: &mut dyn FnMut(&TimedSegment, f64),
    ) -> anyhow::Result<Transcript> {
        let audio = self.decode(media)?;
        let duration = audio.len() as f64 / SAMPLE_RATE as f64;

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| anyhow::anyhow!("Failed to create Whisper state: {}", e))?;

        let strategy = if request.beam_size > 1 {
            SamplingStrategy::BeamSearch {
                beam_size: request.beam_size as i32,
                patience: -1.0,
            }
        } else {
            SamplingStrategy::Greedy { best_of: 1 }
        };
        let mut params = FullParams::new(strategy);
        params.set_language(Some(&request.language));
        params.set_translate(request.task == Task::Translate);

        // Suppress non-speech output
        params.set_print_progress(false);
        params.set_print_special(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        debug!(
            duration,
            task = request.task.as_str(),
            min_silence_ms = request.vad_min_silence_ms,
            "Running Whisper"
        );
        state
            .full(params, &audio)
            .map_err(|e| anyhow::anyhow!("Whisper transcription failed: {}", e))?;

        let n_segments = state.full_n_segments();
        let mut segments = Vec::new();
        for i in 0..n_segments {
            let Some(segment) = state.get_segment(i) else {
                continue;
            };
            let text = segment
                .to_str()
                .map_err(|e| anyhow::anyhow!("Invalid segment text: {}", e))?
                .trim()
                .to_string();
            if text.is_empty() {
                continue;
            }
            // Whisper timestamps are in centiseconds.
            let segment = TimedSegment::new(
                segment.start_timestamp() as f64 / 100.0,
                segment.end_timestamp() as f64 / 100.0,
                text,
            );
            on_segment(&segment, duration);
            segments.push(segment);
        }

        Ok(Transcript { segments, duration })
    }

    fn name(&self) -> &str {
        &self.name
    }
}
