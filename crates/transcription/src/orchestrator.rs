use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::asr::{ModelCache, RecognitionModel, RecognitionRequest, Task, Transcript};
use crate::attribution::attribute;
use crate::config::PipelineConfig;
use crate::convert::AudioConverter;
use crate::diarization::DiarizationEngine;
use crate::hub::{BroadcastHub, LogColor, SegmentLog};
use crate::job::{BatchResult, DiarizationSummary, Job, JobError, JobState, MediaUpload, TranscriptionOptions};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::session::{DiarizationSession, SessionStore};
use crate::subtitle::{format_srt, format_srt_with_speakers, subtitle_filename};
use crate::worker::WorkerPool;

const FFMPEG_MISSING: &str = "FFmpeg not found in PATH";

/// Drives single, batch and diarized transcription jobs.
///
/// Created once at startup and shared via `Arc`. Each job works inside its
/// own scratch directory, removed on every exit path; diarization jobs hand
/// theirs over to the [`SessionStore`].
pub struct JobOrchestrator {
    config: PipelineConfig,
    models: Arc<ModelCache>,
    sessions: Arc<SessionStore>,
    hub: Arc<BroadcastHub>,
    diarizer: Arc<dyn DiarizationEngine>,
    converter: Arc<dyn AudioConverter>,
    workers: WorkerPool,
}

impl JobOrchestrator {
    pub fn new(
        config: PipelineConfig,
        models: Arc<ModelCache>,
        sessions: Arc<SessionStore>,
        hub: Arc<BroadcastHub>,
        diarizer: Arc<dyn DiarizationEngine>,
        converter: Arc<dyn AudioConverter>,
    ) -> Self {
        let workers = WorkerPool::new(config.progress_poll);
        Self {
            config,
            models,
            sessions,
            hub,
            diarizer,
            converter,
            workers,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Transcribes one media file into subtitle text.
    pub async fn transcribe_single(
        &self,
        upload: MediaUpload,
        options: &TranscriptionOptions,
    ) -> Result<String, JobError> {
        self.require_converter()?;

        let workspace = tempfile::tempdir()?;
        let mut job = Job::received("single", Arc::clone(&self.hub));
        self.hub.log(format!("Received: {}", upload.filename));

        let result: Result<String, JobError> = async {
            let media = upload.write_into(workspace.path()).await?;

            job.advance(JobState::ModelLoading);
            let model = self.load_model(&options.model_name).await?;

            job.advance(JobState::Running);
            self.hub.log(format!("Transcribing: {}", upload.filename));
            let transcript = self.recognize(model, media, options, self.hub.clone()).await?;
            self.hub.publish(&ProgressEvent::media_complete(
                transcript.duration,
                &transcript.segments,
                upload.filename.as_str(),
            ));

            Ok(format_srt(&transcript.segments))
        }
        .await;

        close_workspace(workspace);
        match &result {
            Ok(_) => {
                job.advance(JobState::Succeeded);
                self.hub.log_colored(
                    format!("Transcription complete: {}", upload.filename),
                    LogColor::Green,
                );
            }
            Err(e) => self.fail(&mut job, &upload.filename, e),
        }
        result
    }

    /// Transcribes every supported file in order, continuing past failures.
    pub async fn transcribe_batch(
        &self,
        uploads: Vec<MediaUpload>,
        options: &TranscriptionOptions,
    ) -> Result<BatchResult, JobError> {
        self.require_converter()?;

        let valid: Vec<MediaUpload> = uploads
            .into_iter()
            .filter(|u| self.config.is_supported(&u.filename))
            .collect();
        if valid.is_empty() {
            self.hub.log_colored("No valid audio/video files.", LogColor::Red);
            return Err(JobError::NoValidFiles);
        }

        let workspace = tempfile::tempdir()?;
        let mut job = Job::received("batch", Arc::clone(&self.hub));

        job.advance(JobState::ModelLoading);
        let model = match self.load_model(&options.model_name).await {
            Ok(model) => model,
            Err(e) => {
                close_workspace(workspace);
                self.fail(&mut job, "batch", &e);
                return Err(e);
            }
        };

        job.advance(JobState::Running);
        let total = valid.len();
        let mut result = BatchResult::default();
        // The batch bar counts files; per-segment progress only goes to the log.
        let segment_log: Arc<dyn ProgressSink> = Arc::new(SegmentLog(Arc::clone(&self.hub)));

        for (position, upload) in valid.into_iter().enumerate() {
            let index = position + 1;
            self.hub.progress(position as f64, total as f64);
            self.hub.log(format!("Processing: {} ({}/{})", upload.filename, index, total));

            let outcome: Result<String, JobError> = async {
                let media = upload.write_into(workspace.path()).await?;
                let transcript = self
                    .recognize(Arc::clone(&model), media, options, Arc::clone(&segment_log))
                    .await?;
                Ok(format_srt(&transcript.segments))
            }
            .await;

            match outcome {
                Ok(srt) => {
                    let name = subtitle_filename(&upload.safe_name());
                    if result.outputs.insert(name.clone(), srt).is_some() {
                        warn!(%name, "Duplicate output name, keeping the latest");
                    }
                    result.succeeded += 1;
                    self.hub.log_colored(format!("OK : {}", upload.filename), LogColor::Green);
                }
                Err(e) => {
                    result.failed += 1;
                    error!(job_id = %job.id(), filename = %upload.filename, error = %e, "Batch item failed");
                    self.hub.log_colored(format!("Error {}: {}", upload.filename, e), LogColor::Red);
                }
            }
        }

        close_workspace(workspace);
        self.hub.progress(total as f64, total as f64);
        job.advance(JobState::Succeeded);
        self.hub.log_colored(
            format!(
                "Done. {} succeeded, {} failed out of {}.",
                result.succeeded, result.failed, total
            ),
            LogColor::Cyan,
        );
        Ok(result)
    }

    /// Runs speaker diarization and caches the result as a session.
    pub async fn diarize(&self, upload: MediaUpload) -> Result<DiarizationSummary, JobError> {
        if !self.diarizer.is_configured() {
            let msg = "HF_TOKEN not configured. Diarization needs a Hugging Face token.";
            self.hub.log_colored(msg, LogColor::Red);
            return Err(JobError::Configuration(msg.to_string()));
        }

        let swept = self.sessions.sweep_expired();
        if swept > 0 {
            info!(swept, "Expired diarization sessions removed");
        }

        let workspace = tempfile::tempdir()?;
        let mut job = Job::received("diarize", Arc::clone(&self.hub));
        self.hub.log(format!("Diarization: received {}", upload.filename));

        let result: Result<(PathBuf, Vec<crate::SpeakerTurn>), JobError> = async {
            let media = upload.write_into(workspace.path()).await?;
            let input = self.prepare_for_diarization(&media, workspace.path()).await;

            job.advance(JobState::ModelLoading);
            self.hub.log("Loading diarization pipeline...");

            job.advance(JobState::Running);
            self.hub.log(format!("Running speaker detection on {}...", upload.filename));
            let diarizer = Arc::clone(&self.diarizer);
            let turns = self
                .workers
                .submit(move || diarizer.diarize(&input))
                .await
                .map_err(JobError::Engine)??;
            Ok((media, turns))
        }
        .await;

        match result {
            Ok((media, turns)) => {
                let session = DiarizationSession::new(upload.filename.clone(), turns, media, workspace);
                let speakers = session.speakers.clone();
                let session_id = self.sessions.put(session);

                job.advance(JobState::Succeeded);
                self.hub.log_colored(
                    format!("Diarization complete: {} speaker(s) detected", speakers.len()),
                    LogColor::Green,
                );
                Ok(DiarizationSummary {
                    session_id,
                    num_speakers: speakers.len(),
                    speakers,
                })
            }
            Err(e) => {
                close_workspace(workspace);
                job.advance(JobState::Failed);
                error!(job_id = %job.id(), filename = %upload.filename, error = %e, "Diarization failed");
                self.hub.log_colored(format!("Diarization error: {}", e), LogColor::Red);
                Err(e)
            }
        }
    }

    /// Transcribes a diarized session's media and labels each segment with
    /// its speaker. The session is taken out of the store up front, so a
    /// second request for it fails, and released whatever the outcome.
    pub async fn transcribe_with_diarization(
        &self,
        session_id: Uuid,
        options: &TranscriptionOptions,
        speaker_names: &HashMap<String, String>,
    ) -> Result<String, JobError> {
        let Some(session) = self.sessions.take(&session_id) else {
            return Err(JobError::SessionNotFound);
        };

        let mut job = Job::received("diarized", Arc::clone(&self.hub));
        let result: Result<String, JobError> = async {
            job.advance(JobState::ModelLoading);
            let model = self.load_model(&options.model_name).await?;

            job.advance(JobState::Running);
            self.hub.log(format!("Transcribing with diarization: {}", session.filename));
            let transcript = self
                .recognize(model, session.media_path().to_path_buf(), options, self.hub.clone())
                .await?;
            self.hub.publish(&ProgressEvent::media_complete(
                transcript.duration,
                &transcript.segments,
                session.filename.as_str(),
            ));

            Ok(format_srt_with_speakers(&transcript.segments, |seg| {
                attribute(seg.start, seg.end, &session.turns, speaker_names)
            }))
        }
        .await;

        let filename = session.filename.clone();
        self.sessions.release(session);

        match &result {
            Ok(_) => {
                job.advance(JobState::Succeeded);
                self.hub.log_colored(
                    format!("Diarized transcription complete: {}", filename),
                    LogColor::Green,
                );
            }
            Err(e) => self.fail(&mut job, &filename, e),
        }
        result
    }

    fn require_converter(&self) -> Result<(), JobError> {
        if self.converter.is_available() {
            Ok(())
        } else {
            self.hub.log_colored(FFMPEG_MISSING, LogColor::Red);
            Err(JobError::Configuration(FFMPEG_MISSING.to_string()))
        }
    }

    async fn load_model(&self, model_name: &str) -> Result<Arc<dyn RecognitionModel>, JobError> {
        if !self.models.is_loaded(model_name) {
            self.hub.log(format!("Loading model {}...", model_name));
        }
        self.models
            .get_or_load(model_name)
            .await
            .map_err(JobError::Engine)
    }

    /// Runs recognition on the worker pool, streaming per-segment progress
    /// to `sink`.
    async fn recognize(
        &self,
        model: Arc<dyn RecognitionModel>,
        media: PathBuf,
        options: &TranscriptionOptions,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<Transcript, JobError> {
        let request = RecognitionRequest {
            task: Task::for_languages(&options.source_lang, &options.target_lang),
            language: options.source_lang.clone(),
            beam_size: self.config.beam_size,
            vad_min_silence_ms: self.config.vad_min_silence_ms,
        };

        self.workers
            .submit_tracked(sink, move |reporter| {
                model.transcribe(&media, &request, &mut |segment, duration| {
                    reporter.segment(segment, duration)
                })
            })
            .await
            .map_err(JobError::Engine)
    }

    /// Normalises media to 16kHz mono for the diarizer, falling back to the
    /// original file when conversion fails.
    async fn prepare_for_diarization(&self, media: &Path, workspace: &Path) -> PathBuf {
        let converted = workspace.join("converted.wav");
        self.hub.log("Converting audio to WAV for diarization...");
        match self.converter.to_mono_16k(media, &converted).await {
            Ok(()) => converted,
            Err(e) => {
                warn!(media = %media.display(), error = %e, "Conversion failed, diarizing original file");
                self.hub.log_colored(
                    format!("Warning: ffmpeg conversion failed, trying original file. Error: {}", e),
                    LogColor::Yellow,
                );
                media.to_path_buf()
            }
        }
    }

    fn fail(&self, job: &mut Job, subject: &str, err: &JobError) {
        job.advance(JobState::Failed);
        error!(job_id = %job.id(), subject, error = %err, "Job failed");
        self.hub.log_colored(format!("Error: {}", err), LogColor::Red);
    }
}

fn close_workspace(workspace: TempDir) {
    let path = workspace.path().to_path_buf();
    if let Err(e) = workspace.close() {
        warn!(path = %path.display(), error = %e, "Failed to remove job workspace");
    }
}
