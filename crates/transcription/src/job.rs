use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::diarization::DiarizationError;
use crate::hub::BroadcastHub;

#[derive(Debug, Error)]
pub enum JobError {
    /// Missing credential or host tool. Fatal to the operation.
    #[error("{0}")]
    Configuration(String),
    #[error("No valid files")]
    NoValidFiles,
    #[error("Diarization session expired or not found. Please re-upload.")]
    SessionNotFound,
    #[error("{0}")]
    InvalidInput(String),
    #[error(transparent)]
    Engine(anyhow::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<DiarizationError> for JobError {
    fn from(err: DiarizationError) -> Self {
        match err {
            DiarizationError::Configuration(msg) => JobError::Configuration(msg),
            DiarizationError::Engine(e) => JobError::Engine(e),
        }
    }
}

/// `Received → ModelLoading → Running → Succeeded | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Received,
    ModelLoading,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn can_advance_to(self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Received, ModelLoading)
                | (ModelLoading, Running)
                | (Running, Succeeded)
                | (Received | ModelLoading | Running, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

/// Tracks one job's state and announces each transition to observers.
pub struct Job {
    id: Uuid,
    kind: &'static str,
    state: JobState,
    hub: Arc<BroadcastHub>,
}

impl Job {
    pub fn received(kind: &'static str, hub: Arc<BroadcastHub>) -> Self {
        let id = Uuid::new_v4();
        debug!(%id, kind, "Job received");
        hub.status(id, JobState::Received);
        Self {
            id,
            kind,
            state: JobState::Received,
            hub,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn advance(&mut self, next: JobState) {
        if !self.state.can_advance_to(next) {
            warn!(id = %self.id, kind = self.kind, from = ?self.state, to = ?next, "Ignoring invalid job transition");
            return;
        }
        debug!(id = %self.id, kind = self.kind, from = ?self.state, to = ?next, "Job transition");
        self.state = next;
        self.hub.status(self.id, next);
    }
}

/// An uploaded media file.
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub filename: String,
    pub data: Vec<u8>,
}

impl MediaUpload {
    pub fn new(filename: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            data: data.into(),
        }
    }

    /// Final path component of the client-supplied name, so uploads can't
    /// escape the job directory.
    pub fn safe_name(&self) -> String {
        let base = self
            .filename
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default();
        match base {
            "" | "." | ".." => "upload".to_string(),
            name => name.to_string(),
        }
    }

    pub async fn write_into(&self, dir: &Path) -> std::io::Result<PathBuf> {
        let path = dir.join(self.safe_name());
        tokio::fs::write(&path, &self.data).await?;
        Ok(path)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TranscriptionOptions {
    pub model_name: String,
    pub source_lang: String,
    pub target_lang: String,
}

impl Default for TranscriptionOptions {
    fn default() -> Self {
        Self {
            model_name: "medium".to_string(),
            source_lang: "en".to_string(),
            target_lang: "fr".to_string(),
        }
    }
}

/// Outcome of a batch run. Partial success is a normal result.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResult {
    /// `<stem>.srt` → subtitle text, for every item that succeeded.
    pub outputs: BTreeMap<String, String>,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiarizationSummary {
    pub session_id: Uuid,
    pub num_speakers: usize,
    pub speakers: Vec<String>,
}
