use std::collections::HashMap;

use axum::{
    Json,
    extract::{Multipart, State},
};
use subforge_transcription::{DiarizationSummary, JobError};
use uuid::Uuid;

use super::form::UploadForm;
use crate::{error::ApiError, state::AppState};

/// Phase one: detect speakers and cache the result for a later
/// `/api/transcribe-diarized` call.
pub async fn diarize(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<DiarizationSummary>, ApiError> {
    let mut form = UploadForm::read(multipart).await?;
    let upload = form.single_file()?;

    let summary = state.orchestrator.diarize(upload).await?;
    Ok(Json(summary))
}

/// Phase two: transcribe a diarized session. `speaker_names` is a JSON
/// object mapping raw labels to display names.
pub async fn transcribe_diarized(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<String, ApiError> {
    let form = UploadForm::read(multipart).await?;
    let session_id = form
        .text("session_id")
        .ok_or_else(|| ApiError::BadRequest("Missing 'session_id' field".to_string()))?;
    // An id that never parsed can't name a live session.
    let session_id = Uuid::parse_str(session_id.trim()).map_err(|_| JobError::SessionNotFound)?;
    let speaker_names = parse_speaker_names(form.text("speaker_names"))?;
    let options = form.transcription_options(&state.settings.transcription)?;

    let srt = state
        .orchestrator
        .transcribe_with_diarization(session_id, &options, &speaker_names)
        .await?;
    Ok(srt)
}

fn parse_speaker_names(raw: Option<&str>) -> Result<HashMap<String, String>, JobError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(HashMap::new()),
        Some(json) => serde_json::from_str(json)
            .map_err(|e| JobError::InvalidInput(format!("Invalid speaker_names JSON: {}", e))),
    }
}
