use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Multipart, State},
};

use super::form::UploadForm;
use crate::{error::ApiError, state::AppState};

/// Fields: `file`, `model_name`, `audio_lang`, `target_lang`. Answers with
/// the subtitle text.
pub async fn transcribe(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<String, ApiError> {
    let mut form = UploadForm::read(multipart).await?;
    let upload = form.single_file()?;
    let options = form.transcription_options(&state.settings.transcription)?;

    let srt = state.orchestrator.transcribe_single(upload, &options).await?;
    Ok(srt)
}

/// Fields: `files` (repeated) plus the single-file options. Answers with
/// `{"<name>.srt": "<subtitles>"}` for every file that succeeded.
pub async fn transcribe_batch(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<BTreeMap<String, String>>, ApiError> {
    let form = UploadForm::read(multipart).await?;
    let options = form.transcription_options(&state.settings.transcription)?;

    let result = state
        .orchestrator
        .transcribe_batch(form.into_files(), &options)
        .await?;
    Ok(Json(result.outputs))
}
