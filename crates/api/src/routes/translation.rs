use axum::extract::{Multipart, State};
use subforge_transcription::{
    LogColor, MediaUpload,
    translate::{translate_document, translate_subtitles},
};

use super::form::UploadForm;
use crate::{error::ApiError, state::AppState};

struct TranslationRequest {
    upload: MediaUpload,
    content: String,
    source_lang: String,
    target_lang: String,
}

async fn read_request(multipart: Multipart) -> Result<TranslationRequest, ApiError> {
    let mut form = UploadForm::read(multipart).await?;
    let mut upload = form.single_file()?;
    let content = String::from_utf8(std::mem::take(&mut upload.data))
        .map_err(|_| ApiError::BadRequest(format!("{} is not valid UTF-8 text", upload.filename)))?;

    Ok(TranslationRequest {
        upload,
        content,
        source_lang: form.text_or("source_lang", "en"),
        target_lang: form.text_or("target_lang", "fr"),
    })
}

/// Translates subtitle text block by block, keeping numbering and timing.
pub async fn translate_srt(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<String, ApiError> {
    let req = read_request(multipart).await?;
    state.hub.log(format!("SRT translation: {}", req.upload.filename));

    let translated = translate_subtitles(
        state.translator.as_ref(),
        &req.content,
        &req.source_lang,
        &req.target_lang,
        &state.hub,
    )
    .await;

    state.hub.log_colored(
        format!("Translation complete: {}", req.upload.filename),
        LogColor::Green,
    );
    Ok(translated)
}

/// Translates a plain-text document in one pass.
pub async fn translate_text(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<String, ApiError> {
    let req = read_request(multipart).await?;

    Ok(translate_document(
        state.translator.as_ref(),
        &req.upload.filename,
        &req.content,
        &req.source_lang,
        &req.target_lang,
        &state.hub,
    )
    .await)
}
