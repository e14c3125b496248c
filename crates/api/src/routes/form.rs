use std::collections::HashMap;

use axum::extract::Multipart;
use subforge_config::TranscriptionSettings;
use subforge_transcription::{JobError, MediaUpload, TranscriptionOptions};

use crate::error::ApiError;

/// A fully-read multipart form: uploaded files in arrival order plus text
/// fields by name.
#[derive(Debug, Default)]
pub struct UploadForm {
    files: Vec<MediaUpload>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Multipart error: {}", e)))?
        {
            let name = field.name().unwrap_or("").to_string();

            match field.file_name().map(str::to_string) {
                Some(filename) => {
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?;
                    form.files.push(MediaUpload::new(filename, bytes.to_vec()));
                }
                None => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| ApiError::BadRequest(format!("Failed to read field: {}", e)))?;
                    form.fields.insert(name, text);
                }
            }
        }

        Ok(form)
    }

    /// The single uploaded file of a one-file form.
    pub fn single_file(&mut self) -> Result<MediaUpload, ApiError> {
        if self.files.is_empty() {
            return Err(ApiError::BadRequest("Missing 'file' field".to_string()));
        }
        Ok(self.files.remove(0))
    }

    pub fn into_files(self) -> Vec<MediaUpload> {
        self.files
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn text_or(&self, name: &str, default: &str) -> String {
        self.text(name).unwrap_or(default).to_string()
    }

    /// `model_name`, `audio_lang` and `target_lang`, defaulted. The model
    /// must be one of the configured models.
    pub fn transcription_options(
        &self,
        settings: &TranscriptionSettings,
    ) -> Result<TranscriptionOptions, ApiError> {
        let defaults = TranscriptionOptions::default();
        let model_name = self.text_or("model_name", &settings.default_model);
        if !settings.models.iter().any(|m| *m == model_name) {
            return Err(JobError::InvalidInput(format!("Unknown model: {}", model_name)).into());
        }

        Ok(TranscriptionOptions {
            model_name,
            source_lang: self.text_or("audio_lang", &defaults.source_lang),
            target_lang: self.text_or("target_lang", &defaults.target_lang),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(default_model: &str) -> TranscriptionSettings {
        TranscriptionSettings {
            backend: "remote".into(),
            models: vec!["small".into(), "medium".into(), "large-v2".into()],
            default_model: default_model.into(),
            whisper_model_dir: "models".into(),
            remote_url: "http://localhost:8080".into(),
            remote_api_key: None,
            beam_size: 1,
            vad_min_silence_ms: 500,
            supported_extensions: vec![".mp3".into()],
            progress_poll_ms: 300,
            ffmpeg_path: None,
        }
    }

    #[test]
    fn options_fall_back_to_defaults() {
        let mut form = UploadForm::default();
        form.fields.insert("audio_lang".into(), "de".into());

        let options = form.transcription_options(&settings("medium")).unwrap();
        assert_eq!(options.model_name, "medium");
        assert_eq!(options.source_lang, "de");
        assert_eq!(options.target_lang, "fr");
    }

    #[test]
    fn configured_default_model_is_used() {
        let form = UploadForm::default();
        let options = form.transcription_options(&settings("large-v2")).unwrap();
        assert_eq!(options.model_name, "large-v2");
    }

    #[test]
    fn unknown_model_is_a_bad_request() {
        for name in ["huge", "../../etc/passwd"] {
            let mut form = UploadForm::default();
            form.fields.insert("model_name".into(), name.into());
            assert!(matches!(
                form.transcription_options(&settings("medium")),
                Err(ApiError::BadRequest(_))
            ));
        }
    }

    #[test]
    fn missing_file_is_a_bad_request() {
        let mut form = UploadForm::default();
        assert!(matches!(form.single_file(), Err(ApiError::BadRequest(_))));
    }
}
