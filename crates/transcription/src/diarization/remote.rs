use std::path::Path;

use anyhow::Context;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::runtime::Handle;
use tracing::{debug, info};

use super::{DiarizationEngine, DiarizationError};
use crate::SpeakerTurn;

/// Client for an HTTP diarization service running a pyannote pipeline.
///
/// The service receives the media as multipart `file` plus the pipeline
/// name, authenticates with the Hugging Face token, and answers
/// `{"segments": [{"start", "end", "speaker"}]}`.
pub struct RemoteDiarization {
    client: Client,
    endpoint: String,
    token: Option<String>,
    pipeline: String,
}

#[derive(Debug, Deserialize)]
struct DiarizationResponse {
    segments: Vec<SpeakerTurn>,
}

impl RemoteDiarization {
    pub fn new(endpoint: &str, token: Option<String>, pipeline: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
            pipeline: pipeline.to_string(),
        }
    }

    async fn request(&self, token: &str, media: &Path) -> Result<Vec<SpeakerTurn>, DiarizationError> {
        let bytes = tokio::fs::read(media)
            .await
            .with_context(|| format!("Failed to read media {}", media.display()))?;
        let file_name = media
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("media.wav")
            .to_string();
        let form = Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name))
            .text("pipeline", self.pipeline.clone());

        let url = format!("{}/diarize", self.endpoint);
        debug!(%url, pipeline = %self.pipeline, "Sending diarization request");
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .context("Diarization service unreachable")?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                Err(DiarizationError::Configuration(format!(
                    "The token was rejected or the pipeline is inaccessible. Accept the model \
                     conditions at https://hf.co/{} and https://hf.co/pyannote/segmentation-3.0",
                    self.pipeline
                )))
            }
            status if !status.is_success() => Err(DiarizationError::Engine(anyhow::anyhow!(
                "Diarization service returned {}",
                status
            ))),
            _ => {
                let body: DiarizationResponse = response
                    .json()
                    .await
                    .context("Malformed diarization response")?;
                Ok(body.segments)
            }
        }
    }
}

impl DiarizationEngine for RemoteDiarization {
    fn diarize(&self, media: &Path) -> Result<Vec<SpeakerTurn>, DiarizationError> {
        let token = self.token.as_deref().ok_or_else(|| {
            DiarizationError::Configuration(
                "HF_TOKEN not configured. Set SUBFORGE__DIARIZATION__HF_TOKEN.".to_string(),
            )
        })?;

        // Runs on a blocking-pool thread, which still carries the runtime handle.
        let handle = Handle::try_current()
            .context("Remote diarization needs a Tokio runtime")
            .map_err(DiarizationError::Engine)?;
        let turns = handle.block_on(self.request(token, media))?;
        info!(turns = turns.len(), "Diarization finished");
        Ok(turns)
    }

    fn is_configured(&self) -> bool {
        self.token.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_token_is_a_configuration_error() {
        let engine = RemoteDiarization::new("http://localhost:1", Some("  ".into()), "p");
        assert!(!engine.is_configured());
        let err = engine.diarize(Path::new("/nonexistent.wav")).unwrap_err();
        assert!(matches!(err, DiarizationError::Configuration(_)));
    }
}
