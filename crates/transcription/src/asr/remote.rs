use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tokio::runtime::Handle;
use tracing::{debug, info};

use super::{ModelLoader, RecognitionModel, RecognitionRequest, Task, Transcript};
use crate::TimedSegment;

/// Loader for models served by an OpenAI-compatible speech API
/// (`/v1/audio/transcriptions`, `/v1/audio/translations`).
pub struct RemoteModelLoader {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl RemoteModelLoader {
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

impl ModelLoader for RemoteModelLoader {
    fn load(&self, model_name: &str) -> anyhow::Result<Arc<dyn RecognitionModel>> {
        info!(model = %model_name, base_url = %self.base_url, "Using remote recognition model");
        Ok(Arc::new(RemoteRecognition {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            model: model_name.to_string(),
        }))
    }

    fn backend(&self) -> &str {
        "remote"
    }
}

pub struct RemoteRecognition {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct VerboseTranscription {
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    segments: Vec<RemoteSegment>,
}

#[derive(Debug, Deserialize)]
struct RemoteSegment {
    start: f64,
    end: f64,
    text: String,
}

impl RemoteRecognition {
    async fn request(&self, media: &Path, request: &RecognitionRequest) -> anyhow::Result<VerboseTranscription> {
        let bytes = tokio::fs::read(media)
            .await
            .with_context(|| format!("Failed to read media {}", media.display()))?;
        let file_name = media
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("media")
            .to_string();

        let mut form = Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name))
            .text("model", self.model.clone())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "segment");

        let endpoint = match request.task {
            Task::Transcribe => {
                form = form.text("language", request.language.clone());
                "transcriptions"
            }
            Task::Translate => "translations",
        };
        let url = format!("{}/v1/audio/{}", self.base_url, endpoint);
        debug!(%url, model = %self.model, "Sending recognition request");

        let mut builder = self.client.post(&url).multipart(form);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?.error_for_status()?;
        Ok(response.json::<VerboseTranscription>().await?)
    }
}

impl RecognitionModel for RemoteRecognition {
    fn transcribe(
        &self,
        media: &Path,
        request: &RecognitionRequest,
        on_segment: &mut dyn FnMut(&TimedSegment, f64),
    ) -> anyhow::Result<Transcript> {
        // Runs on a blocking-pool thread, which still carries the runtime handle.
        let handle = Handle::try_current().context("Remote recognition needs a Tokio runtime")?;
        let response = handle.block_on(self.request(media, request))?;

        let duration = response.duration.unwrap_or_default();
        let mut segments = Vec::with_capacity(response.segments.len());
        for seg in response.segments {
            let segment = TimedSegment::new(seg.start, seg.end, seg.text.trim());
            on_segment(&segment, duration);
            segments.push(segment);
        }

        Ok(Transcript { segments, duration })
    }

    fn name(&self) -> &str {
        &self.model
    }
}
