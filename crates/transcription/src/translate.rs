use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::hub::{BroadcastHub, LogColor};
use crate::languages;
use crate::subtitle::{SrtBlock, parse_blocks};

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("translation request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("translation service unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait Translator: Send + Sync + 'static {
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String, TranslationError>;
}

/// Translation through an Ollama `/api/generate` endpoint.
pub struct OllamaTranslator {
    client: Client,
    url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

impl OllamaTranslator {
    pub fn new(url: &str, model: &str, timeout: Duration) -> reqwest::Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            url: url.to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl Translator for OllamaTranslator {
    async fn translate(&self, text: &str, _source: &str, target: &str) -> Result<String, TranslationError> {
        let target_name = languages::display_name(target).unwrap_or(target);
        let request = GenerateRequest {
            model: &self.model,
            prompt: format!(
                "Traduis en {target_name} ce texte de sous-titre \
                 sans modifier le style ni le decoupage :\n\n\"{text}\""
            ),
            stream: false,
        };

        let body: GenerateResponse = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(body
            .response
            .map(|r| r.trim().to_string())
            .unwrap_or_else(|| text.to_string()))
    }
}

/// Translates `text`, returning it unchanged when the service fails.
pub async fn translate_or_echo(translator: &dyn Translator, text: &str, source: &str, target: &str) -> String {
    match translator.translate(text, source, target).await {
        Ok(translated) => translated,
        Err(e) => {
            warn!(%e, "Translation unavailable, keeping original text");
            text.to_string()
        }
    }
}

/// Translates every subtitle block's text, keeping index and timing lines.
pub async fn translate_subtitles(
    translator: &dyn Translator,
    content: &str,
    source: &str,
    target: &str,
    hub: &BroadcastHub,
) -> String {
    let mut translated = Vec::new();
    for block in parse_blocks(content) {
        let text = translate_or_echo(translator, &block.text, source, target).await;
        hub.log(format!("  Block {} translated", block.index));
        translated.push(
            SrtBlock {
                text,
                ..block
            }
            .render(),
        );
    }
    translated.join("\n")
}

/// Translates a whole plain-text document in one request.
pub async fn translate_document(
    translator: &dyn Translator,
    name: &str,
    content: &str,
    source: &str,
    target: &str,
    hub: &BroadcastHub,
) -> String {
    hub.log(format!("Text translation: {name}"));
    let translated = translate_or_echo(translator, content, source, target).await;
    hub.log_colored(format!("Translation complete: {name}"), LogColor::Green);
    translated
}
