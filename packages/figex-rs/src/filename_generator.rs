//! Names cropped figures with a vision-capable language model.

use std::io::Cursor;
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use image::{DynamicImage, ImageFormat};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Config;

/// Longest filename stem, in characters.
pub const CHAR_LIMIT: usize = 60;
pub const FALLBACK_NAME: &str = "figure";

/// Default naming prompt. It is written in Polish for Polish biology
/// textbooks, so names come back in Polish; override it with
/// `FIGEX_NAMING_PROMPT` for other material.
pub const DEFAULT_PROMPT: &str = "\
Otrzymasz zdjęcie strony z Vademecuum Biologicznego. Strona zawiera tekst oraz przede wszystkim ilustrację.

Nazwij ilustrację obecną na zdjęciu, bądź jak najbardziej zwięzły - wytworzona nazwa ma być nazwą pliku \
pozwalającą szybko namierzyć odpowiednią grafikę w obrębie jednego działu.
Użyj maksymalnie 5 słów. Zwróć tylko nazwę, bez żadnych dodatkowych informacji, a spacje zamień na podkreślenie.

Przykłady:
Enzymy_aktywowane_przez_fosforylację
Fotosystem
Cykl_Krebsa";

/// Produces a filename stem for a cropped figure.
#[async_trait]
pub trait FigureNamer: Send + Sync {
    async fn name(&self, figure: &DynamicImage) -> Result<String>;
}

#[derive(Debug, Clone, Serialize)]
struct ResponsesRequest {
    model: String,
    input: Vec<InputMessage>,
}

#[derive(Debug, Clone, Serialize)]
struct InputMessage {
    role: String,
    content: Vec<InputContent>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum InputContent {
    InputText { text: String },
    InputImage { image_url: String },
}

#[derive(Debug, Clone, Deserialize)]
struct ResponsesResponse {
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Debug, Clone, Deserialize)]
struct OutputItem {
    #[serde(default)]
    content: Vec<OutputContent>,
}

#[derive(Debug, Clone, Deserialize)]
struct OutputContent {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: Option<String>,
}

/// OpenAI `responses` API client used as a [`FigureNamer`].
#[derive(Debug, Clone)]
pub struct FilenameGenerator {
    api_key: String,
    base_url: String,
    model: String,
    prompt: String,
    http_client: reqwest::Client,
}

impl FilenameGenerator {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
            prompt: DEFAULT_PROMPT.to_string(),
            http_client,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let generator = Self::new(&config.openai_api_key, &config.openai_base_url, &config.naming_model)?;
        Ok(match &config.naming_prompt {
            Some(prompt) => generator.with_prompt(prompt.clone()),
            None => generator,
        })
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, image_base64: &str) -> ResponsesRequest {
        ResponsesRequest {
            model: self.model.clone(),
            input: vec![InputMessage {
                role: "user".to_string(),
                content: vec![
                    InputContent::InputText {
                        text: self.prompt.clone(),
                    },
                    InputContent::InputImage {
                        image_url: format!("data:image/jpeg;base64,{image_base64}"),
                    },
                ],
            }],
        }
    }
}

#[async_trait]
impl FigureNamer for FilenameGenerator {
    async fn name(&self, figure: &DynamicImage) -> Result<String> {
        let figure = figure.clone();
        let image_base64 = tokio::task::spawn_blocking(move || encode_jpeg_base64(&figure))
            .await
            .context("Failed to spawn blocking task for JPEG encoding")??;

        let response = self
            .http_client
            .post(format!("{}/responses", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&self.build_request(&image_base64))
            .send()
            .await
            .context("Failed to send naming request")?;

        let status = response.status();
        let body = response.text().await.context("Failed to read naming response")?;
        if !status.is_success() {
            anyhow::bail!("Naming request failed with status {status}: {body}");
        }

        let raw = output_text(&body)?;
        info!(raw = %raw.trim(), "generated figure name");
        Ok(sanitize_filename(&raw))
    }
}

/// Encodes an image as base64 JPEG.
pub fn encode_jpeg_base64(image: &DynamicImage) -> Result<String> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image.to_rgb8())
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
        .context("Failed to encode figure as JPEG")?;
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}

/// Concatenates every `output_text` part of a `responses` API body.
fn output_text(body: &str) -> Result<String> {
    let response: ResponsesResponse = serde_json::from_str(body).context("Failed to parse naming response")?;
    let text: String = response
        .output
        .iter()
        .flat_map(|item| item.content.iter())
        .filter(|part| part.content_type == "output_text")
        .filter_map(|part| part.text.as_deref())
        .collect();
    debug!(len = text.len(), "naming response text");
    if text.trim().is_empty() {
        anyhow::bail!("Naming response contained no text");
    }
    Ok(text)
}

fn unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[\s/\\:*?"<>|\x00-\x1f]+"#).expect("valid regex"))
}

/// Turns model output into a safe filename stem: whitespace and
/// path-hostile characters become `_`, length is capped at
/// [`CHAR_LIMIT`] characters, and an empty result becomes
/// [`FALLBACK_NAME`].
pub fn sanitize_filename(raw: &str) -> String {
    let replaced = unsafe_chars().replace_all(raw.trim(), "_");
    let trimmed = replaced.trim_matches(|c: char| c == '_' || c == '.');
    let limited: String = trimmed.chars().take(CHAR_LIMIT).collect();
    let limited = limited.trim_end_matches(|c: char| c == '_' || c == '.');
    if limited.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        limited.to_string()
    }
}
