//! Minimal OpenAI REST client: chat completions (text or vision) and image
//! generation.

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use core_logic::{env_required, with_retry, NetworkError, RetryConfig};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const API_BASE: &str = "https://api.openai.com/v1";
const API_TIMEOUT: Duration = Duration::from_secs(120);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Serialize, Clone, Debug)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize, Clone, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize, Clone, Debug)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Serialize, Clone, Debug)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Parts(parts),
        }
    }
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Inline image as a base64 data URL.
    pub fn image_base64(mime: &str, data: &str) -> Self {
        Self::ImageUrl {
            image_url: ImageUrl {
                url: format!("data:{};base64,{}", mime, data),
            },
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Serialize, Debug, Clone)]
pub struct ImageRequest {
    pub model: String,
    pub prompt: String,
    pub n: u32,
    pub size: String,
    /// DALL-E takes `standard`/`hd`; gpt-image models reject those values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
}

impl ImageRequest {
    /// One image of `size`. DALL-E only quality values are dropped for
    /// gpt-image models.
    pub fn new(model: &str, prompt: &str, size: &str, quality: &str) -> Self {
        let quality = if is_gpt_image_model(model) && matches!(quality, "standard" | "hd") {
            None
        } else {
            Some(quality.to_string())
        };
        Self {
            model: model.to_string(),
            prompt: prompt.to_string(),
            n: 1,
            size: size.to_string(),
            quality,
        }
    }
}

pub fn is_gpt_image_model(model: &str) -> bool {
    model.starts_with("gpt-image")
}

/// What the image endpoint handed back: DALL-E returns a temporary URL,
/// gpt-image models return the PNG inline as base64.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedImage {
    Url(String),
    Bytes(Vec<u8>),
}

impl GeneratedImage {
    /// Short description for debug logs.
    pub fn describe(&self) -> String {
        match self {
            GeneratedImage::Url(url) => url.clone(),
            GeneratedImage::Bytes(bytes) => format!("<b64_json, {} bytes>", bytes.len()),
        }
    }
}

#[derive(Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Deserialize)]
struct ImageData {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    b64_json: Option<String>,
}

#[derive(Clone)]
pub struct OpenAiClient {
    http: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(API_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            api_key,
            base_url: API_BASE.to_string(),
        })
    }

    /// Fails when `OPENAI_API_KEY` is not set.
    pub fn from_env() -> Result<Self> {
        Self::new(env_required("OPENAI_API_KEY")?)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POSTs `payload` and returns the raw JSON response. Non-2xx statuses
    /// become [`NetworkError::HttpError`] carrying the response body. 5xx
    /// responses and timeouts are retried twice.
    pub async fn post_json<T: Serialize + ?Sized>(&self, path: &str, payload: &T) -> Result<Value> {
        let retry = RetryConfig::new(2, 2000).transient_only();
        with_retry(retry, &format!("openai {}", path), || self.post_json_once(path, payload)).await
    }

    async fn post_json_once<T: Serialize + ?Sized>(&self, path: &str, payload: &T) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .await
            .with_context(|| format!("OpenAI request to {} failed", path))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NetworkError::HttpError {
                status_code: status.as_u16(),
                endpoint: url,
                body,
            }
            .into());
        }

        response
            .json::<Value>()
            .await
            .with_context(|| format!("Could not parse OpenAI response from {}", path))
    }

    /// Content of the first choice.
    pub async fn chat(&self, model: &str, messages: &[ChatMessage], max_tokens: Option<u32>) -> Result<String> {
        let request = ChatRequest {
            model,
            messages,
            max_tokens,
        };
        let raw = self.post_json("chat/completions", &request).await?;
        first_choice_content(raw)
    }

    pub async fn generate_image(&self, request: &ImageRequest) -> Result<GeneratedImage> {
        let raw = self.post_json("images/generations", request).await?;
        first_image(raw)
    }

    /// Raw image bytes, downloading first when the API returned a URL.
    pub async fn image_bytes(&self, image: GeneratedImage) -> Result<Vec<u8>> {
        match image {
            GeneratedImage::Url(url) => self.download(&url).await,
            GeneratedImage::Bytes(bytes) => Ok(bytes),
        }
    }

    pub async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(url)
            .timeout(DOWNLOAD_TIMEOUT)
            .send()
            .await
            .context("Image download failed")?;
        if !response.status().is_success() {
            anyhow::bail!("Failed to download image: {}", response.status());
        }
        let bytes = response.bytes().await.context("Image download interrupted")?;
        Ok(bytes.to_vec())
    }
}

pub(crate) fn first_choice_content(raw: Value) -> Result<String> {
    let parsed: ChatCompletionResponse =
        serde_json::from_value(raw).context("Unexpected chat completion shape")?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .context("Chat completion contained no content")
}

/// First image of a generation response: `url`, then `image_url`, then
/// decoded `b64_json`.
pub(crate) fn first_image(raw: Value) -> Result<GeneratedImage> {
    let parsed: ImageResponse =
        serde_json::from_value(raw).context("Unexpected image generation shape")?;
    let first = parsed
        .data
        .into_iter()
        .next()
        .context("Image generation returned no data")?;

    if let Some(url) = first.url.or(first.image_url) {
        return Ok(GeneratedImage::Url(url));
    }
    match first.b64_json {
        Some(encoded) => {
            let bytes = STANDARD
                .decode(encoded.trim())
                .context("Image generation returned invalid base64")?;
            Ok(GeneratedImage::Bytes(bytes))
        }
        None => bail!("No image data found in response"),
    }
}
