//! Thin HTTP client for OpenAI chat completions with one image attached.
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::providers::{VisionChat, JPEG_MIME};

#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Deserialize, Debug)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: Message,
}

#[derive(Deserialize, Debug)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(base_url: String, model: String, api_key: String) -> Self {
        let base = base_url.trim_end_matches('/').to_string();
        OpenAiClient { client: Client::new(), base_url: base, model, api_key }
    }
}

fn chat_body(model: &str, prompt: &str, jpeg: &[u8]) -> Value {
    json!({
        "model": model,
        "messages": [{
            "role": "user",
            "content": [
                {"type": "text", "text": prompt},
                {
                    "type": "image_url",
                    "image_url": {"url": format!("data:{};base64,{}", JPEG_MIME, STANDARD.encode(jpeg))}
                }
            ]
        }]
    })
}

fn first_message(completion: ChatCompletion) -> AppResult<String> {
    completion
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|s| s.trim().to_string())
        .ok_or_else(|| AppError::InvalidModelOutput("OpenAI returned no message content".to_string()))
}

#[async_trait]
impl VisionChat for OpenAiClient {
    async fn ask_about_image(&self, prompt: &str, jpeg: &[u8]) -> AppResult<String> {
        let url = format!("{}/chat/completions", self.base_url);
        tracing::info!("Sending chat completion to OpenAI at URL: {}", url);
        tracing::debug!(model = %self.model, image_bytes = jpeg.len(), "OpenAI payload");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&chat_body(&self.model, prompt, jpeg))
            .send()
            .await
            .map_err(AppError::HttpClient)?;

        if response.status().is_success() {
            let completion: ChatCompletion = response.json().await.map_err(AppError::HttpClient)?;
            first_message(completion)
        } else {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_else(|_| "Unable to read error body".to_string());
            let error_message = format!("OpenAI request failed. Status: {}, Body: {}", status, error_body);
            tracing::error!("{}", error_message);
            Err(AppError::Provider(error_message))
        }
    }
}
