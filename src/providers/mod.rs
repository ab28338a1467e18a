//! Generative provider seams.
//!
//! Workflows talk to two capabilities: an image editor that takes text and
//! images and answers with inline parts (Gemini), and a vision chat model that
//! answers a text question about one image (OpenAI). Both are traits so the
//! handlers can be driven by mocks in tests.
use async_trait::async_trait;

use crate::error::AppResult;

pub mod gemini;
pub mod openai;

pub use gemini::GeminiClient;
pub use openai::OpenAiClient;

pub const PNG_MIME: &str = "image/png";
pub const JPEG_MIME: &str = "image/jpeg";

/// One piece of a multimodal prompt or response.
#[derive(Clone, Debug, PartialEq)]
pub enum Part {
    Text(String),
    Image { mime_type: String, data: Vec<u8> },
}

impl Part {
    pub fn text(s: impl Into<String>) -> Self {
        Part::Text(s.into())
    }

    pub fn png(data: Vec<u8>) -> Self {
        Part::Image { mime_type: PNG_MIME.to_string(), data }
    }
}

#[derive(Clone, Debug, Default)]
pub struct EditRequest {
    pub parts: Vec<Part>,
    pub temperature: Option<f32>,
}

impl EditRequest {
    pub fn new(parts: Vec<Part>) -> Self {
        EditRequest { parts, temperature: None }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Decoded response parts, in candidate order.
#[derive(Clone, Debug, Default)]
pub struct Generation {
    pub parts: Vec<Part>,
}

impl Generation {
    /// Bytes of the first non-empty inline image, if any.
    pub fn into_first_image(self) -> Option<Vec<u8>> {
        self.parts.into_iter().find_map(|p| match p {
            Part::Image { data, .. } if !data.is_empty() => Some(data),
            _ => None,
        })
    }

    /// Concatenated text parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

#[async_trait]
pub trait ImageEditor: Send + Sync {
    async fn generate(&self, request: EditRequest) -> AppResult<Generation>;
}

#[async_trait]
pub trait VisionChat: Send + Sync {
    /// Ask `prompt` about a JPEG image and return the model's text answer.
    async fn ask_about_image(&self, prompt: &str, jpeg: &[u8]) -> AppResult<String>;
}
