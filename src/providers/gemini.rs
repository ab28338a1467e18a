//! Thin HTTP client for the Gemini `generateContent` endpoint.
//!
//! Images travel as base64 `inlineData` parts in both directions.
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::providers::{EditRequest, Generation, ImageEditor, Part};

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Serialize, Deserialize, Debug, Default)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, alias = "inline_data", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(alias = "mime_type")]
    mime_type: String,
    data: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GeminiClient {
    pub fn new(base_url: String, model: String, api_key: String) -> Self {
        let base = base_url.trim_end_matches('/').to_string();
        let model = model.trim_start_matches("models/").to_string();
        GeminiClient { client: Client::new(), base_url: base, model, api_key }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

fn encode_request(request: &EditRequest) -> GenerateContentRequest {
    let parts = request
        .parts
        .iter()
        .map(|p| match p {
            Part::Text(t) => WirePart { text: Some(t.clone()), inline_data: None },
            Part::Image { mime_type, data } => WirePart {
                text: None,
                inline_data: Some(InlineData { mime_type: mime_type.clone(), data: STANDARD.encode(data) }),
            },
        })
        .collect();
    GenerateContentRequest {
        contents: vec![Content { role: Some("user".to_string()), parts }],
        generation_config: request.temperature.map(|temperature| GenerationConfig { temperature }),
    }
}

fn decode_response(response: GenerateContentResponse) -> AppResult<Generation> {
    if response.candidates.is_empty() {
        if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(AppError::Provider(format!("Gemini blocked the prompt: {}", reason)));
        }
    }
    let mut parts = Vec::new();
    for candidate in response.candidates {
        let Some(content) = candidate.content else { continue };
        for part in content.parts {
            if let Some(inline) = part.inline_data {
                let data = STANDARD
                    .decode(inline.data.as_bytes())
                    .map_err(|e| AppError::InvalidModelOutput(format!("inline data is not base64: {}", e)))?;
                parts.push(Part::Image { mime_type: inline.mime_type, data });
            } else if let Some(text) = part.text {
                parts.push(Part::Text(text));
            }
        }
    }
    Ok(Generation { parts })
}

#[async_trait]
impl ImageEditor for GeminiClient {
    async fn generate(&self, request: EditRequest) -> AppResult<Generation> {
        let url = self.endpoint();
        let body = encode_request(&request);
        tracing::info!("Sending generateContent to Gemini at URL: {}", url);
        tracing::debug!(parts = request.parts.len(), temperature = ?request.temperature, "Gemini payload");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(AppError::HttpClient)?;

        if response.status().is_success() {
            let parsed: GenerateContentResponse = response.json().await.map_err(AppError::HttpClient)?;
            let generation = decode_response(parsed)?;
            tracing::info!(parts = generation.parts.len(), "Gemini responded");
            Ok(generation)
        } else {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_else(|_| "Unable to read error body".to_string());
            let error_message = format!("Gemini request failed. Status: {}, Body: {}", status, error_body);
            tracing::error!("{}", error_message);
            Err(AppError::Provider(error_message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_uses_camel_case_inline_data() {
        let req = EditRequest::new(vec![Part::text("hi"), Part::png(vec![0xff, 0x00])]).with_temperature(0.2);
        let v = serde_json::to_value(encode_request(&req)).unwrap();
        assert_eq!(v["contents"][0]["role"], "user");
        assert_eq!(v["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(v["contents"][0]["parts"][1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(v["contents"][0]["parts"][1]["inlineData"]["data"], "/wA=");
        assert!((v["generationConfig"]["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn request_without_temperature_omits_config() {
        let v = serde_json::to_value(encode_request(&EditRequest::new(vec![Part::text("x")]))).unwrap();
        assert!(v.get("generationConfig").is_none());
    }

    #[test]
    fn response_accepts_both_inline_data_spellings() {
        let raw = json!({
            "candidates": [
                {"content": {"parts": [{"text": "done"}, {"inline_data": {"mime_type": "image/png", "data": "AQI="}}]}},
                {"content": {"parts": [{"inlineData": {"mimeType": "image/png", "data": "Aw=="}}]}}
            ]
        });
        let parsed: GenerateContentResponse = serde_json::from_value(raw).unwrap();
        let g = decode_response(parsed).unwrap();
        assert_eq!(g.text(), "done");
        assert_eq!(g.parts.len(), 3);
        assert_eq!(g.into_first_image(), Some(vec![1u8, 2]));
    }

    #[test]
    fn blocked_prompt_is_a_provider_error() {
        let parsed: GenerateContentResponse =
            serde_json::from_value(json!({"promptFeedback": {"blockReason": "SAFETY"}})).unwrap();
        let err = decode_response(parsed).unwrap_err();
        assert!(matches!(err, AppError::Provider(ref m) if m.contains("SAFETY")));
    }

    #[test]
    fn model_prefix_is_normalized() {
        let c = GeminiClient::new("http://x/".into(), "models/gemini-2.5-flash-image".into(), "k".into());
        assert_eq!(c.endpoint(), "http://x/models/gemini-2.5-flash-image:generateContent");
    }
}
