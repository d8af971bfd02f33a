use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{error, info};

use crate::{config::GeminiConfig, models::GenerationRequest};

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("HTTP error: {0}")] Http(String),
    #[error("status={status} body={body}")] Status { status: reqwest::StatusCode, body: String },
    #[error("parse error: {0}")] Parse(String),
}

// Helper function to truncate base64 data in JSON for cleaner logging
fn truncate_base64_in_json(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                if key == "data" {
                    if let serde_json::Value::String(s) = val {
                        if s.len() > 100 && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=') {
                            *val = serde_json::Value::String(format!("{}...[truncated {} chars]", &s[..50], s.len() - 50));
                        }
                    }
                } else {
                    truncate_base64_in_json(val);
                }
            }
        }
        serde_json::Value::Array(arr) => {
            for val in arr.iter_mut() {
                truncate_base64_in_json(val);
            }
        }
        _ => {}
    }
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent?key={}", self.base_url, self.model, self.api_key)
    }

    pub fn request_body(request: &GenerationRequest) -> serde_json::Value {
        json!({
            "contents": [{
                "parts": [
                    {"inlineData": &request.model_part},
                    {"inlineData": &request.product_part},
                    {"text": request.instruction_text}
                ]
            }],
            "generationConfig": {
                "responseModalities": ["IMAGE", "TEXT"]
            }
        })
    }

    async fn perform_api_call(&self, request: &GenerationRequest) -> Result<GeminiResponse, GeminiError> {
        let url = self.endpoint();
        info!("🔗 Making request to: {}", url.replace(&self.api_key, "***"));

        let request_body = Self::request_body(request);
        let mut logged_body = request_body.clone();
        truncate_base64_in_json(&mut logged_body);
        info!("📤 Request body: {}", serde_json::to_string_pretty(&logged_body).unwrap_or_default());

        let response = self.client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| GeminiError::Http(e.without_url().to_string()))?;

        let status = response.status();
        info!("📥 Response status: {}", status);

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!("❌ API Error response: {}", error_body);
            return Err(GeminiError::Status { status, body: error_body });
        }

        let response_text = response.text().await
            .map_err(|e| GeminiError::Http(e.without_url().to_string()))?;

        let truncated_response = match serde_json::from_str::<serde_json::Value>(&response_text) {
            Ok(mut json_value) => {
                truncate_base64_in_json(&mut json_value);
                serde_json::to_string(&json_value).unwrap_or_default()
            }
            Err(_) => response_text.chars().take(1000).collect(),
        };
        info!("📥 Raw Gemini API response: {}", truncated_response);

        serde_json::from_str(&response_text).map_err(|e| GeminiError::Parse(e.to_string()))
    }

    /// Submits the composite request once. `Ok(None)` means the service answered without an image.
    pub async fn generate_image(&self, request: &GenerationRequest) -> Result<Option<InlineData>, GeminiError> {
        info!("Generating image with Gemini API...");
        let parsed = self.perform_api_call(request).await?;

        if let Some(reason) = parsed.prompt_feedback.as_ref().and_then(|f| f.block_reason.as_deref()) {
            info!("⚠️ Prompt blocked: {}", reason);
        }

        let image = first_inline_image(&parsed).cloned();
        match &image {
            Some(inline) => info!("🖼️ Extracted {} image ({} chars)", inline.mime_type, inline.data.len()),
            None => {
                let texts = first_candidate_texts(&parsed);
                info!("⚠️ No image data found in API response; text parts: {:?}", texts);
            }
        }
        Ok(image)
    }
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback { #[serde(default)] block_reason: Option<String> }

#[derive(Debug, Deserialize)]
struct Candidate { #[serde(default)] content: Content }

#[derive(Debug, Deserialize, Default)]
struct Content { #[serde(default)] parts: Vec<Part> }

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Part {
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData
    },
    Text { text: String },
    #[allow(dead_code)]
    Other(serde_json::Value)
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InlineData {
    pub data: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

impl InlineData {
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// First inline image in the first candidate, wherever it sits among the parts.
fn first_inline_image(resp: &GeminiResponse) -> Option<&InlineData> {
    resp.candidates.first()?.content.parts.iter().find_map(|p| match p {
        Part::Inline { inline_data } => Some(inline_data),
        _ => None,
    })
}

fn first_candidate_texts(resp: &GeminiResponse) -> Vec<&str> {
    resp.candidates
        .first()
        .map(|c| {
            c.content.parts.iter().filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            }).collect()
        })
        .unwrap_or_default()
}
