//! Gemini REST client

use super::prompts;
use super::types::{
    Content, ErrorResponse, GenerateRequest, GenerateResponse, GenerationConfig, Part,
};
use super::AiService;
use crate::config::AiConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::time::Duration;

/// Returned when the model answers without any text
pub const NO_TEXT_FALLBACK: &str = "Sorry, I couldn't process your message properly.";

/// Returned when an image analysis comes back without any text
pub const NO_IMAGE_TEXT_FALLBACK: &str = "Sorry, I couldn't analyze this image properly.";

/// Google Gemini client over the `generateContent` endpoint
pub struct GeminiClient {
    client: reqwest::Client,
    config: AiConfig,
    base_url: String,
}

impl GeminiClient {
    /// Create a client from config
    pub fn new(config: AiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            config,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    /// Send one user turn and return the candidate text, if any
    async fn generate(&self, model: &str, parts: Vec<Part>) -> Result<Option<String>> {
        if self.config.api_key.is_empty() {
            return Err(Error::Ai("Gemini API key is not configured".to_string()));
        }

        let request = GenerateRequest {
            contents: vec![Content::user(parts)],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_output_tokens,
            },
        };

        tracing::debug!(model, "Calling Gemini generateContent");

        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            tracing::error!(status = status.as_u16(), "Gemini request failed: {}", message);
            return Err(Error::api("Gemini", status.as_u16(), message));
        }

        let parsed: GenerateResponse = serde_json::from_str(&body)?;
        let text = parsed.first_text();
        if text.is_none() {
            tracing::warn!(model, "Gemini returned no candidate text");
        }
        Ok(text)
    }
}

#[async_trait]
impl AiService for GeminiClient {
    async fn generate_text(&self, prompt: &str) -> Result<String> {
        let text = self
            .generate(&self.config.chat_model, vec![Part::text(prompt)])
            .await?;
        Ok(text.unwrap_or_else(|| NO_TEXT_FALLBACK.to_string()))
    }

    async fn analyze_image(&self, image: &[u8], mime_type: &str) -> Result<String> {
        let parts = vec![
            Part::text(prompts::IMAGE_ANALYSIS),
            Part::inline(mime_type, BASE64.encode(image)),
        ];
        let text = self.generate(&self.config.vision_model, parts).await?;
        Ok(text.unwrap_or_else(|| NO_IMAGE_TEXT_FALLBACK.to_string()))
    }

    async fn transcribe_audio(&self, audio: &[u8], mime_type: &str) -> Result<String> {
        let parts = vec![
            Part::text(prompts::TRANSCRIPTION),
            Part::inline(mime_type, BASE64.encode(audio)),
        ];
        let text = self.generate(&self.config.vision_model, parts).await?;
        Ok(text.map(|t| t.trim().to_string()).unwrap_or_default())
    }
}
