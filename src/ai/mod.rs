//! Generative-AI backend
//!
//! The rest of the crate depends on [`AiService`]; [`GeminiClient`] is the
//! production implementation.

mod client;
pub mod prompts;
mod types;

pub use client::{GeminiClient, NO_IMAGE_TEXT_FALLBACK, NO_TEXT_FALLBACK};

use crate::error::Result;
use async_trait::async_trait;

/// Text, image and audio generation
#[async_trait]
pub trait AiService: Send + Sync {
    /// Answer a text prompt
    async fn generate_text(&self, prompt: &str) -> Result<String>;

    /// Describe an image with the standard analysis prompt
    async fn analyze_image(&self, image: &[u8], mime_type: &str) -> Result<String>;

    /// Transcribe a voice note; empty when nothing intelligible was said
    async fn transcribe_audio(&self, audio: &[u8], mime_type: &str) -> Result<String>;
}
