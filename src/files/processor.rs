//! File processor

use super::{image_mime_type, FileKind};
use crate::ai::{prompts, AiService};
use crate::config::FilesConfig;
use crate::error::{Error, Result};
use std::sync::Arc;

/// Extracts content from uploads and asks the AI backend to analyse it
pub struct FileProcessor {
    ai: Arc<dyn AiService>,
    config: FilesConfig,
}

impl FileProcessor {
    /// Create a processor
    pub fn new(ai: Arc<dyn AiService>, config: FilesConfig) -> Self {
        Self { ai, config }
    }

    /// Reject uploads above the configured ceiling before downloading them
    pub fn check_size(&self, size: Option<u64>) -> Result<()> {
        match size {
            Some(size) if size > self.config.max_bytes => Err(Error::File(format!(
                "file is {} bytes, limit is {} bytes",
                size, self.config.max_bytes
            ))),
            _ => Ok(()),
        }
    }

    /// Analyse a downloaded file
    pub async fn process(&self, file_name: &str, bytes: Vec<u8>) -> Result<String> {
        let kind = FileKind::from_file_name(file_name)?;

        tracing::debug!(file_name, kind = kind.as_str(), size = bytes.len(), "Processing file");

        match kind {
            FileKind::Image => self.analyze_image(&bytes, image_mime_type(file_name)).await,
            FileKind::Pdf => {
                let text = extract_pdf_text(bytes).await?;
                let prompt = prompts::pdf_analysis(clip(&text, self.config.max_prompt_chars));
                self.ai.generate_text(&prompt).await
            }
            FileKind::Text => {
                let text = String::from_utf8_lossy(&bytes);
                let prompt = prompts::text_analysis(clip(&text, self.config.max_prompt_chars));
                self.ai.generate_text(&prompt).await
            }
        }
    }

    /// Analyse image bytes
    pub async fn analyze_image(&self, bytes: &[u8], mime_type: &str) -> Result<String> {
        self.ai.analyze_image(bytes, mime_type).await
    }

    /// Transcribe a voice note
    pub async fn transcribe_voice(&self, bytes: &[u8], mime_type: &str) -> Result<String> {
        self.ai.transcribe_audio(bytes, mime_type).await
    }
}

/// Extract all page text from an in-memory PDF
pub async fn extract_pdf_text(bytes: Vec<u8>) -> Result<String> {
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        // the extractor panics on some malformed files
        .map_err(|e| Error::File(format!("PDF extraction aborted: {}", e)))?
        .map_err(|e| Error::File(format!("Could not read PDF: {}", e)))?;

    if text.trim().is_empty() {
        return Err(Error::File("PDF has no extractable text".to_string()));
    }
    Ok(text)
}

/// First `max_chars` characters of `text`
fn clip(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct EchoAi {
        prompts: Mutex<Vec<String>>,
        images: Mutex<Vec<(usize, String)>>,
    }

    #[async_trait]
    impl AiService for EchoAi {
        async fn generate_text(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("analysis".to_string())
        }

        async fn analyze_image(&self, image: &[u8], mime_type: &str) -> Result<String> {
            self.images
                .lock()
                .unwrap()
                .push((image.len(), mime_type.to_string()));
            Ok("image analysis".to_string())
        }

        async fn transcribe_audio(&self, _audio: &[u8], _mime_type: &str) -> Result<String> {
            Ok("hello".to_string())
        }
    }

    fn processor(ai: Arc<EchoAi>) -> FileProcessor {
        FileProcessor::new(
            ai,
            FilesConfig {
                max_bytes: 1024,
                max_prompt_chars: 10,
            },
        )
    }

    #[test]
    fn test_clip_counts_chars() {
        assert_eq!(clip("hello", 10), "hello");
        assert_eq!(clip("hello world", 5), "hello");
        assert_eq!(clip("héllo", 2), "hé");
        assert_eq!(clip("", 3), "");
    }

    #[test]
    fn test_check_size() {
        let p = processor(Arc::new(EchoAi::default()));
        assert!(p.check_size(None).is_ok());
        assert!(p.check_size(Some(1024)).is_ok());
        assert!(matches!(p.check_size(Some(1025)), Err(Error::File(_))));
    }

    #[tokio::test]
    async fn test_text_file_is_clipped_into_prompt() {
        let ai = Arc::new(EchoAi::default());
        let reply = processor(ai.clone())
            .process("notes.txt", b"0123456789ABCDEF".to_vec())
            .await
            .unwrap();

        assert_eq!(reply, "analysis");
        let prompts = ai.prompts.lock().unwrap();
        assert_eq!(prompts[0], "Analyze this text content:\n0123456789");
    }

    #[tokio::test]
    async fn test_image_goes_to_vision() {
        let ai = Arc::new(EchoAi::default());
        let reply = processor(ai.clone())
            .process("cat.png", vec![1, 2, 3])
            .await
            .unwrap();

        assert_eq!(reply, "image analysis");
        assert_eq!(ai.images.lock().unwrap()[0], (3, "image/png".to_string()));
    }

    #[tokio::test]
    async fn test_unsupported_file_skips_ai() {
        let ai = Arc::new(EchoAi::default());
        let err = processor(ai.clone())
            .process("tool.zip", vec![0; 4])
            .await
            .unwrap_err();

        assert!(matches!(err, Error::UnsupportedFile(_)));
        assert!(ai.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_garbage_pdf_is_an_error() {
        let ai = Arc::new(EchoAi::default());
        let err = processor(ai.clone())
            .process("broken.pdf", b"definitely not a pdf".to_vec())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::File(_)));
        assert!(ai.prompts.lock().unwrap().is_empty());
    }

    /// A one-page PDF whose content stream shows text without selecting a font
    fn pdf_without_font() -> Vec<u8> {
        let content = "BT (Hello) Tj ET";
        let objects = [
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 200 200] /Resources << >> /Contents 4 0 R >>"
                .to_string(),
            format!("<< /Length {} >>\nstream\n{}\nendstream", content.len(), content),
        ];

        let mut pdf = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
        }

        let xref = pdf.len();
        pdf.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
        for offset in offsets {
            pdf.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        pdf.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
                objects.len() + 1,
                xref
            )
            .as_bytes(),
        );
        pdf
    }

    #[tokio::test]
    async fn test_pdf_that_crashes_extractor_is_an_error() {
        let ai = Arc::new(EchoAi::default());
        let err = processor(ai.clone())
            .process("report.pdf", pdf_without_font())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::File(_)));
        assert!(ai.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transcribe_voice() {
        let p = processor(Arc::new(EchoAi::default()));
        assert_eq!(p.transcribe_voice(b"OggS", "audio/ogg").await.unwrap(), "hello");
    }
}
