//! Uploaded file handling
//!
//! Files are classified by extension, text is extracted in memory and the
//! result is handed to the AI backend for analysis.

mod processor;

pub use processor::FileProcessor;

use crate::error::{Error, Result};
use std::path::Path;

/// Supported upload categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// `.jpg`, `.jpeg`, `.png`, `.webp`
    Image,
    /// `.pdf`
    Pdf,
    /// `.txt`, `.md`, `.csv`, `.log`
    Text,
}

impl FileKind {
    /// Classify a file by its (case-insensitive) extension
    pub fn from_file_name(file_name: &str) -> Result<Self> {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "jpg" | "jpeg" | "png" | "webp" => Ok(FileKind::Image),
            "pdf" => Ok(FileKind::Pdf),
            "txt" | "md" | "csv" | "log" => Ok(FileKind::Text),
            "" => Err(Error::UnsupportedFile(format!("{} (no extension)", file_name))),
            other => Err(Error::UnsupportedFile(format!(".{}", other))),
        }
    }

    /// Label stored with file records
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Image => "image",
            FileKind::Pdf => "pdf",
            FileKind::Text => "text",
        }
    }
}

/// MIME type for an image file name; JPEG when unknown
pub fn image_mime_type(file_name: &str) -> &'static str {
    let lower = file_name.to_ascii_lowercase();
    if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".webp") {
        "image/webp"
    } else {
        "image/jpeg"
    }
}
