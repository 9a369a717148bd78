use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("corrupt file: {0}")]
    CorruptFile(String),
}

/// Format-specific text extraction. PDF and other binary formats are
/// handled by external implementations of this trait; the pipeline only
/// ever sees plain text.
pub trait TextExtractor: Send + Sync {
    /// Whether this extractor can handle the given filename at all. Used
    /// to reject unsupported uploads before a document row is created.
    fn supports(&self, filename: &str) -> bool;

    fn extract(&self, bytes: &[u8], filename: &str) -> Result<String, ExtractError>;
}

/// Extractor for plain-text manual formats.
pub struct PlainTextExtractor;

const TEXT_EXTENSIONS: [&str; 4] = ["txt", "text", "md", "markdown"];

impl PlainTextExtractor {
    fn extension(filename: &str) -> Option<String> {
        Path::new(filename)
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
    }
}

impl TextExtractor for PlainTextExtractor {
    fn supports(&self, filename: &str) -> bool {
        Self::extension(filename)
            .map(|ext| TEXT_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or(false)
    }

    fn extract(&self, bytes: &[u8], filename: &str) -> Result<String, ExtractError> {
        if !self.supports(filename) {
            return Err(ExtractError::UnsupportedFormat(filename.to_string()));
        }

        String::from_utf8(bytes.to_vec())
            .map_err(|_| ExtractError::CorruptFile(format!("{filename} is not valid UTF-8")))
    }
}
