//! Recognition through the `tesseract` command line tool.

use std::process::Command;

use image::ImageFormat;
use tracing::{debug, trace};

use super::{Result, TextRecognizer};
use crate::error::OcrError;
use crate::models::config::OcrConfig;
use crate::raster::PageImage;

/// Runs `tesseract <page.png> stdout` for each page.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    command: String,
    language: String,
    page_segmentation_mode: u8,
}

impl TesseractRecognizer {
    /// Create a recognizer invoking `command` with the given language.
    pub fn new(command: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            language: language.into(),
            page_segmentation_mode: 3,
        }
    }

    /// Create a recognizer from the OCR section of the config.
    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(config.tesseract_cmd.clone(), config.language.clone())
            .with_page_segmentation_mode(config.page_segmentation_mode)
    }

    /// Set the `--psm` value passed to tesseract.
    pub fn with_page_segmentation_mode(mut self, mode: u8) -> Self {
        self.page_segmentation_mode = mode;
        self
    }

    fn failure(&self, page: &PageImage, reason: impl Into<String>) -> OcrError {
        OcrError::Recognition {
            page: page.index,
            reason: reason.into(),
        }
    }
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self::new("tesseract", "eng")
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize(&self, page: &PageImage) -> Result<String> {
        let staged = tempfile::Builder::new()
            .prefix("scanvoice-page-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| self.failure(page, format!("failed to stage page: {}", e)))?;
        page.image
            .save_with_format(staged.path(), ImageFormat::Png)
            .map_err(|e| self.failure(page, format!("failed to stage page: {}", e)))?;

        trace!("Running {} on {}", self.command, staged.path().display());

        let output = Command::new(&self.command)
            .arg(staged.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg(self.page_segmentation_mode.to_string())
            .output()
            .map_err(|e| self.failure(page, format!("failed to run {}: {}", self.command, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.failure(
                page,
                format!("{} exited with {}: {}", self.command, output.status, stderr.trim()),
            ));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("tesseract read {} characters from page {}", text.len(), page.index);
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GrayImage;

    #[test]
    fn test_from_config() {
        let config = OcrConfig {
            tesseract_cmd: "/opt/tesseract".to_string(),
            language: "pol".to_string(),
            page_segmentation_mode: 6,
            ..OcrConfig::default()
        };
        let recognizer = TesseractRecognizer::from_config(&config);
        assert_eq!(recognizer.command, "/opt/tesseract");
        assert_eq!(recognizer.language, "pol");
        assert_eq!(recognizer.page_segmentation_mode, 6);
    }

    #[test]
    fn test_missing_binary_reports_page() {
        let recognizer = TesseractRecognizer::new("scanvoice-no-such-tesseract", "eng");
        let page = PageImage {
            index: 2,
            image: GrayImage::new(8, 8),
        };

        let err = recognizer.recognize(&page).unwrap_err();
        assert!(matches!(err, OcrError::Recognition { page: 2, .. }));
    }
}
