//! Error types for the scanvoice-core library.

use thiserror::Error;

/// Main error type for the scanvoice library.
///
/// Every variant is fatal to the document being processed. Degraded outcomes
/// (a failed AI call, an unparseable date) never surface here.
#[derive(Error, Debug)]
pub enum ScanvoiceError {
    /// Document rasterization error.
    #[error("raster error: {0}")]
    Raster(#[from] RasterError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Invoice extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while turning a raw document into page images.
#[derive(Error, Debug)]
pub enum RasterError {
    /// The file extension is not an image or PDF we know how to decode.
    #[error("unsupported file format: {0:?}")]
    UnsupportedFormat(String),

    /// The document bytes could not be decoded.
    #[error("failed to decode document: {0}")]
    Decode(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// The external page renderer failed.
    #[error("page rendering failed: {0}")]
    Render(String),

    /// Staging area for intermediate renders could not be used.
    #[error("staging error: {0}")]
    Staging(#[from] std::io::Error),
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text recognition failed.
    #[error("text recognition failed on page {page}: {reason}")]
    Recognition { page: usize, reason: String },

    /// A recognition task was cancelled or panicked.
    #[error("recognition task failed: {0}")]
    Task(String),
}

/// Errors related to invoice field extraction.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ExtractionError {
    /// The recognized text was empty or whitespace only.
    #[error("no text could be extracted from the document")]
    EmptyText,
}

/// Result type for the scanvoice library.
pub type Result<T> = std::result::Result<T, ScanvoiceError>;
