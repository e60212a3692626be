//! End-to-end processing of one document: pages, text, invoice fields.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::error::{ExtractionError, Result};
use crate::extract::{
    ExtractionOrchestrator, ExtractionResult, GeminiExtractor, RegexExtractor,
};
use crate::models::config::ScanvoiceConfig;
use crate::models::invoice::ProcessedInvoice;
use crate::ocr::{create_recognizer, join_pages, recognize_pages, TextRecognizer};
use crate::raster::{Rasterizer, RawDocument};

/// Recognized text of a whole document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognizedText {
    /// Page texts joined by a blank line, in page order.
    pub text: String,
    /// Number of pages recognized.
    pub page_count: usize,
}

/// Document to invoice pipeline.
///
/// Holds no per-document state, so one pipeline can process many documents
/// concurrently.
pub struct InvoicePipeline {
    rasterizer: Rasterizer,
    recognizer: Arc<dyn TextRecognizer>,
    orchestrator: ExtractionOrchestrator,
    page_concurrency: usize,
}

impl InvoicePipeline {
    /// Assemble a pipeline from explicit components.
    pub fn new(
        rasterizer: Rasterizer,
        recognizer: Arc<dyn TextRecognizer>,
        orchestrator: ExtractionOrchestrator,
    ) -> Self {
        Self {
            rasterizer,
            recognizer,
            orchestrator,
            page_concurrency: 1,
        }
    }

    /// Build the default components described by `config`.
    pub fn from_config(config: &ScanvoiceConfig) -> Result<Self> {
        let recognizer = create_recognizer(&config.ocr)?;
        let orchestrator = ExtractionOrchestrator::new(
            Arc::new(GeminiExtractor::new(config.ai.clone())),
            Arc::new(RegexExtractor::new()),
        );

        Ok(Self::new(Rasterizer::new(config.raster.clone()), recognizer, orchestrator)
            .with_page_concurrency(config.ocr.page_concurrency))
    }

    /// Recognize up to `concurrency` pages at once.
    pub fn with_page_concurrency(mut self, concurrency: usize) -> Self {
        self.page_concurrency = concurrency.max(1);
        self
    }

    /// Rasterize and recognize a document without extracting fields.
    pub async fn recognize(&self, document: RawDocument) -> Result<RecognizedText> {
        let pages = self.rasterizer.rasterize(document).await?;
        let page_count = pages.len();

        let texts = recognize_pages(Arc::clone(&self.recognizer), pages, self.page_concurrency).await?;
        let text = join_pages(&texts);
        debug!("Recognized {} characters across {} page(s)", text.len(), page_count);

        Ok(RecognizedText { text, page_count })
    }

    /// Run the full pipeline on one document.
    pub async fn process(&self, document: RawDocument) -> Result<ProcessedInvoice> {
        let start = Instant::now();

        let recognized = self.recognize(document).await?;
        if recognized.text.trim().is_empty() {
            return Err(ExtractionError::EmptyText.into());
        }

        let ExtractionResult { invoice, path } = self.orchestrator.extract(&recognized.text).await?;
        let processing_time_ms = start.elapsed().as_millis() as u64;

        info!(
            "Processed {} page(s) in {}ms via {} path",
            recognized.page_count, processing_time_ms, path
        );

        Ok(ProcessedInvoice {
            invoice,
            raw_text: recognized.text,
            path,
            page_count: recognized.page_count,
            processing_time_ms,
        })
    }

    /// Read a document from disk and run the full pipeline.
    pub async fn process_path(&self, path: &Path) -> Result<ProcessedInvoice> {
        info!("Processing {}", path.display());
        let document = RawDocument::from_path(path)?;
        self.process(document).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{OcrError, RasterError, ScanvoiceError};
    use crate::extract::{AiExtractor, CandidateFields};
    use crate::models::config::{PdfRendererKind, RasterConfig};
    use crate::models::invoice::ExtractionPath;
    use crate::raster::PageImage;
    use async_trait::async_trait;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::io::Cursor;

    /// Returns the same text for every page, tagged with the page number.
    struct ScriptedRecognizer(&'static str);

    impl TextRecognizer for ScriptedRecognizer {
        fn recognize(&self, page: &PageImage) -> std::result::Result<String, OcrError> {
            if self.0.is_empty() {
                return Ok("   ".to_string());
            }
            Ok(format!("{}\n[page {}]\n", self.0, page.index + 1))
        }
    }

    struct NoAi;

    #[async_trait]
    impl AiExtractor for NoAi {
        async fn extract(&self, _text: &str) -> CandidateFields {
            CandidateFields::default()
        }
    }

    fn pipeline(text: &'static str, raster: RasterConfig) -> InvoicePipeline {
        InvoicePipeline::new(
            Rasterizer::new(raster),
            Arc::new(ScriptedRecognizer(text)),
            ExtractionOrchestrator::new(Arc::new(NoAi), Arc::new(RegexExtractor::new())),
        )
    }

    fn png_document() -> RawDocument {
        let mut data = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(16, 16))
            .write_to(&mut Cursor::new(&mut data), ImageFormat::Png)
            .unwrap();
        RawDocument::new(data, ".png")
    }

    #[tokio::test]
    async fn test_image_document_end_to_end() {
        let pipeline = pipeline(
            "Invoice #INV-1234 dated 2023-01-15, due 2023-02-15, Total: $1,250.00",
            RasterConfig::default(),
        );

        let processed = pipeline.process(png_document()).await.unwrap();

        assert_eq!(processed.page_count, 1);
        assert_eq!(processed.path, ExtractionPath::Fallback);
        assert_eq!(processed.invoice.invoice_number.as_deref(), Some("INV-1234"));
        assert_eq!(processed.invoice.amount, Some(1250.0));
        assert!(processed.raw_text.ends_with("[page 1]"));
    }

    #[tokio::test]
    async fn test_pdf_pages_joined_in_order() {
        let raster = RasterConfig {
            renderer: PdfRendererKind::Embedded,
            ..RasterConfig::default()
        };
        let pipeline = pipeline("Total $5.00", raster).with_page_concurrency(3);
        let document = RawDocument::new(
            crate::raster::scanned_pdf(&[(3, 3), (3, 3), (3, 3)]),
            "pdf",
        );

        let recognized = pipeline.recognize(document).await.unwrap();

        assert_eq!(recognized.page_count, 3);
        assert_eq!(
            recognized.text,
            "Total $5.00\n[page 1]\n\nTotal $5.00\n[page 2]\n\nTotal $5.00\n[page 3]"
        );
    }

    #[tokio::test]
    async fn test_blank_text_is_an_error() {
        let pipeline = pipeline("", RasterConfig::default());

        let err = pipeline.process(png_document()).await.unwrap_err();

        assert!(matches!(err, ScanvoiceError::Extraction(ExtractionError::EmptyText)));
    }

    #[tokio::test]
    async fn test_unsupported_document_is_an_error() {
        let pipeline = pipeline("Total $5.00", RasterConfig::default());

        let err = pipeline
            .process(RawDocument::new(b"hello".to_vec(), "docx"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ScanvoiceError::Raster(RasterError::UnsupportedFormat(_))
        ));
    }

    #[tokio::test]
    async fn test_process_path_reads_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.PNG");
        std::fs::write(&path, {
            let mut data = Vec::new();
            DynamicImage::ImageRgb8(RgbImage::new(4, 4))
                .write_to(&mut Cursor::new(&mut data), ImageFormat::Png)
                .unwrap();
            data
        })
        .unwrap();
        let pipeline = pipeline("Bill 5521\nAmount due $42.00", RasterConfig::default());

        let processed = pipeline.process_path(&path).await.unwrap();

        assert_eq!(processed.invoice.invoice_number.as_deref(), Some("5521"));
        assert_eq!(processed.invoice.amount, Some(42.0));
    }
}
