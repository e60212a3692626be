//! Text recognition adapters wrapping external OCR engines.

#[cfg(feature = "onnx")]
mod onnx;
mod tesseract;

#[cfg(feature = "onnx")]
pub use onnx::OnnxRecognizer;
pub use tesseract::TesseractRecognizer;

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::error::OcrError;
use crate::models::config::{OcrConfig, OcrEngineKind};
use crate::raster::PageImage;

/// Separator placed between the text of consecutive pages.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Result type for OCR operations.
pub type Result<T> = std::result::Result<T, OcrError>;

/// Produces best-effort text for a single page.
///
/// An empty string is a valid result. Errors are reserved for engine
/// failures and abort the whole document.
pub trait TextRecognizer: Send + Sync {
    /// Recognize the text on one page.
    fn recognize(&self, page: &PageImage) -> Result<String>;
}

/// Build the recognizer selected in the config.
pub fn create_recognizer(config: &OcrConfig) -> Result<Arc<dyn TextRecognizer>> {
    match config.engine {
        OcrEngineKind::Tesseract => Ok(Arc::new(TesseractRecognizer::from_config(config))),
        #[cfg(feature = "onnx")]
        OcrEngineKind::Onnx => Ok(Arc::new(OnnxRecognizer::from_dir(
            &config.model_dir,
            config.keep_unk,
        )?)),
        #[cfg(not(feature = "onnx"))]
        OcrEngineKind::Onnx => Err(OcrError::ModelLoad(
            "scanvoice-core was built without the `onnx` feature".to_string(),
        )),
    }
}

/// Recognize every page, running up to `concurrency` pages at once.
///
/// Results are reassembled by page index, never by completion order.
pub async fn recognize_pages(
    recognizer: Arc<dyn TextRecognizer>,
    pages: Vec<PageImage>,
    concurrency: usize,
) -> Result<Vec<String>> {
    let concurrency = concurrency.max(1);
    let mut results: Vec<(usize, String)> = Vec::with_capacity(pages.len());
    let mut pending = pages.into_iter();
    let mut tasks = JoinSet::new();

    loop {
        while tasks.len() < concurrency {
            let Some(page) = pending.next() else {
                break;
            };
            let recognizer = Arc::clone(&recognizer);
            tasks.spawn_blocking(move || {
                let text = recognizer.recognize(&page)?;
                debug!("Page {} produced {} characters", page.index, text.len());
                Ok::<_, OcrError>((page.index, text))
            });
        }

        let Some(joined) = tasks.join_next().await else {
            break;
        };
        let page = joined.map_err(|e| OcrError::Task(e.to_string()))??;
        results.push(page);
    }

    results.sort_by_key(|(index, _)| *index);
    info!("Recognized {} page(s)", results.len());
    Ok(results.into_iter().map(|(_, text)| text).collect())
}

/// Join per-page text in reading order, trimming each page.
pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    pages
        .iter()
        .map(|page| page.as_ref().trim())
        .collect::<Vec<_>>()
        .join(PAGE_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GrayImage;
    use std::time::Duration;

    /// Returns "page N", sleeping longer for earlier pages so they finish last.
    struct SlowFirstPages {
        pages: usize,
    }

    impl TextRecognizer for SlowFirstPages {
        fn recognize(&self, page: &PageImage) -> Result<String> {
            let delay = (self.pages - page.index) as u64 * 15;
            std::thread::sleep(Duration::from_millis(delay));
            Ok(format!("  page {}  ", page.index + 1))
        }
    }

    struct FailsOnPage(usize);

    impl TextRecognizer for FailsOnPage {
        fn recognize(&self, page: &PageImage) -> Result<String> {
            if page.index == self.0 {
                Err(OcrError::Recognition {
                    page: page.index,
                    reason: "engine crashed".to_string(),
                })
            } else {
                Ok(String::new())
            }
        }
    }

    fn blank_pages(count: usize) -> Vec<PageImage> {
        (0..count)
            .map(|index| PageImage {
                index,
                image: GrayImage::new(2, 2),
            })
            .collect()
    }

    #[test]
    fn test_join_pages_uses_blank_line() {
        assert_eq!(join_pages(&["first\n", "  second"]), "first\n\nsecond");
        assert_eq!(join_pages(&["only"]), "only");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_pages_keep_document_order() {
        let recognizer: Arc<dyn TextRecognizer> = Arc::new(SlowFirstPages { pages: 4 });

        let texts = recognize_pages(recognizer, blank_pages(4), 4).await.unwrap();

        assert_eq!(join_pages(&texts), "page 1\n\npage 2\n\npage 3\n\npage 4");
    }

    #[tokio::test]
    async fn test_sequential_pages_keep_document_order() {
        let recognizer: Arc<dyn TextRecognizer> = Arc::new(SlowFirstPages { pages: 3 });

        let texts = recognize_pages(recognizer, blank_pages(3), 1).await.unwrap();

        assert_eq!(texts, vec!["  page 1  ", "  page 2  ", "  page 3  "]);
    }

    #[tokio::test]
    async fn test_page_failure_aborts_document() {
        let recognizer: Arc<dyn TextRecognizer> = Arc::new(FailsOnPage(1));

        let err = recognize_pages(recognizer, blank_pages(3), 2).await.unwrap_err();

        assert!(matches!(err, OcrError::Recognition { page: 1, .. }));
    }
}
