//! Document rasterization: raw bytes to ordered grayscale page images.

mod pdf;
mod poppler;

pub use pdf::{EmbeddedImageRenderer, PdfSource};
pub use poppler::PopplerRenderer;

#[cfg(test)]
pub(crate) use pdf::tests::scanned_pdf;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use image::{DynamicImage, GenericImageView, GrayImage};
use tracing::{debug, info};

use crate::error::RasterError;
use crate::models::config::{PdfRendererKind, RasterConfig};

/// Result type for rasterization.
pub type Result<T> = std::result::Result<T, RasterError>;

/// Extensions decoded as a single image.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "bmp", "gif", "webp"];

/// An uploaded document: opaque bytes plus the declared file extension.
#[derive(Debug, Clone)]
pub struct RawDocument {
    /// File contents.
    pub bytes: Vec<u8>,
    /// Declared extension, e.g. `pdf` or `.PNG`.
    pub extension: String,
}

impl RawDocument {
    /// Wrap bytes received from the ingestion boundary.
    pub fn new(bytes: Vec<u8>, extension: impl Into<String>) -> Self {
        Self {
            bytes,
            extension: extension.into(),
        }
    }

    /// Read a document from disk, taking the extension from the file name.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_string();
        Ok(Self::new(bytes, extension))
    }

    /// Classify the document by its extension.
    pub fn kind(&self) -> Result<DocumentKind> {
        DocumentKind::from_extension(&self.extension)
            .ok_or_else(|| RasterError::UnsupportedFormat(self.extension.clone()))
    }
}

/// How a document is turned into pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Single raster image.
    Image,
    /// Multi-page PDF.
    Pdf,
}

impl DocumentKind {
    /// Match an extension case-insensitively, ignoring a leading dot.
    pub fn from_extension(extension: &str) -> Option<Self> {
        let ext = extension.trim().trim_start_matches('.').to_lowercase();
        if ext == "pdf" {
            Some(DocumentKind::Pdf)
        } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(DocumentKind::Image)
        } else {
            None
        }
    }
}

/// One decoded grayscale page.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// Zero-based page index within the document.
    pub index: usize,
    /// Grayscale pixels.
    pub image: GrayImage,
}

impl PageImage {
    /// Page dimensions (width, height).
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Renders the pages of a PDF to images, in page order.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Render the first `pages` pages of `source` at `dpi`.
    async fn render(&self, source: PdfSource, pages: usize, dpi: u32) -> Result<Vec<DynamicImage>>;
}

/// Converts raw documents into page images.
pub struct Rasterizer {
    config: RasterConfig,
    renderer: Arc<dyn PageRenderer>,
}

impl Rasterizer {
    /// Create a rasterizer using the renderer selected in the config.
    pub fn new(config: RasterConfig) -> Self {
        let renderer: Arc<dyn PageRenderer> = match config.renderer {
            PdfRendererKind::Poppler => Arc::new(PopplerRenderer::new(config.pdftoppm_cmd.clone())),
            PdfRendererKind::Embedded => Arc::new(EmbeddedImageRenderer::new()),
        };
        Self { config, renderer }
    }

    /// Replace the PDF renderer.
    pub fn with_renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Decode a document into grayscale pages, in page order.
    ///
    /// Any decode failure aborts the whole document.
    pub async fn rasterize(&self, document: RawDocument) -> Result<Vec<PageImage>> {
        let images = match document.kind()? {
            DocumentKind::Image => {
                let bytes = document.bytes;
                let image = run_blocking(move || {
                    image::load_from_memory(&bytes).map_err(|e| RasterError::Decode(e.to_string()))
                })
                .await?;
                vec![image]
            }
            DocumentKind::Pdf => {
                let bytes = document.bytes;
                let source = run_blocking(move || PdfSource::open(bytes)).await?;
                let pages = self.page_limit(source.page_count());
                self.renderer.render(source, pages, self.config.dpi).await?
            }
        };

        let max_dimension = self.config.max_dimension;
        let pages: Vec<PageImage> = images
            .into_iter()
            .enumerate()
            .map(|(index, image)| PageImage {
                index,
                image: normalize_page(image, max_dimension),
            })
            .collect();

        info!("Rasterized document into {} page(s)", pages.len());
        Ok(pages)
    }

    fn page_limit(&self, page_count: usize) -> usize {
        if self.config.max_pages > 0 && page_count > self.config.max_pages {
            info!(
                "Document has {} pages, processing the first {}",
                page_count, self.config.max_pages
            );
            self.config.max_pages
        } else {
            page_count
        }
    }
}

/// Downscale oversized pages and convert to grayscale.
pub fn normalize_page(image: DynamicImage, max_dimension: u32) -> GrayImage {
    let (width, height) = image.dimensions();
    let image = if max_dimension > 0 && width.max(height) > max_dimension {
        debug!(
            "Downscaling {}x{} page to fit {}px",
            width, height, max_dimension
        );
        image.resize(max_dimension, max_dimension, image::imageops::FilterType::Lanczos3)
    } else {
        image
    };
    image.to_luma8()
}

/// Run CPU-bound decoding off the async executor.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| RasterError::Render(format!("decode task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = RgbImage::from_pixel(width, height, Rgb([200, 30, 30]));
        let mut data = Vec::new();
        DynamicImage::ImageRgb8(image)
            .write_to(&mut Cursor::new(&mut data), ImageFormat::Png)
            .unwrap();
        data
    }

    #[test]
    fn test_document_kind_from_extension() {
        assert_eq!(DocumentKind::from_extension("pdf"), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_extension(".PDF"), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_extension("JPEG"), Some(DocumentKind::Image));
        assert_eq!(DocumentKind::from_extension(".tif"), Some(DocumentKind::Image));
        assert_eq!(DocumentKind::from_extension("docx"), None);
        assert_eq!(DocumentKind::from_extension(""), None);
    }

    #[tokio::test]
    async fn test_rasterize_image_is_single_gray_page() {
        let rasterizer = Rasterizer::new(RasterConfig::default());
        let document = RawDocument::new(png_bytes(12, 7), "png");

        let pages = rasterizer.rasterize(document).await.unwrap();

        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].index, 0);
        assert_eq!(pages[0].dimensions(), (12, 7));
    }

    #[tokio::test]
    async fn test_rasterize_corrupt_image_fails() {
        let rasterizer = Rasterizer::new(RasterConfig::default());
        let document = RawDocument::new(b"not an image".to_vec(), "jpg");

        let err = rasterizer.rasterize(document).await.unwrap_err();
        assert!(matches!(err, RasterError::Decode(_)));
    }

    #[tokio::test]
    async fn test_rasterize_unsupported_extension() {
        let rasterizer = Rasterizer::new(RasterConfig::default());
        let document = RawDocument::new(vec![1, 2, 3], "txt");

        let err = rasterizer.rasterize(document).await.unwrap_err();
        assert!(matches!(err, RasterError::UnsupportedFormat(ext) if ext == "txt"));
    }

    #[tokio::test]
    async fn test_rasterize_invalid_pdf_fails() {
        let rasterizer = Rasterizer::new(RasterConfig::default());
        let document = RawDocument::new(b"%PDF-garbage".to_vec(), "pdf");

        let err = rasterizer.rasterize(document).await.unwrap_err();
        assert!(matches!(err, RasterError::Decode(_)));
    }

    #[tokio::test]
    async fn test_rasterize_pdf_respects_max_pages() {
        let config = RasterConfig {
            renderer: PdfRendererKind::Embedded,
            max_pages: 2,
            ..RasterConfig::default()
        };
        let rasterizer = Rasterizer::new(config);
        let document = RawDocument::new(scanned_pdf(&[(4, 3), (6, 3), (8, 3)]), "pdf");

        let pages = rasterizer.rasterize(document).await.unwrap();

        let widths: Vec<u32> = pages.iter().map(|p| p.image.width()).collect();
        assert_eq!(widths, vec![4, 6]);
        assert_eq!(pages[1].index, 1);
    }

    #[test]
    fn test_normalize_page_downscales() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(400, 100));
        let gray = normalize_page(image, 200);
        assert_eq!(gray.dimensions(), (200, 50));
    }

    #[test]
    fn test_normalize_page_keeps_small_pages() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(40, 10));
        assert_eq!(normalize_page(image, 0).dimensions(), (40, 10));
    }
}
