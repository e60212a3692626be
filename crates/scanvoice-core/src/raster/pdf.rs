//! PDF inspection and embedded page-image decoding using lopdf.

use async_trait::async_trait;
use image::{DynamicImage, ImageBuffer, Luma, Rgb};
use lopdf::{Document, Object, ObjectId};
use tracing::{debug, trace};

use super::{run_blocking, PageRenderer, Result};
use crate::error::RasterError;

/// A validated PDF ready for rendering.
#[derive(Debug, Clone)]
pub struct PdfSource {
    bytes: Vec<u8>,
    page_count: usize,
}

impl PdfSource {
    /// Parse and validate PDF bytes.
    ///
    /// PDFs encrypted with an empty password are decrypted and re-serialized
    /// so renderers see plain bytes.
    pub fn open(data: Vec<u8>) -> Result<Self> {
        let mut doc = Document::load_mem(&data).map_err(|e| RasterError::Decode(e.to_string()))?;

        let bytes = if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(RasterError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            let mut decrypted = Vec::new();
            doc.save_to(&mut decrypted)
                .map_err(|e| RasterError::Decode(format!("failed to save decrypted PDF: {}", e)))?;
            decrypted
        } else {
            data
        };

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(RasterError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_count);
        Ok(Self { bytes, page_count })
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Raw (decrypted) PDF bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Renders scanned PDFs by decoding the image embedded in each page.
///
/// Works without external tools but only for PDFs whose pages are a single
/// scanned image (JPEG, or raw 8-bit RGB/gray samples).
#[derive(Debug, Clone, Default)]
pub struct EmbeddedImageRenderer;

impl EmbeddedImageRenderer {
    /// Create a new renderer.
    pub fn new() -> Self {
        Self
    }

    fn render_sync(source: &PdfSource, pages: usize) -> Result<Vec<DynamicImage>> {
        let doc = Document::load_mem(&source.bytes).map_err(|e| RasterError::Decode(e.to_string()))?;
        let page_ids = doc.get_pages();

        let mut images = Vec::with_capacity(pages);
        for (number, page_id) in page_ids.iter().take(pages) {
            let image = page_image(&doc, *page_id).ok_or_else(|| {
                RasterError::Decode(format!("page {} has no decodable image", number))
            })?;
            trace!("Decoded embedded image for page {}", number);
            images.push(image);
        }

        debug!("Decoded {} embedded page images", images.len());
        Ok(images)
    }
}

#[async_trait]
impl PageRenderer for EmbeddedImageRenderer {
    async fn render(&self, source: PdfSource, pages: usize, _dpi: u32) -> Result<Vec<DynamicImage>> {
        run_blocking(move || Self::render_sync(&source, pages)).await
    }
}

/// Largest decodable image XObject on a page.
fn page_image(doc: &Document, page_id: ObjectId) -> Option<DynamicImage> {
    let resources = page_resources(doc, page_id)?;
    let xobjects = resources.get(b"XObject").ok()?;
    let Ok((_, Object::Dictionary(xobj_dict))) = doc.dereference(xobjects) else {
        return None;
    };

    xobj_dict
        .iter()
        .filter_map(|(_name, obj_ref)| {
            let (_, obj) = doc.dereference(obj_ref).ok()?;
            decode_image_object(doc, obj)
        })
        .max_by_key(|img| u64::from(img.width()) * u64::from(img.height()))
}

fn decode_image_object(doc: &Document, obj: &Object) -> Option<DynamicImage> {
    let Object::Stream(stream) = obj else {
        return None;
    };
    let dict = &stream.dict;

    if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
        return None;
    }

    let width = u32::try_from(dict.get(b"Width").ok()?.as_i64().ok()?).ok()?;
    let height = u32::try_from(dict.get(b"Height").ok()?.as_i64().ok()?).ok()?;
    trace!("Found image object: {}x{}", width, height);

    if let Ok(filter) = dict.get(b"Filter") {
        let filter_name = match filter {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
            _ => None,
        };

        match filter_name {
            Some(b"DCTDecode") => {
                return image::load_from_memory_with_format(&stream.content, image::ImageFormat::Jpeg)
                    .ok();
            }
            Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
                trace!("Skipping image with unsupported filter");
                return None;
            }
            _ => {}
        }
    }

    let data = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());

    let color_space = dict
        .get(b"ColorSpace")
        .ok()
        .and_then(|o| match o {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
            Object::Reference(r) => doc.get_object(*r).ok().and_then(|o| o.as_name().ok()),
            _ => None,
        })
        .unwrap_or(b"DeviceRGB".as_slice());

    let bits = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(8);

    if bits != 8 {
        trace!("Unsupported bits per component: {}", bits);
        return None;
    }

    image_from_samples(data, width, height, color_space)
}

fn image_from_samples(
    mut data: Vec<u8>,
    width: u32,
    height: u32,
    color_space: &[u8],
) -> Option<DynamicImage> {
    let pixels = (width as usize).checked_mul(height as usize)?;

    match color_space {
        b"DeviceRGB" | b"RGB" => {
            data.truncate(pixels.checked_mul(3)?);
            ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, data).map(DynamicImage::ImageRgb8)
        }
        b"DeviceGray" | b"G" => {
            data.truncate(pixels);
            ImageBuffer::<Luma<u8>, _>::from_raw(width, height, data).map(DynamicImage::ImageLuma8)
        }
        other => {
            trace!("Unsupported color space: {}", String::from_utf8_lossy(other));
            None
        }
    }
}

/// Resources dictionary for a page, following inheritance up the page tree.
fn page_resources(doc: &Document, node_id: ObjectId) -> Option<lopdf::Dictionary> {
    let Object::Dictionary(dict) = doc.get_object(node_id).ok()? else {
        return None;
    };

    if let Ok(resources) = dict.get(b"Resources") {
        if let Ok((_, Object::Dictionary(res_dict))) = doc.dereference(resources) {
            return Some(res_dict.clone());
        }
    }

    match dict.get(b"Parent") {
        Ok(Object::Reference(parent_id)) => page_resources(doc, *parent_id),
        _ => None,
    }
}
