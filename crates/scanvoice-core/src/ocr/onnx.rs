//! Pure Rust OCR engine wrapper using `pure-onnx-ocr`.

use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

use image::DynamicImage;
use tracing::{debug, info};

use super::{Result, TextRecognizer};
use crate::error::OcrError;
use crate::raster::PageImage;

/// Vertical distance (in pixels) within which boxes share a text line.
const ROW_HEIGHT: f32 = 20.0;

/// A detected text box with its coordinates and content.
#[derive(Debug, Clone)]
struct TextBox {
    /// Bounding box coordinates (x1, y1, x2, y2, x3, y3, x4, y4) for quadrilateral.
    bbox: [f32; 8],
    text: String,
}

impl TextBox {
    /// Get the axis-aligned bounding rectangle.
    fn rect(&self) -> (f32, f32, f32, f32) {
        let xs = [self.bbox[0], self.bbox[2], self.bbox[4], self.bbox[6]];
        let ys = [self.bbox[1], self.bbox[3], self.bbox[5], self.bbox[7]];

        let min_x = xs.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_x = xs.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let min_y = ys.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_y = ys.iter().cloned().fold(f32::NEG_INFINITY, f32::max);

        (min_x, min_y, max_x, max_y)
    }
}

/// Recognizer backed by `pure-onnx-ocr` (pure Rust, no external ONNX Runtime).
pub struct OnnxRecognizer {
    engine: Mutex<pure_onnx_ocr::engine::OcrEngine>,
    keep_unk: bool,
}

impl OnnxRecognizer {
    /// Load detection/recognition models and the dictionary from a directory.
    pub fn from_dir(model_dir: &Path, keep_unk: bool) -> Result<Self> {
        let det_path = model_dir.join("det.onnx");
        let rec_path = model_dir.join("latin_rec.onnx");
        let dict_path = model_dir.join("latin_dict.txt");

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        info!("Loaded pure-onnx-ocr engine from {}", model_dir.display());

        Ok(Self {
            engine: Mutex::new(engine),
            keep_unk,
        })
    }
}

impl TextRecognizer for OnnxRecognizer {
    fn recognize(&self, page: &PageImage) -> Result<String> {
        let start = Instant::now();
        let image = DynamicImage::ImageLuma8(page.image.clone());

        let results = {
            let engine = self.engine.lock().map_err(|_| OcrError::Recognition {
                page: page.index,
                reason: "OCR engine lock poisoned".to_string(),
            })?;
            engine
                .run_from_image(&image)
                .map_err(|e| OcrError::Recognition {
                    page: page.index,
                    reason: format!("pure-onnx-ocr: {}", e),
                })?
        };

        debug!("pure-onnx-ocr returned {} text regions", results.len());

        let mut boxes: Vec<TextBox> = results
            .iter()
            .map(|r| TextBox {
                bbox: polygon_to_bbox(&r.bounding_box),
                text: clean_text(&r.text, self.keep_unk),
            })
            .collect();
        sort_by_reading_order(&mut boxes);

        debug!(
            "Page {}: {} text boxes in {}ms",
            page.index,
            boxes.len(),
            start.elapsed().as_millis()
        );

        Ok(boxes
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

fn clean_text(text: &str, keep_unk: bool) -> String {
    if keep_unk {
        text.to_string()
    } else {
        text.replace("[UNK]", " ")
    }
}

/// Sort boxes top-to-bottom by row, then left-to-right within a row.
fn sort_by_reading_order(boxes: &mut [TextBox]) {
    boxes.sort_by(|a, b| {
        let (ax, ay, _, _) = a.rect();
        let (bx, by, _, _) = b.rect();
        let row_a = (ay / ROW_HEIGHT) as i32;
        let row_b = (by / ROW_HEIGHT) as i32;
        if row_a != row_b {
            row_a.cmp(&row_b)
        } else {
            ax.partial_cmp(&bx).unwrap_or(std::cmp::Ordering::Equal)
        }
    });
}

/// Convert a `Polygon<f64>` to our `[f32; 8]` bbox format.
fn polygon_to_bbox(polygon: &pure_onnx_ocr::Polygon<f64>) -> [f32; 8] {
    let mut bbox = [0.0f32; 8];
    for (i, coord) in polygon.exterior().coords().take(4).enumerate() {
        bbox[i * 2] = coord.x as f32;
        bbox[i * 2 + 1] = coord.y as f32;
    }
    bbox
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_box(text: &str, x: f32, y: f32) -> TextBox {
        TextBox {
            bbox: [x, y, x + 30.0, y, x + 30.0, y + 10.0, x, y + 10.0],
            text: text.to_string(),
        }
    }

    #[test]
    fn test_reading_order_groups_rows() {
        let mut boxes = vec![
            text_box("Total", 10.0, 60.0),
            text_box("#42", 120.0, 3.0),
            text_box("Invoice", 10.0, 5.0),
            text_box("150.00", 90.0, 61.0),
        ];

        sort_by_reading_order(&mut boxes);

        let texts: Vec<&str> = boxes.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["Invoice", "#42", "Total", "150.00"]);
    }

    #[test]
    fn test_unknown_glyphs_replaced() {
        assert_eq!(clean_text("A[UNK]B", false), "A B");
        assert_eq!(clean_text("A[UNK]B", true), "A[UNK]B");
    }

    #[test]
    fn test_missing_models_fail_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let err = OnnxRecognizer::from_dir(dir.path(), false).err().unwrap();
        assert!(matches!(err, OcrError::ModelLoad(_)));
    }
}
